use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;

use crate::model::{AdminLevel, AdministrativeBoundary, CountryCode, Pcode};

use super::{BatchOutcome, BoundaryStore};

/// In-memory boundary store, keyed by `(country, admin_pcode)`.
///
/// Each country owns a disjoint partition, so independent countries can be
/// processed by independent stores and merged later if needed.
#[derive(Debug, Default)]
pub struct MemoryStore {
    countries: BTreeMap<CountryCode, BTreeMap<Pcode, AdministrativeBoundary>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total records across all countries and levels.
    pub fn len(&self) -> usize {
        self.countries.values().map(|partition| partition.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BoundaryStore for MemoryStore {
    fn count(&self, country: &CountryCode, level: AdminLevel) -> Result<usize> {
        Ok(self
            .countries
            .get(country)
            .map(|partition| partition.values().filter(|b| b.admin_level == level).count())
            .unwrap_or(0))
    }

    fn get(&self, country: &CountryCode, pcode: &Pcode) -> Result<Option<AdministrativeBoundary>> {
        Ok(self
            .countries
            .get(country)
            .and_then(|partition| partition.get(pcode))
            .cloned())
    }

    fn level_pcodes(&self, country: &CountryCode, level: AdminLevel) -> Result<BTreeSet<Pcode>> {
        Ok(self
            .countries
            .get(country)
            .map(|partition| {
                partition
                    .values()
                    .filter(|b| b.admin_level == level)
                    .map(|b| b.admin_pcode.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn clear_level(&mut self, country: &CountryCode, level: AdminLevel) -> Result<usize> {
        let Some(partition) = self.countries.get_mut(country) else {
            return Ok(0);
        };
        let before = partition.len();
        partition.retain(|_, boundary| boundary.admin_level != level);
        Ok(before - partition.len())
    }

    fn put_batch(&mut self, records: &[AdministrativeBoundary]) -> Result<BatchOutcome> {
        let mut outcome = BatchOutcome::default();
        for record in records {
            if record.admin_pcode.is_empty() {
                outcome.skipped += 1;
                continue;
            }
            let partition = self.countries.entry(record.country.clone()).or_default();
            // Full replace-on-conflict: the whole record is overwritten.
            partition.insert(record.admin_pcode.clone(), record.clone());
            outcome.inserted += 1;
        }
        Ok(outcome)
    }
}
