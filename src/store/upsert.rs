use anyhow::Result;

use crate::model::{AdminLevel, AdministrativeBoundary, CountryCode};

use super::{BatchOutcome, BoundaryStore};

/// Default write batch size. Small enough that one batch stays well inside
/// typical request/transaction limits for remote stores.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Aggregate outcome of upserting one level, batch by batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub batches: Vec<BatchOutcome>,
    pub inserted: usize,
    pub skipped: usize,
    pub errors: usize,
    /// Records removed by `clear_existing` before the write.
    pub cleared: usize,
}

/// Batched writer into a [`BoundaryStore`].
///
/// Writes are chunked so one oversized level cannot produce an oversized
/// request, and each batch commits independently: a failed batch is counted
/// and logged, then processing continues, leaving the store in a valid
/// partial state that a retry can simply overwrite.
pub struct Upserter<'a, S: BoundaryStore> {
    store: &'a mut S,
    batch_size: usize,
    verbose: u8,
}

impl<'a, S: BoundaryStore> Upserter<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store, batch_size: DEFAULT_BATCH_SIZE, verbose: 0 }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_verbose(mut self, verbose: u8) -> Self {
        self.verbose = verbose;
        self
    }

    /// Write one `(country, level)` record set.
    ///
    /// With `clear_existing` the level is wiped first (once, before the first
    /// batch), so the result is exactly the input set. Without it, records
    /// merge into the existing level by code.
    pub fn upsert_level(
        &mut self,
        country: &CountryCode,
        level: AdminLevel,
        records: &[AdministrativeBoundary],
        clear_existing: bool,
    ) -> Result<UpsertOutcome> {
        let mut outcome = UpsertOutcome::default();

        if clear_existing {
            outcome.cleared = self.store.clear_level(country, level)?;
            if self.verbose > 0 && outcome.cleared > 0 {
                eprintln!("[upsert] {country} {level}: cleared {} existing", outcome.cleared);
            }
        }

        let total_batches = records.len().div_ceil(self.batch_size).max(1);
        for (index, batch) in records.chunks(self.batch_size).enumerate() {
            match self.store.put_batch(batch) {
                Ok(batch_outcome) => {
                    if self.verbose > 0 {
                        eprintln!(
                            "[upsert] {country} {level}: batch {}/{}: {} inserted, {} skipped, {} errors",
                            index + 1,
                            total_batches,
                            batch_outcome.inserted,
                            batch_outcome.skipped,
                            batch_outcome.errors,
                        );
                    }
                    outcome.inserted += batch_outcome.inserted;
                    outcome.skipped += batch_outcome.skipped;
                    outcome.errors += batch_outcome.errors;
                    outcome.batches.push(batch_outcome);
                }
                Err(err) => {
                    // Fatal to the batch, not to the level: count it and move
                    // on so the partial success stays resumable.
                    eprintln!(
                        "[upsert] {country} {level}: batch {}/{} failed: {err:#}",
                        index + 1,
                        total_batches,
                    );
                    outcome.errors += batch.len();
                    outcome.batches.push(BatchOutcome {
                        inserted: 0,
                        skipped: 0,
                        errors: batch.len(),
                    });
                }
            }
        }

        Ok(outcome)
    }
}
