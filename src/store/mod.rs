//! The canonical boundary store and the batched upsert path into it.

mod memory;
mod upsert;

use std::collections::BTreeSet;

use anyhow::Result;

use crate::model::{AdminLevel, AdministrativeBoundary, CountryCode, Pcode};

pub use memory::MemoryStore;
pub use upsert::{UpsertOutcome, Upserter, DEFAULT_BATCH_SIZE};

/// Outcome of writing one batch, reported independently so a caller can
/// resume from a known point after a partial failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub inserted: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// Storage seam for the canonical boundary table.
///
/// Keys are `(country, admin_pcode)`; writes are upsert-by-key with full
/// replace-on-conflict, never a partial field merge. Implementations must
/// make `put_batch` retriable: re-submitting a batch after a partial success
/// re-overwrites identical rows instead of duplicating them.
pub trait BoundaryStore {
    /// Number of boundaries stored for one `(country, level)` pair.
    fn count(&self, country: &CountryCode, level: AdminLevel) -> Result<usize>;

    /// Fetch one boundary by its scoped key.
    fn get(&self, country: &CountryCode, pcode: &Pcode) -> Result<Option<AdministrativeBoundary>>;

    /// All codes stored for one `(country, level)` pair.
    fn level_pcodes(&self, country: &CountryCode, level: AdminLevel) -> Result<BTreeSet<Pcode>>;

    /// Remove every boundary for one `(country, level)` pair, returning how
    /// many were removed.
    fn clear_level(&mut self, country: &CountryCode, level: AdminLevel) -> Result<usize>;

    /// Upsert a batch of boundaries. Rows with an empty code are skipped and
    /// counted; row-level storage failures are counted as errors without
    /// aborting the batch.
    fn put_batch(&mut self, records: &[AdministrativeBoundary]) -> Result<BatchOutcome>;
}
