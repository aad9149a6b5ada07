//! Alignment and health scoring of statistical datasets against the
//! boundary store.
//!
//! Runs after the fact, independently of imports: it reads the stored code
//! set for the dataset's country and level, compares it with the dataset's
//! values, and writes the resulting metrics back into the dataset metadata.
//! A pure function of its inputs throughout.

mod values;

use std::collections::{BTreeSet, HashMap};

use anyhow::Result;

use crate::model::{
    CleaningStatus, DatasetDescriptor, DatasetKind, DatasetValue, HealthMetrics, Pcode,
};
use crate::store::BoundaryStore;

pub use values::load_values_csv;

/// Set comparison between stored boundary codes and a dataset's value codes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alignment {
    /// Boundary codes with at least one value row.
    pub matched: BTreeSet<Pcode>,
    /// Value codes with no matching boundary.
    pub orphaned: BTreeSet<Pcode>,
    /// Boundary codes with no value row.
    pub missing: BTreeSet<Pcode>,
}

/// Partition boundary and value codes into matched / orphaned / missing.
///
/// Identities: `|matched| + |missing| = |B|` and `|matched| + |orphaned| = |V|`
/// where `V` is the deduplicated value code set.
pub fn align(boundary_pcodes: &BTreeSet<Pcode>, values: &[DatasetValue]) -> Alignment {
    let value_pcodes: BTreeSet<&Pcode> = values.iter().map(|v| &v.admin_pcode).collect();
    Alignment {
        matched: value_pcodes
            .iter()
            .filter(|p| boundary_pcodes.contains(**p))
            .map(|p| (*p).clone())
            .collect(),
        orphaned: value_pcodes
            .iter()
            .filter(|p| !boundary_pcodes.contains(**p))
            .map(|p| (*p).clone())
            .collect(),
        missing: boundary_pcodes
            .iter()
            .filter(|p| !value_pcodes.contains(*p))
            .cloned()
            .collect(),
    }
}

/// Everything the scorer needs, passed explicitly so it stays testable with
/// synthetic inputs.
#[derive(Debug, Clone, Copy)]
pub struct HealthInput<'a> {
    pub kind: DatasetKind,
    pub boundary_pcodes: &'a BTreeSet<Pcode>,
    pub values: &'a [DatasetValue],
    /// The dataset is computed/derived on demand; stored rows are not the
    /// source of truth.
    pub computed: bool,
    /// An operator declared the dataset ready in its metadata.
    pub marked_ready: bool,
}

/// Score one dataset.
///
/// Computed datasets, and datasets with no rows but an explicit readiness
/// declaration, are trusted over the absence of rows and score fully healthy.
/// Otherwise every ratio is defined (0, never NaN) even on empty inputs.
pub fn compute_health(input: HealthInput<'_>) -> HealthMetrics {
    let total = input.boundary_pcodes.len();

    if input.computed || (input.marked_ready && input.values.is_empty()) {
        return HealthMetrics::fully_healthy(total);
    }

    let alignment = align(input.boundary_pcodes, input.values);
    let alignment_rate = ratio(alignment.matched.len(), total);

    let duplicates = duplicated_keys(input.kind, input.values);
    let uniqueness = if input.values.is_empty() {
        0.0
    } else {
        1.0 - ratio(duplicates, input.values.len())
    };

    let completeness = match input.kind {
        DatasetKind::Numeric => {
            // Orphaned rows are scored by alignment, not here: completeness
            // asks how many of the rows that belong carry a usable magnitude.
            let matched_rows: Vec<&DatasetValue> = input
                .values
                .iter()
                .filter(|v| input.boundary_pcodes.contains(&v.admin_pcode))
                .collect();
            let usable = matched_rows
                .iter()
                .filter(|v| v.value.is_some_and(|x| x != 0.0))
                .count();
            ratio(usable, matched_rows.len())
        }
        DatasetKind::Categorical => ratio(alignment.matched.len(), total),
    };

    HealthMetrics {
        alignment_rate,
        coverage: alignment_rate,
        completeness,
        uniqueness,
        validation_error_count: alignment.orphaned.len() + duplicates,
        matched: alignment.matched.len(),
        total,
    }
}

/// Readiness classification. Ordered, first match wins; a pure function of
/// the metrics and the computed flag.
pub fn classify(metrics: &HealthMetrics, computed: bool) -> CleaningStatus {
    if computed {
        return CleaningStatus::Ready;
    }
    if metrics.alignment_rate >= 0.95
        && metrics.completeness >= 0.95
        && metrics.validation_error_count == 0
    {
        return CleaningStatus::Ready;
    }
    if metrics.alignment_rate >= 0.85 && metrics.completeness >= 0.85 {
        return CleaningStatus::InProgress;
    }
    CleaningStatus::NeedsReview
}

/// Score a dataset against the store and cache the result in its metadata.
pub fn refresh_dataset_health(
    dataset: &mut DatasetDescriptor,
    store: &dyn BoundaryStore,
    values: &[DatasetValue],
    verbose: u8,
) -> Result<(HealthMetrics, CleaningStatus)> {
    let boundary_pcodes = store.level_pcodes(&dataset.country, dataset.admin_level)?;
    let computed = dataset.is_computed();
    let metrics = compute_health(HealthInput {
        kind: dataset.kind,
        boundary_pcodes: &boundary_pcodes,
        values,
        computed,
        marked_ready: dataset.marked_ready(),
    });
    let status = classify(&metrics, computed);
    dataset.apply_health(&metrics, status)?;

    if verbose > 0 {
        eprintln!(
            "[health] {} ({} {}): {}/{} matched, alignment {:.2}, completeness {:.2}, uniqueness {:.2}, {} errors -> {}",
            dataset.id,
            dataset.country,
            dataset.admin_level,
            metrics.matched,
            metrics.total,
            metrics.alignment_rate,
            metrics.completeness,
            metrics.uniqueness,
            metrics.validation_error_count,
            status,
        );
    }

    Ok((metrics, status))
}

/// Number of repeated keys: `code` for numeric, `(code, category)` for
/// categorical. A key appearing N times counts once, not N - 1 times.
fn duplicated_keys(kind: DatasetKind, values: &[DatasetValue]) -> usize {
    let mut counts: HashMap<(&Pcode, Option<&str>), usize> = HashMap::new();
    for value in values {
        let key = match kind {
            DatasetKind::Numeric => (&value.admin_pcode, None),
            DatasetKind::Categorical => (&value.admin_pcode, value.category.as_deref()),
        };
        *counts.entry(key).or_default() += 1;
    }
    counts.values().filter(|&&count| count > 1).count()
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
