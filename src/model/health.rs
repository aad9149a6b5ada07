use std::fmt;

use serde::{Deserialize, Serialize};

/// Data-quality score for one dataset, recomputable at any time from the
/// boundary store and the dataset's values. Persisted only as a cache under
/// `Dataset.metadata.data_health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthMetrics {
    /// Matched boundary codes / total boundary codes at the dataset's level.
    pub alignment_rate: f64,
    /// Same ratio as alignment; kept as a separate field for consumers.
    pub coverage: f64,
    /// Numeric: fraction of rows that are neither null nor zero.
    /// Categorical: matched codes / total boundary codes.
    pub completeness: f64,
    /// 1 - duplicate rows / total rows (0 when there are no rows).
    pub uniqueness: f64,
    /// Orphaned codes plus duplicated keys.
    pub validation_error_count: usize,
    /// Boundary codes with at least one value.
    pub matched: usize,
    /// Total boundary codes at the dataset's level.
    pub total: usize,
}

impl HealthMetrics {
    /// Score used when an external readiness declaration overrides row counts
    /// (computed/derived datasets, or explicitly marked ready with no rows).
    pub fn fully_healthy(boundary_count: usize) -> Self {
        Self {
            alignment_rate: 1.0,
            coverage: 1.0,
            completeness: 1.0,
            uniqueness: 1.0,
            validation_error_count: 0,
            matched: boundary_count,
            total: boundary_count,
        }
    }
}

/// Readiness classification derived from [`HealthMetrics`], stored under
/// `Dataset.metadata.cleaning_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningStatus {
    Ready,
    InProgress,
    NeedsReview,
}

impl fmt::Display for CleaningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleaningStatus::Ready => f.write_str("ready"),
            CleaningStatus::InProgress => f.write_str("in_progress"),
            CleaningStatus::NeedsReview => f.write_str("needs_review"),
        }
    }
}
