use anyhow::{Context, Result};
use serde_json::{Map, Value};

use super::boundary::{CountryCode, Pcode};
use super::health::{CleaningStatus, HealthMetrics};
use super::level::AdminLevel;

/// Whether a dataset's values are plain magnitudes or magnitudes per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    Numeric,
    Categorical,
}

/// A named statistical layer bound to one country and one admin level.
/// Values live in a separate collection ([`DatasetValue`]).
#[derive(Debug, Clone)]
pub struct DatasetDescriptor {
    pub id: String,
    pub name: String,
    pub country: CountryCode,
    pub admin_level: AdminLevel,
    pub kind: DatasetKind,
    /// Free-form metadata; health scoring writes `data_health` and
    /// `cleaning_status` back into it.
    pub metadata: Map<String, Value>,
}

impl DatasetDescriptor {
    /// Whether the dataset declares itself computed/derived-on-demand.
    /// Such datasets legitimately store no rows, so row-based scoring would
    /// misreport them.
    pub fn is_computed(&self) -> bool {
        if self.metadata.get("source").and_then(Value::as_str) == Some("hazard_event_analysis") {
            return true;
        }
        ["is_computed", "computed"]
            .iter()
            .any(|key| self.metadata.get(*key).and_then(Value::as_bool) == Some(true))
    }

    /// Whether an operator explicitly marked the dataset ready, which takes
    /// precedence over the absence of stored rows.
    pub fn marked_ready(&self) -> bool {
        ["readiness", "cleaning_status"].iter().any(|key| {
            self.metadata.get(*key).and_then(Value::as_str) == Some("ready")
        })
    }

    /// Cache freshly computed health results in the metadata map.
    pub fn apply_health(&mut self, metrics: &HealthMetrics, status: CleaningStatus) -> Result<()> {
        self.metadata.insert(
            "data_health".to_string(),
            serde_json::to_value(metrics).context("serialize data_health")?,
        );
        self.metadata.insert(
            "cleaning_status".to_string(),
            serde_json::to_value(status).context("serialize cleaning_status")?,
        );
        Ok(())
    }
}

/// One observation: keyed by code for numeric data, by (code, category) for
/// categorical data. References a boundary by value, never by foreign key;
/// values may precede or outlive the boundary they describe.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetValue {
    pub admin_pcode: Pcode,
    pub category: Option<String>,
    pub value: Option<f64>,
}

impl DatasetValue {
    pub fn numeric(code: &str, value: Option<f64>) -> Self {
        Self { admin_pcode: Pcode::new(code), category: None, value }
    }

    pub fn categorical(code: &str, category: &str, value: Option<f64>) -> Self {
        Self {
            admin_pcode: Pcode::new(code),
            category: Some(category.to_string()),
            value,
        }
    }
}
