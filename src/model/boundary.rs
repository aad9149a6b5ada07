use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use geo::MultiPolygon;

use super::level::AdminLevel;

/// Stable key for one administrative unit at a given level.
/// Keeps the original code text (leading zeros and all) without repeated owned Strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pcode(Arc<str>);

impl Pcode {
    pub fn new(code: &str) -> Self {
        Self(Arc::from(code.trim()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Pcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Pcode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

/// ISO 3166-1 alpha-3 country code, uppercased on construction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CountryCode(Arc<str>);

impl CountryCode {
    pub fn new(iso: &str) -> Self {
        Self(Arc::from(iso.trim().to_ascii_uppercase().as_str()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CountryCode {
    fn from(iso: &str) -> Self {
        Self::new(iso)
    }
}

/// One polygonal administrative unit in the canonical store.
///
/// The key is `(country, admin_pcode)`: pcodes are only guaranteed unique
/// within a country, so the store never relies on global uniqueness.
/// `admin_level` should be exactly one greater than the parent's level; that
/// is validated and reported by the hierarchy checks, not rejected at write
/// time, because source data routinely violates it.
#[derive(Debug, Clone)]
pub struct AdministrativeBoundary {
    pub country: CountryCode,
    pub admin_pcode: Pcode,
    pub admin_level: AdminLevel,
    pub name: Option<Arc<str>>,
    /// Reference to the unit one level up; `None` only at ADM0 (or when the
    /// source simply never recorded one).
    pub parent_pcode: Option<Pcode>,
    /// Stored in EPSG:4326, polygonal only.
    pub geometry: MultiPolygon<f64>,
    /// Free-form provenance (source layer, resolved columns, ...).
    pub source: BTreeMap<String, String>,
}
