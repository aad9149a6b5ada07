use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::level::AdminLevel;

/// Hand-maintained per-country configuration: which catalog dataset carries
/// the boundaries and how many units each level is expected to have.
///
/// This is externally supplied input, injected rather than hard-coded, so the
/// pipeline can run against synthetic profiles in tests. Expected counts are
/// advisory; mismatches are reported, never fatal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryProfile {
    pub iso_code: String,
    pub name: String,
    /// Catalog identifier of the boundary dataset (e.g. "cod-ab-bgd").
    pub dataset_id: String,
    /// Expected unit count per level; `None` when the level exists but the
    /// count is unknown, absent when the level is not published at all.
    #[serde(default)]
    pub expected_counts: BTreeMap<AdminLevel, Option<usize>>,
}

impl CountryProfile {
    /// Expected count for one level, if the profile declares one.
    pub fn expected(&self, level: AdminLevel) -> Option<usize> {
        self.expected_counts.get(&level).copied().flatten()
    }

    /// Load a profile list from a JSON file.
    pub fn load_all(path: &Path) -> Result<Vec<CountryProfile>> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read profiles file: {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse profiles file: {}", path.display()))
    }

    /// Profiles for the countries this project currently tracks.
    pub fn builtin() -> Vec<CountryProfile> {
        fn counts(pairs: &[(AdminLevel, Option<usize>)]) -> BTreeMap<AdminLevel, Option<usize>> {
            pairs.iter().copied().collect()
        }
        use AdminLevel::*;

        vec![
            CountryProfile {
                iso_code: "BGD".into(),
                name: "Bangladesh".into(),
                dataset_id: "cod-ab-bgd".into(),
                expected_counts: counts(&[
                    (Adm0, Some(1)),
                    (Adm1, Some(8)),
                    (Adm2, Some(64)),
                    (Adm3, Some(507)),
                    (Adm4, None),
                ]),
            },
            CountryProfile {
                iso_code: "MOZ".into(),
                name: "Mozambique".into(),
                dataset_id: "cod-ab-moz".into(),
                expected_counts: counts(&[
                    (Adm0, Some(1)),
                    (Adm1, Some(11)),
                    (Adm2, Some(159)),
                    (Adm3, Some(412)),
                    (Adm4, None),
                ]),
            },
            CountryProfile {
                iso_code: "PSE".into(),
                name: "Palestine".into(),
                dataset_id: "cod-ab-pse".into(),
                expected_counts: counts(&[(Adm0, Some(1)), (Adm1, Some(16)), (Adm2, Some(16))]),
            },
            CountryProfile {
                iso_code: "PHL".into(),
                name: "Philippines".into(),
                dataset_id: "cod-ab-phl".into(),
                expected_counts: counts(&[
                    (Adm0, Some(1)),
                    (Adm1, Some(17)),
                    (Adm2, Some(88)),
                    (Adm3, Some(1642)),
                    (Adm4, Some(42048)),
                ]),
            },
            CountryProfile {
                iso_code: "LKA".into(),
                name: "Sri Lanka".into(),
                dataset_id: "cod-ab-lka".into(),
                expected_counts: counts(&[
                    (Adm0, Some(1)),
                    (Adm1, Some(9)),
                    (Adm2, Some(25)),
                    (Adm3, Some(331)),
                    (Adm4, Some(14022)),
                ]),
            },
        ]
    }

    /// Look up a profile by ISO code (case-insensitive).
    pub fn find<'a>(profiles: &'a [CountryProfile], iso: &str) -> Option<&'a CountryProfile> {
        profiles.iter().find(|p| p.iso_code.eq_ignore_ascii_case(iso.trim()))
    }
}
