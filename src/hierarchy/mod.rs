//! Parent/child validation across the admin levels of one country.
//!
//! Everything here is advisory: the validator counts and reports, it never
//! rejects. Source data routinely carries broken parent links, and operators
//! decide what to do with the numbers.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{AdminLevel, AdministrativeBoundary, CountryProfile, Pcode};

/// Cap on individual bad links listed per level, so a thoroughly broken
/// source cannot produce an unbounded report.
const MAX_REPORTED_LINKS: usize = 10;

/// Per-level link statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelStats {
    pub total: usize,
    /// Records carrying any parent reference at all.
    pub with_parent: usize,
    /// Records whose parent reference resolves in the parent level.
    pub valid_parents: usize,
    /// Records whose parent link does not resolve, including records with no
    /// parent recorded. ADM0 is exempt by definition.
    pub orphans: usize,
}

/// Validation output for one country's worth of levels.
#[derive(Debug, Clone, Default)]
pub struct HierarchyReport {
    pub levels: BTreeMap<AdminLevel, LevelStats>,
    /// Human-readable findings: unresolved links (capped), missing parent
    /// levels, expected-count mismatches.
    pub issues: Vec<String>,
}

impl HierarchyReport {
    /// True when no issues were recorded at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Cross-reference every level against its declared parent level and,
/// when a profile is supplied, against the expected unit counts.
pub fn validate_hierarchy(
    levels: &BTreeMap<AdminLevel, Vec<AdministrativeBoundary>>,
    profile: Option<&CountryProfile>,
) -> HierarchyReport {
    let mut report = HierarchyReport::default();

    for (&level, records) in levels {
        let total = records.len();

        if let Some(expected) = profile.and_then(|p| p.expected(level)) {
            if expected != total {
                report
                    .issues
                    .push(format!("{level}: {total} features, expected {expected}"));
            }
        }

        // ADM0 has no parent by definition.
        let Some(parent_level) = level.parent() else {
            report.levels.insert(level, LevelStats { total, ..Default::default() });
            continue;
        };

        let Some(parent_records) = levels.get(&parent_level) else {
            // The whole parent level is absent: everything is orphaned, but
            // the level itself is still importable.
            report
                .issues
                .push(format!("{level}: no parent level {parent_level} present"));
            report.levels.insert(
                level,
                LevelStats {
                    total,
                    with_parent: records.iter().filter(|r| r.parent_pcode.is_some()).count(),
                    valid_parents: 0,
                    orphans: total,
                },
            );
            continue;
        };

        let parent_pcodes: BTreeSet<&Pcode> =
            parent_records.iter().map(|r| &r.admin_pcode).collect();

        let mut with_parent = 0;
        let mut valid_parents = 0;
        let mut invalid_links: Vec<String> = Vec::new();

        for record in records {
            let Some(parent) = &record.parent_pcode else { continue };
            with_parent += 1;
            if parent_pcodes.contains(parent) {
                valid_parents += 1;
            } else {
                invalid_links.push(format!("{} -> {}", record.admin_pcode, parent));
            }
        }

        if !invalid_links.is_empty() {
            report.issues.push(format!(
                "{level}: {} unresolved parent references",
                invalid_links.len()
            ));
            for link in invalid_links.iter().take(MAX_REPORTED_LINKS) {
                report.issues.push(format!("  - {link}"));
            }
        }

        report.levels.insert(
            level,
            LevelStats {
                total,
                with_parent,
                valid_parents,
                orphans: total - valid_parents,
            },
        );
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as Map;

    use geo::{Coord, LineString, MultiPolygon, Polygon};

    use crate::model::CountryCode;

    fn boundary(level: AdminLevel, code: &str, parent: Option<&str>) -> AdministrativeBoundary {
        AdministrativeBoundary {
            country: CountryCode::new("BGD"),
            admin_pcode: Pcode::new(code),
            admin_level: level,
            name: None,
            parent_pcode: parent.map(Pcode::new),
            geometry: MultiPolygon(vec![Polygon::new(
                LineString(vec![
                    Coord { x: 0.0, y: 0.0 },
                    Coord { x: 1.0, y: 0.0 },
                    Coord { x: 1.0, y: 1.0 },
                    Coord { x: 0.0, y: 0.0 },
                ]),
                vec![],
            )]),
            source: Default::default(),
        }
    }

    #[test]
    fn counts_valid_links_and_orphans() {
        let mut levels = Map::new();
        levels.insert(AdminLevel::Adm0, vec![boundary(AdminLevel::Adm0, "BD", None)]);
        levels.insert(
            AdminLevel::Adm1,
            vec![
                boundary(AdminLevel::Adm1, "BD10", Some("BD")),
                boundary(AdminLevel::Adm1, "BD20", Some("BD")),
                boundary(AdminLevel::Adm1, "BD30", Some("XX")), // unresolved
                boundary(AdminLevel::Adm1, "BD40", None),       // no parent recorded
            ],
        );

        let report = validate_hierarchy(&levels, None);
        let adm1 = &report.levels[&AdminLevel::Adm1];
        assert_eq!(adm1.total, 4);
        assert_eq!(adm1.with_parent, 3);
        assert_eq!(adm1.valid_parents, 2);
        assert_eq!(adm1.orphans, 2);

        // ADM0 is exempt.
        let adm0 = &report.levels[&AdminLevel::Adm0];
        assert_eq!(adm0.total, 1);
        assert_eq!(adm0.orphans, 0);

        assert!(report.issues.iter().any(|i| i.contains("1 unresolved parent references")));
        assert!(report.issues.iter().any(|i| i.contains("BD30 -> XX")));
    }

    #[test]
    fn missing_parent_level_is_fully_orphaned_not_fatal() {
        let mut levels = Map::new();
        levels.insert(
            AdminLevel::Adm2,
            vec![
                boundary(AdminLevel::Adm2, "BD1004", Some("BD10")),
                boundary(AdminLevel::Adm2, "BD1006", Some("BD10")),
            ],
        );

        let report = validate_hierarchy(&levels, None);
        let adm2 = &report.levels[&AdminLevel::Adm2];
        assert_eq!(adm2.total, 2);
        assert_eq!(adm2.with_parent, 2);
        assert_eq!(adm2.valid_parents, 0);
        assert_eq!(adm2.orphans, 2);
        assert!(report.issues.iter().any(|i| i.contains("no parent level ADM1")));
    }

    #[test]
    fn reported_links_are_capped() {
        let mut levels = Map::new();
        levels.insert(AdminLevel::Adm0, vec![boundary(AdminLevel::Adm0, "BD", None)]);
        let children: Vec<_> = (0..50)
            .map(|i| boundary(AdminLevel::Adm1, &format!("BD{i:02}"), Some("NOPE")))
            .collect();
        levels.insert(AdminLevel::Adm1, children);

        let report = validate_hierarchy(&levels, None);
        let link_lines = report.issues.iter().filter(|i| i.starts_with("  - ")).count();
        assert_eq!(link_lines, 10);
        assert!(report.issues.iter().any(|i| i.contains("50 unresolved parent references")));
    }

    #[test]
    fn expected_count_mismatch_is_a_warning_only() {
        let profile = CountryProfile {
            iso_code: "BGD".into(),
            name: "Bangladesh".into(),
            dataset_id: "cod-ab-bgd".into(),
            expected_counts: [(AdminLevel::Adm1, Some(8))].into_iter().collect(),
        };
        let mut levels = Map::new();
        levels.insert(
            AdminLevel::Adm1,
            vec![boundary(AdminLevel::Adm1, "BD10", None)],
        );

        let report = validate_hierarchy(&levels, Some(&profile));
        assert!(report.issues.iter().any(|i| i.contains("1 features, expected 8")));
        // Still produced stats; nothing was blocked.
        assert_eq!(report.levels[&AdminLevel::Adm1].total, 1);
    }
}
