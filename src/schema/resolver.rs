use regex::Regex;

use crate::model::AdminLevel;

use super::matcher::{first_match, ColumnMatch, Rule};

/// How the admin level of a layer was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelSource {
    /// Supplied by the caller (e.g. known from catalog metadata).
    Hint,
    /// Parsed from an `adm0`..`adm4` token in the layer/file name.
    Filename,
    /// Inferred from the length of sampled code values.
    CodeLength,
    /// No signal at all; the fixed default level.
    Default,
}

/// Result of schema inference over one source layer.
///
/// Always a complete value: unresolved fields are explicit markers, never
/// errors. An unresolved `pcode` means the layer is unusable and should be
/// skipped; an unresolved `name` degrades to using the code as the display
/// name; an unresolved `parent_pcode` means no parent gets recorded (the
/// hierarchy validator will then report the level as fully orphaned).
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSchema {
    pub pcode: ColumnMatch,
    pub name: ColumnMatch,
    pub parent_pcode: ColumnMatch,
    pub admin_level: AdminLevel,
    pub level_source: LevelSource,
}

/// Fallback level when neither hint, filename, nor code samples give a signal.
const DEFAULT_LEVEL: AdminLevel = AdminLevel::Adm3;

/// Infer which columns hold the code, display name, and parent code, and which
/// admin level the layer represents.
///
/// `filename` is any identifying text for the layer (file stem, catalog
/// resource name); `sample_codes` is a small sample of values from a code-like
/// column, used only for the length heuristic.
pub fn resolve_schema(
    columns: &[String],
    filename: Option<&str>,
    hint: Option<AdminLevel>,
    sample_codes: &[String],
) -> ResolvedSchema {
    let (admin_level, level_source) = infer_level(filename, hint, sample_codes);
    let depth = admin_level.depth();

    let pcode = first_match(columns, &pcode_rules(depth));
    let name = first_match(columns, &name_rules(depth));
    let parent_pcode = match admin_level.parent() {
        Some(parent) => first_match(columns, &parent_rules(parent.depth())),
        None => ColumnMatch::Unresolved,
    };

    ResolvedSchema { pcode, name, parent_pcode, admin_level, level_source }
}

/// Priority order: level-specific code column, then generic code columns.
fn pcode_rules(depth: u8) -> Vec<Rule> {
    vec![
        Rule::Contains(format!("adm{depth}_pcode")),
        Rule::Contains(format!("adm{depth}_pcod")),
        Rule::Exact("admin_pcode".into()),
        Rule::Exact("adm_pcode".into()),
        Rule::Contains("pcode".into()),
        Rule::Contains("pcod".into()),
        Rule::Exact("admin_code".into()),
        Rule::Exact("code".into()),
    ]
}

/// Priority order: level-specific name column, then generic name columns.
fn name_rules(depth: u8) -> Vec<Rule> {
    vec![
        Rule::Contains(format!("adm{depth}_name")),
        Rule::Contains(format!("adm{depth}_en")),
        Rule::Exact("name_en".into()),
        Rule::Exact("name".into()),
        Rule::Exact("name_alt".into()),
        Rule::Exact("adm_name".into()),
        Rule::Contains("name".into()),
    ]
}

/// The parent column is the code column pattern for the level one up.
fn parent_rules(parent_depth: u8) -> Vec<Rule> {
    vec![
        Rule::Contains(format!("adm{parent_depth}_pcode")),
        Rule::Contains(format!("adm{parent_depth}_pcod")),
    ]
}

fn infer_level(
    filename: Option<&str>,
    hint: Option<AdminLevel>,
    sample_codes: &[String],
) -> (AdminLevel, LevelSource) {
    if let Some(level) = hint {
        return (level, LevelSource::Hint);
    }
    if let Some(level) = filename.and_then(detect_level_token) {
        return (level, LevelSource::Filename);
    }
    if let Some(level) = level_from_code_lengths(sample_codes) {
        return (level, LevelSource::CodeLength);
    }
    (DEFAULT_LEVEL, LevelSource::Default)
}

/// Look for an `adm3` / `admin3` style token in identifying text.
pub fn detect_level_token(text: &str) -> Option<AdminLevel> {
    let pattern = Regex::new(r"adm(?:in)?[_\-. ]?([0-4])").expect("valid level token pattern");
    let lowered = text.to_ascii_lowercase();
    let captures = pattern.captures(&lowered)?;
    let depth: u8 = captures[1].parse().ok()?;
    AdminLevel::from_depth(depth).ok()
}

/// Longer codes mean deeper levels. Thresholds come from the code schemes of
/// the countries we track (2-char prefix plus 2 digits per level).
fn level_from_code_lengths(samples: &[String]) -> Option<AdminLevel> {
    let lengths: Vec<usize> = samples
        .iter()
        .map(|code| code.trim().len())
        .filter(|&len| len > 0)
        .collect();
    if lengths.is_empty() {
        return None;
    }
    let mean = lengths.iter().sum::<usize>() as f64 / lengths.len() as f64;
    let level = if mean > 8.0 {
        AdminLevel::Adm4
    } else if mean > 6.0 {
        AdminLevel::Adm3
    } else if mean > 4.0 {
        AdminLevel::Adm2
    } else {
        AdminLevel::Adm1
    };
    Some(level)
}
