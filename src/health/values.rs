//! CSV loading for dataset values.
//!
//! Value files share the boundary problem of unpredictable column naming, so
//! the same rule-based matching applies. Every cell is read as text and
//! parsed here; letting the reader infer types would silently coerce codes
//! like `0101` into integers.

use std::path::Path;

use anyhow::{bail, Context, Result};
use polars::io::SerReader;
use polars::prelude::{CsvReadOptions, DataFrame};

use crate::model::{DatasetKind, DatasetValue, Pcode};
use crate::schema::{first_match, ColumnMatch, Rule};

/// Read a dataset's values from a CSV file.
///
/// The code column is required; for categorical data the category column is
/// too. Rows with an empty code are dropped. Magnitudes that fail to parse
/// are kept as null rows, so completeness scoring can count them.
pub fn load_values_csv(path: &Path, kind: DatasetKind) -> Result<Vec<DatasetValue>> {
    let df = CsvReadOptions::default()
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("Failed to open values file: {}", path.display()))?
        .finish()
        .with_context(|| format!("Failed to read values file: {}", path.display()))?;

    let columns: Vec<String> = df.get_column_names().iter().map(|c| c.to_string()).collect();

    let ColumnMatch::Resolved(pcode_column) = first_match(&columns, &pcode_rules()) else {
        bail!(
            "Values file {} has no resolvable code column (columns: {:?})",
            path.display(),
            columns
        );
    };
    let category_column = match (kind, first_match(&columns, &category_rules())) {
        (DatasetKind::Categorical, ColumnMatch::Resolved(column)) => Some(column),
        (DatasetKind::Categorical, ColumnMatch::Unresolved) => bail!(
            "Values file {} has no category column for categorical data (columns: {:?})",
            path.display(),
            columns
        ),
        (DatasetKind::Numeric, _) => None,
    };
    // Magnitude headers vary by dataset ("population", "poverty_rate", ...),
    // so after the explicit rules fall back to the first column that plays
    // no other role.
    let value_column = match first_match(&columns, &value_rules()) {
        ColumnMatch::Resolved(column) => Some(column),
        ColumnMatch::Unresolved => {
            fallback_value_column(&columns, &pcode_column, category_column.as_deref())
        }
    };

    collect_rows(&df, &pcode_column, category_column.as_deref(), value_column.as_deref())
}

fn collect_rows(
    df: &DataFrame,
    pcode_column: &str,
    category_column: Option<&str>,
    value_column: Option<&str>,
) -> Result<Vec<DatasetValue>> {
    let pcodes = df.column(pcode_column)?.str()?;
    let categories = category_column.map(|c| df.column(c)?.str()).transpose()?;
    let magnitudes = value_column.map(|c| df.column(c)?.str()).transpose()?;

    let mut rows = Vec::with_capacity(df.height());
    for index in 0..df.height() {
        let Some(code) = pcodes.get(index).map(str::trim).filter(|c| !c.is_empty()) else {
            continue;
        };
        rows.push(DatasetValue {
            admin_pcode: Pcode::new(code),
            category: categories
                .and_then(|col| col.get(index))
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            value: magnitudes
                .and_then(|col| col.get(index))
                .and_then(parse_magnitude),
        });
    }
    Ok(rows)
}

fn pcode_rules() -> Vec<Rule> {
    vec![
        Rule::Contains("pcode".into()),
        Rule::Contains("pcod".into()),
        Rule::Exact("admin_code".into()),
        Rule::Exact("code".into()),
    ]
}

fn category_rules() -> Vec<Rule> {
    vec![Rule::Exact("category".into()), Rule::Contains("category".into())]
}

fn value_rules() -> Vec<Rule> {
    vec![
        Rule::Exact("value".into()),
        Rule::Exact("amount".into()),
        Rule::Exact("count".into()),
        Rule::Contains("value".into()),
    ]
}

/// First column that is neither the code, the category, nor a display name.
fn fallback_value_column(
    columns: &[String],
    pcode_column: &str,
    category_column: Option<&str>,
) -> Option<String> {
    columns
        .iter()
        .find(|column| {
            let lower = column.to_ascii_lowercase();
            column.as_str() != pcode_column
                && Some(column.as_str()) != category_column
                && !lower.contains("name")
                && !lower.contains("_en")
        })
        .cloned()
}

/// Stringified nulls become null magnitudes, as do unparseable cells.
fn parse_magnitude(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if ["none", "null", "nan", "na", "-"].iter().any(|p| text.eq_ignore_ascii_case(p)) {
        return None;
    }
    text.replace(',', "").parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn loads_numeric_values_with_level_specific_columns() {
        let file = write_csv(
            "ADM3_PCODE,population\n\
             BD100401,15230\n\
             BD100402,\n\
             BD100403,null\n\
             ,99\n",
        );
        let rows = load_values_csv(file.path(), DatasetKind::Numeric).unwrap();

        // The empty-code row is dropped.
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], DatasetValue::numeric("BD100401", Some(15230.0)));
        assert_eq!(rows[1].value, None);
        assert_eq!(rows[2].value, None);
    }

    #[test]
    fn loads_categorical_values() {
        let file = write_csv(
            "pcode,category,value\n\
             BD10,flood,3\n\
             BD10,cyclone,1\n\
             BD20,flood,2\n",
        );
        let rows = load_values_csv(file.path(), DatasetKind::Categorical).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], DatasetValue::categorical("BD10", "flood", Some(3.0)));
        assert_eq!(rows[1].category.as_deref(), Some("cyclone"));
    }

    #[test]
    fn unlabeled_magnitude_column_is_found_past_name_columns() {
        let file = write_csv(
            "ADM3_PCODE,ADM3_EN,population\n\
             BD100401,Amtali,15230\n\
             BD100402,Bamna,9100\n",
        );
        let rows = load_values_csv(file.path(), DatasetKind::Numeric).unwrap();
        assert_eq!(rows[0], DatasetValue::numeric("BD100401", Some(15230.0)));
        assert_eq!(rows[1].value, Some(9100.0));
    }

    #[test]
    fn missing_code_column_is_fatal() {
        let file = write_csv("name,population\nBarguna,15230\n");
        assert!(load_values_csv(file.path(), DatasetKind::Numeric).is_err());
    }

    #[test]
    fn categorical_without_category_column_is_fatal() {
        let file = write_csv("pcode,value\nBD10,3\n");
        assert!(load_values_csv(file.path(), DatasetKind::Categorical).is_err());
    }

    #[test]
    fn magnitude_parsing_handles_placeholders_and_separators() {
        assert_eq!(parse_magnitude("1,234.5"), Some(1234.5));
        assert_eq!(parse_magnitude("  42 "), Some(42.0));
        assert_eq!(parse_magnitude("NaN"), None);
        assert_eq!(parse_magnitude("-"), None);
        assert_eq!(parse_magnitude("n/a-ish"), None);
    }
}
