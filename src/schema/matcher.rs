/// Outcome of searching a layer's columns for one role.
///
/// Column matching is a best-effort search over unpredictable source naming;
/// a miss is an ordinary value, never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnMatch {
    /// The source column (original spelling) that fills the role.
    Resolved(String),
    Unresolved,
}

impl ColumnMatch {
    #[inline]
    pub fn is_resolved(&self) -> bool {
        matches!(self, ColumnMatch::Resolved(_))
    }

    /// The matched column name, if any.
    #[inline]
    pub fn as_deref(&self) -> Option<&str> {
        match self {
            ColumnMatch::Resolved(name) => Some(name),
            ColumnMatch::Unresolved => None,
        }
    }
}

/// One naming pattern, evaluated against lowercased column names.
#[derive(Debug, Clone)]
pub(crate) enum Rule {
    /// Column name equals the pattern.
    Exact(String),
    /// Column name contains the pattern.
    Contains(String),
}

impl Rule {
    fn matches(&self, column_lower: &str) -> bool {
        match self {
            Rule::Exact(pattern) => column_lower == pattern,
            Rule::Contains(pattern) => column_lower.contains(pattern.as_str()),
        }
    }
}

/// Evaluate rules in priority order; within one rule, columns keep source
/// order. The first hit wins.
pub(crate) fn first_match(columns: &[String], rules: &[Rule]) -> ColumnMatch {
    let lowered: Vec<String> = columns.iter().map(|c| c.to_ascii_lowercase()).collect();
    for rule in rules {
        for (column, lower) in columns.iter().zip(&lowered) {
            if rule.matches(lower) {
                return ColumnMatch::Resolved(column.clone());
            }
        }
    }
    ColumnMatch::Unresolved
}
