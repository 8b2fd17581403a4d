//! Column-name normalization.

/// Normalizes a column name: trims, lower-cases and joins inner whitespace with `_`.
///
/// `" Curr  Rev"` and `"curr_rev"` both become `"curr_rev"`, so callers can
/// match on fixed keys regardless of how the BI tool spells its columns.
pub fn normalize_column_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Anonymous column names `col_1..col_n`.
pub fn anonymous_columns(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("col_{i}")).collect()
}
