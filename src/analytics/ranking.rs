//! Top-N ranking and key selection.

use std::cmp::Ordering;

use crate::error::Result;
use crate::table::{TabularResult, Value};

/// The first `n` rows ordered by `sort_key`. Missing values always sort last.
///
/// The sort is stable, so ties keep their original order.
pub fn top_n(
    result: &TabularResult,
    sort_key: &str,
    n: usize,
    descending: bool,
) -> Result<TabularResult> {
    let idx = result.require_column(sort_key)?;
    let mut rows = result.rows.clone();

    rows.sort_by(|a, b| match (a[idx].as_f64(), b[idx].as_f64()) {
        (Some(x), Some(y)) => {
            let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    rows.truncate(n);

    Ok(TabularResult {
        columns: result.columns.clone(),
        rows,
    })
}

/// Rows whose `key_col` contains `search`, case-insensitively. Empty search keeps everything.
pub fn filter_keys(result: &TabularResult, key_col: &str, search: &str) -> Result<TabularResult> {
    let idx = result.require_column(key_col)?;
    let needle = search.trim().to_lowercase();

    let rows = result
        .rows
        .iter()
        .filter(|row| {
            needle.is_empty()
                || (!row[idx].is_null()
                    && row[idx].to_exact_string().to_lowercase().contains(&needle))
        })
        .cloned()
        .collect();

    Ok(TabularResult {
        columns: result.columns.clone(),
        rows,
    })
}

/// Rows whose `key_col` is one of `keys`.
pub fn select_keys(result: &TabularResult, key_col: &str, keys: &[String]) -> Result<TabularResult> {
    let idx = result.require_column(key_col)?;
    let rows = result
        .rows
        .iter()
        .filter(|row| keys.iter().any(|k| *k == row[idx].to_exact_string()))
        .cloned()
        .collect();

    Ok(TabularResult {
        columns: result.columns.clone(),
        rows,
    })
}
