//! Cross-tabulation onto a complete time axis.
//!
//! Trend views pivot rows by (time bucket, key) and reindex them onto every
//! bucket of the requested range, so a week or day with no sales shows up as
//! zero instead of disappearing from the chart.

use chrono::{Datelike, Duration as ChronoDuration, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::error::{DashError, Result};
use crate::table::{normalize_column_name, TabularResult, Value};

/// A gap-free sequence of time buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeAxis {
    /// Mondays from `first` through `last`, inclusive.
    Weekly { first: NaiveDate, last: NaiveDate },
    /// Days in the half-open range `[from, to)`.
    Daily { from: NaiveDate, to: NaiveDate },
}

impl TimeAxis {
    /// The `weeks` weeks ending with the week that contains `week_start`.
    ///
    /// Fails when the range leaves the supported calendar.
    pub fn weekly(week_start: NaiveDate, weeks: u32) -> Result<Self> {
        let out_of_range =
            || DashError::config(format!("{weeks} weeks back from {week_start} is out of range"));
        let last = monday_of(week_start);
        let first = last
            .checked_sub_signed(ChronoDuration::weeks(i64::from(weeks.max(1)) - 1))
            .ok_or_else(out_of_range)?;
        last.checked_add_signed(ChronoDuration::days(7))
            .ok_or_else(out_of_range)?;
        Ok(Self::Weekly { first, last })
    }

    /// Days of `[from, to)`.
    pub fn daily(from: NaiveDate, to: NaiveDate) -> Self {
        Self::Daily { from, to }
    }

    /// Every bucket start on the axis, ascending.
    pub fn buckets(&self) -> Vec<NaiveDate> {
        match *self {
            Self::Weekly { first, last } => first
                .iter_weeks()
                .take_while(|d| *d <= last)
                .collect(),
            Self::Daily { from, to } => from.iter_days().take_while(|d| *d < to).collect(),
        }
    }

    /// The covered dates as a half-open range `[start, end)`.
    pub fn range(&self) -> (NaiveDate, NaiveDate) {
        match *self {
            Self::Weekly { first, last } => (first, last + ChronoDuration::days(7)),
            Self::Daily { from, to } => (from, to),
        }
    }

    /// Bucket a date falls into, before range checks.
    fn bucket_of(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Weekly { .. } => monday_of(date),
            Self::Daily { .. } => date,
        }
    }
}

/// Monday of the ISO week containing `date`.
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - ChronoDuration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Parses a date cell: `YYYY-MM-DD`, optionally followed by a time part.
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    let text = value.as_str()?.trim();
    let head = text.get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// A (time × key) grid of summed values.
#[derive(Debug, Clone, PartialEq)]
pub struct Pivot {
    /// Bucket starts, ascending.
    pub axis: Vec<NaiveDate>,
    /// Keys, sorted.
    pub keys: Vec<String>,
    /// `cells[t][k]` is the sum for `axis[t]` and `keys[k]`.
    pub cells: Vec<Vec<f64>>,
}

impl Pivot {
    /// A pivot with no keys: every bucket of `axis` and nothing else.
    pub fn empty(axis: TimeAxis) -> Self {
        let axis = axis.buckets();
        let cells = vec![Vec::new(); axis.len()];
        Self {
            axis,
            keys: Vec::new(),
            cells,
        }
    }

    /// The series for one key, aligned with `axis`.
    pub fn series(&self, key: &str) -> Option<Vec<f64>> {
        let k = self.keys.iter().position(|x| x == key)?;
        Some(self.cells.iter().map(|row| row[k]).collect())
    }

    /// Converts to a table: the time column followed by one column per key.
    ///
    /// Key columns keep their original spelling so SKUs display as-is.
    pub fn to_table(&self, time_col: &str) -> TabularResult {
        let mut columns = vec![normalize_column_name(time_col)];
        columns.extend(self.keys.iter().cloned());

        let rows = self
            .axis
            .iter()
            .zip(&self.cells)
            .map(|(date, cells)| {
                let mut row = vec![Value::Text(date.format("%Y-%m-%d").to_string())];
                row.extend(cells.iter().map(|v| Value::Number(*v)));
                row
            })
            .collect();

        TabularResult { columns, rows }
    }
}

/// Pivots `value_col` by `time_col` and `key_col` onto `axis`, zero-filling gaps.
///
/// Values in the same bucket and key are summed. Rows with a missing key or an
/// unparseable date are skipped, as are dates outside the axis.
pub fn pivot(
    result: &TabularResult,
    time_col: &str,
    key_col: &str,
    value_col: &str,
    axis: TimeAxis,
) -> Result<Pivot> {
    let time_idx = result.require_column(time_col)?;
    let key_idx = result.require_column(key_col)?;
    let value_idx = result.require_column(value_col)?;

    let buckets = axis.buckets();
    if buckets.is_empty() {
        return Err(DashError::config("time range is empty"));
    }
    let positions: BTreeMap<NaiveDate, usize> =
        buckets.iter().enumerate().map(|(i, d)| (*d, i)).collect();

    let mut sums: BTreeMap<(usize, String), f64> = BTreeMap::new();
    let mut keys: BTreeSet<String> = BTreeSet::new();
    let mut skipped = 0usize;

    for row in &result.rows {
        if row[key_idx].is_null() {
            skipped += 1;
            continue;
        }
        let key = row[key_idx].to_exact_string();
        let Some(pos) = parse_date(&row[time_idx])
            .map(|d| axis.bucket_of(d))
            .and_then(|b| positions.get(&b).copied())
        else {
            skipped += 1;
            continue;
        };

        keys.insert(key.clone());
        *sums.entry((pos, key)).or_insert(0.0) += row[value_idx].as_f64().unwrap_or(0.0);
    }

    if skipped > 0 {
        debug!("Pivot skipped {} rows outside the time axis or without a key", skipped);
    }

    let keys: Vec<String> = keys.into_iter().collect();
    let cells = (0..buckets.len())
        .map(|t| {
            keys.iter()
                .map(|k| sums.get(&(t, k.clone())).copied().unwrap_or(0.0))
                .collect()
        })
        .collect();

    Ok(Pivot {
        axis: buckets,
        keys,
        cells,
    })
}
