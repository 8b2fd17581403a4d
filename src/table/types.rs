//! Tabular result types for bi-dash.
//!
//! Defines the structures used to represent query results after normalization.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DashError, Result};
use crate::table::normalize::normalize_column_name;

/// Represents the normalized result of a BI query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabularResult {
    /// Normalized column names, in result order.
    pub columns: Vec<String>,

    /// Rows of data. Every row has exactly one value per column.
    pub rows: Vec<Row>,
}

impl TabularResult {
    /// Creates a new empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a result with the given columns and rows.
    ///
    /// Column names are normalized. Two names that normalize alike, or rows
    /// whose length differs from the column count, are rejected.
    pub fn with_data(columns: Vec<String>, rows: Vec<Row>) -> Result<Self> {
        let columns: Vec<String> = columns.iter().map(|c| normalize_column_name(c)).collect();
        if let Some(dup) = columns
            .iter()
            .enumerate()
            .find_map(|(i, c)| columns[..i].contains(c).then_some(c))
        {
            return Err(DashError::schema(format!("column '{dup}' appears more than once")));
        }
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != columns.len())
        {
            return Err(DashError::schema(format!(
                "row {} has {} values but the result has {} columns",
                idx,
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    /// Returns true if the result set has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Finds a column by name, applying the same normalization as the columns.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let key = normalize_column_name(name);
        self.columns.iter().position(|c| *c == key)
    }

    /// Like [`column_index`](Self::column_index) but fails with a schema error.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| {
            DashError::schema(format!(
                "expected column '{}' not in result (have: {})",
                normalize_column_name(name),
                self.columns.join(", ")
            ))
        })
    }

    /// Checks that every named column is present.
    pub fn require_columns(&self, names: &[&str]) -> Result<()> {
        let missing: Vec<String> = names
            .iter()
            .filter(|n| self.column_index(n).is_none())
            .map(|n| normalize_column_name(n))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DashError::schema(format!(
                "expected columns absent from result: {}",
                missing.join(", ")
            )))
        }
    }

    /// Returns the value at `row` in column `name`.
    pub fn get(&self, row: usize, name: &str) -> Option<&Value> {
        let col = self.column_index(name)?;
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Appends a column. `values` must have one entry per row.
    pub fn push_column(&mut self, name: &str, values: Vec<Value>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(DashError::internal(format!(
                "column '{}' has {} values for {} rows",
                name,
                values.len(),
                self.rows.len()
            )));
        }
        let key = normalize_column_name(name);
        if let Some(existing) = self.columns.iter().position(|c| *c == key) {
            for (row, value) in self.rows.iter_mut().zip(values) {
                row[existing] = value;
            }
        } else {
            self.columns.push(key);
            for (row, value) in self.rows.iter_mut().zip(values) {
                row.push(value);
            }
        }
        Ok(())
    }

    /// Coerces the named columns to numbers. Values that do not parse become `Null`.
    pub fn coerce_numeric<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        for name in names {
            let idx = self.require_column(name.as_ref())?;
            for row in &mut self.rows {
                row[idx] = row[idx].to_number();
            }
        }
        Ok(())
    }
}

/// A row of data from a query result.
pub type Row = Vec<Value>;

/// Represents a single cell value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    /// Missing value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Numeric value. All JSON numbers land here as floating point.
    Number(f64),

    /// Text value.
    Text(String),
}

impl Value {
    /// Returns true if this value is missing.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value, parsing text when possible.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) if n.is_finite() => Some(*n),
            Value::Number(_) | Value::Null => None,
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Text(s) => {
                let s = s.trim();
                s.parse::<f64>()
                    .ok()
                    .or_else(|| s.replace(',', ".").parse::<f64>().ok())
                    .filter(|n| n.is_finite())
            }
        }
    }

    /// Returns the text content, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Converts to `Number`, or `Null` if coercion fails.
    pub fn to_number(&self) -> Value {
        self.as_f64().map(Value::Number).unwrap_or(Value::Null)
    }

    /// Text with full numeric precision, for data exports and key matching.
    pub fn to_exact_string(&self) -> String {
        match self {
            Value::Number(n) => n.to_string(),
            other => other.to_display_string(),
        }
    }

    /// Terminal form: whole numbers without a fraction, others to 2 decimals.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Value::Number(n) => format!("{n:.2}"),
            Value::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl From<&serde_json::Value> for Value {
    fn from(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
            serde_json::Value::String(s) => Value::Text(s.clone()),
            other => Value::Text(other.to_string()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}
