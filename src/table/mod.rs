//! Normalized tabular results.
//!
//! Every payload shape the BI API returns ends up as a [`TabularResult`]
//! with normalized column names.

mod normalize;
mod types;

pub use normalize::{anonymous_columns, normalize_column_name};
pub use types::{Row, TabularResult, Value};
