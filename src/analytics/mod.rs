//! Presentation-side transforms over query results.
//!
//! Everything here is pure: it takes a [`TabularResult`](crate::table::TabularResult)
//! and derives change columns, rankings, time pivots or regional totals.

pub mod change;
pub mod pivot;
pub mod ranking;
pub mod region;

pub use change::{
    average_order_value, pct_change, with_aov_column, with_change_column, with_label_column,
    ChangeLabel,
};
pub use pivot::{monday_of, parse_date, pivot, Pivot, TimeAxis};
pub use ranking::{filter_keys, select_keys, top_n};
pub use region::{aggregate_by_region, RegionLookup, UNKNOWN_REGION};
