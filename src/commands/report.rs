//! `report`: week-over-week sales per SKU.

use tracing::info;

use super::{CommandContext, SALES_REPORT};
use crate::analytics::{
    filter_keys, monday_of, top_n, with_aov_column, with_change_column, with_label_column,
};
use crate::cli::ReportArgs;
use crate::error::Result;
use crate::query::QueryParams;
use crate::table::TabularResult;

/// Revenue change column added to the report.
pub const REV_CHANGE: &str = "rev_change_pct";
/// Quantity change column, added when the query returns quantities.
pub const QTY_CHANGE: &str = "qty_change_pct";
/// Label column derived from [`REV_CHANGE`].
pub const TREND_LABEL: &str = "trend";

pub async fn handle_report(ctx: &CommandContext<'_>, args: &ReportArgs) -> Result<TabularResult> {
    let week = monday_of(args.week_start);
    let params = QueryParams::new().with("week_start", week);

    let result = ctx.run_named(SALES_REPORT, &params).await?;
    if result.is_empty() {
        info!("No sales in the week of {}", week);
        return Ok(result);
    }
    build_report(result, args)
}

/// Adds change, label and order-value columns, then filters and ranks.
///
/// Requires `sku`, `curr_rev` and `prev_rev`. `curr_qty`/`prev_qty` and
/// `curr_orders` are optional.
pub fn build_report(mut result: TabularResult, args: &ReportArgs) -> Result<TabularResult> {
    result.require_columns(&["sku", "curr_rev", "prev_rev"])?;

    with_change_column(&mut result, "curr_rev", "prev_rev", REV_CHANGE)?;
    if result.column_index("curr_qty").is_some() && result.column_index("prev_qty").is_some() {
        with_change_column(&mut result, "curr_qty", "prev_qty", QTY_CHANGE)?;
    }
    if result.column_index("curr_orders").is_some() {
        with_aov_column(&mut result, "curr_rev", "curr_orders", "aov")?;
    }
    with_label_column(&mut result, REV_CHANGE, TREND_LABEL, args.threshold)?;

    let result = match args.search.as_deref() {
        Some(search) => filter_keys(&result, "sku", search)?,
        None => result,
    };
    top_n(&result, &args.sort_by, args.top, true)
}
