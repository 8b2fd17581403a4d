//! `regions`: weekly totals per postal region.

use std::collections::BTreeMap;
use tracing::info;

use super::{CommandContext, ORDERS_BY_POSTCODE};
use crate::analytics::{aggregate_by_region, monday_of, RegionLookup};
use crate::cli::RegionsArgs;
use crate::error::Result;
use crate::query::QueryParams;
use crate::table::{normalize_column_name, TabularResult};

/// Postal code column expected from the regional query.
pub const POSTAL_COLUMN: &str = "postal_code";

/// Value column `dashboard` sums per region.
pub const DEFAULT_METRIC: &str = "revenue";

pub async fn handle_regions(ctx: &CommandContext<'_>, args: &RegionsArgs) -> Result<TabularResult> {
    let week = monday_of(args.week_start);
    let params = QueryParams::new().with("week_start", week);
    let result = ctx.run_named(ORDERS_BY_POSTCODE, &params).await?;

    if result.is_empty() {
        info!("No orders in the week of {}", week);
    }
    build_regions(&result, &args.metric, &ctx.config.regions)
}

/// Sums `metric` per region. An empty result gives an empty two-column table.
pub fn build_regions(
    result: &TabularResult,
    metric: &str,
    regions: &BTreeMap<String, String>,
) -> Result<TabularResult> {
    if result.is_empty() {
        return TabularResult::with_data(
            vec!["region".to_string(), normalize_column_name(metric)],
            Vec::new(),
        );
    }
    let lookup = RegionLookup::from_config(regions);
    aggregate_by_region(result, POSTAL_COLUMN, metric, &lookup)
}
