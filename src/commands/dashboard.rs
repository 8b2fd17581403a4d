//! `dashboard`: every configured section for one week, loaded concurrently.
//!
//! The sales report is always shown. The packing and regional sections appear
//! when their queries are configured.

use tracing::debug;

use super::regions::{build_regions, DEFAULT_METRIC};
use super::report::build_report;
use super::{CommandContext, ORDERS_BY_POSTCODE, PACKING_REPORT, SALES_REPORT};
use crate::analytics::monday_of;
use crate::cli::DashboardArgs;
use crate::error::Result;
use crate::query::QueryParams;
use crate::table::TabularResult;

pub const SALES_SECTION: &str = "sales";
pub const PACKING_SECTION: &str = "packing";
pub const REGIONS_SECTION: &str = "regions";

/// A titled table of the dashboard.
pub type Section = (String, TabularResult);

pub async fn handle_dashboard(
    ctx: &CommandContext<'_>,
    args: &DashboardArgs,
) -> Result<Vec<Section>> {
    let week = monday_of(args.week_start);
    let params = QueryParams::new().with("week_start", week);

    let mut queries = vec![(SALES_REPORT, params.clone())];
    for optional in [PACKING_REPORT, ORDERS_BY_POSTCODE] {
        if ctx.config.queries.contains_key(optional) {
            queries.push((optional, params.clone()));
        } else {
            debug!("'{}' is not configured, skipping its section", optional);
        }
    }

    ctx.run_all(&queries)
        .await?
        .into_iter()
        .map(|(name, result)| build_section(ctx, args, &name, result))
        .collect()
}

fn build_section(
    ctx: &CommandContext<'_>,
    args: &DashboardArgs,
    query: &str,
    result: TabularResult,
) -> Result<Section> {
    match query {
        SALES_REPORT => {
            let table = if result.is_empty() {
                result
            } else {
                build_report(result, &args.report_args())?
            };
            Ok((SALES_SECTION.to_string(), table))
        }
        ORDERS_BY_POSTCODE => Ok((
            REGIONS_SECTION.to_string(),
            build_regions(&result, DEFAULT_METRIC, &ctx.config.regions)?,
        )),
        _ => Ok((PACKING_SECTION.to_string(), result)),
    }
}
