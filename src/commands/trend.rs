//! `trend`: per-SKU series on a gap-free weekly or daily axis.

use super::{CommandContext, TREND_DAY, TREND_WEEK};
use crate::analytics::{filter_keys, pivot, select_keys, Pivot, TimeAxis};
use crate::cli::{Granularity, TrendArgs};
use crate::error::{DashError, Result};
use crate::query::QueryParams;
use crate::table::{normalize_column_name, TabularResult, Value};

/// Query name, time column and axis for a trend request.
pub fn trend_plan(args: &TrendArgs) -> Result<(&'static str, &'static str, TimeAxis)> {
    let weekly = TimeAxis::weekly(args.week_start, args.weeks)?;
    Ok(match args.granularity {
        Granularity::Week => (TREND_WEEK, "week_start", weekly),
        Granularity::Day => {
            let (from, to) = weekly.range();
            (TREND_DAY, "day", TimeAxis::daily(from, to))
        }
    })
}

pub async fn handle_trend(ctx: &CommandContext<'_>, args: &TrendArgs) -> Result<TabularResult> {
    let (query, time_col, axis) = trend_plan(args)?;
    let (from, to) = axis.range();
    let params = QueryParams::new()
        .with("date_from", from)
        .with("date_to", to);

    let result = ctx.run_named(query, &params).await?;
    build_trend(&result, args, time_col, axis)
}

/// Narrows to the requested SKUs and pivots each metric onto `axis`.
///
/// With one metric the columns are the SKUs. With several, each SKU gets one
/// `"<sku> <metric>"` column per metric, in the order the metrics were given.
pub fn build_trend(
    result: &TabularResult,
    args: &TrendArgs,
    time_col: &str,
    axis: TimeAxis,
) -> Result<TabularResult> {
    if result.is_empty() {
        return Ok(Pivot::empty(axis).to_table(time_col));
    }
    if args.metrics.is_empty() {
        return Err(DashError::config("trend needs at least one --metric"));
    }

    let mut selected = if args.skus.is_empty() {
        result.clone()
    } else {
        select_keys(result, "sku", &args.skus)?
    };
    if let Some(search) = args.search.as_deref() {
        selected = filter_keys(&selected, "sku", search)?;
    }

    let pivots = args
        .metrics
        .iter()
        .map(|metric| pivot(&selected, time_col, "sku", metric, axis))
        .collect::<Result<Vec<Pivot>>>()?;

    match pivots.as_slice() {
        [single] => Ok(single.to_table(time_col)),
        _ => Ok(side_by_side(&pivots, &args.metrics, time_col)),
    }
}

/// Interleaves several pivots over the same rows into one table.
fn side_by_side(pivots: &[Pivot], metrics: &[String], time_col: &str) -> TabularResult {
    let first = &pivots[0];

    let mut columns = vec![normalize_column_name(time_col)];
    for key in &first.keys {
        for metric in metrics {
            columns.push(format!("{key} {metric}"));
        }
    }

    let series: Vec<Vec<Vec<f64>>> = pivots
        .iter()
        .map(|p| {
            first
                .keys
                .iter()
                .map(|k| p.series(k).unwrap_or_else(|| vec![0.0; first.axis.len()]))
                .collect()
        })
        .collect();

    let rows = first
        .axis
        .iter()
        .enumerate()
        .map(|(t, date)| {
            let mut row = vec![Value::Text(date.format("%Y-%m-%d").to_string())];
            for k in 0..first.keys.len() {
                row.extend(series.iter().map(|per_metric| Value::Number(per_metric[k][t])));
            }
            row
        })
        .collect();

    TabularResult { columns, rows }
}
