//! Subcommand handlers for bi-dash.
//!
//! Each handler runs its queries through a [`CommandContext`] and returns a
//! [`TabularResult`] (or named sections of them) for the export layer to
//! render. None of them print.

pub mod dashboard;
pub mod login;
pub mod query;
pub mod regions;
pub mod report;
pub mod trend;

use tracing::debug;

use crate::cache::CachePolicy;
use crate::config::{Config, QueryDefinition};
use crate::error::Result;
use crate::query::{NamedQuery, QueryExecutor, QueryParams};
use crate::table::TabularResult;

/// Configured query behind `report`.
pub const SALES_REPORT: &str = "sales_report";
/// Configured query behind `trend --granularity week`.
pub const TREND_WEEK: &str = "trend_week";
/// Configured query behind `trend --granularity day`.
pub const TREND_DAY: &str = "trend_day";
/// Configured query behind `regions`.
pub const ORDERS_BY_POSTCODE: &str = "orders_by_postcode";
/// Optional warehouse packing query shown by `dashboard`.
pub const PACKING_REPORT: &str = "packing_report";

/// Context provided to command handlers.
pub struct CommandContext<'a> {
    /// Executor for BI queries.
    pub executor: &'a QueryExecutor,
    /// Loaded configuration (named queries, regions).
    pub config: &'a Config,
    /// Whether cached results may be served.
    pub cache: CachePolicy,
}

impl<'a> CommandContext<'a> {
    pub fn new(executor: &'a QueryExecutor, config: &'a Config) -> Self {
        Self {
            executor,
            config,
            cache: CachePolicy::Reuse,
        }
    }

    /// Always run queries; their results still refresh the cache.
    pub fn without_cache(mut self) -> Self {
        self.cache = CachePolicy::Refresh;
        self
    }

    /// Runs a query definition under the context's cache policy.
    pub async fn run(&self, query: &QueryDefinition, params: &QueryParams) -> Result<TabularResult> {
        self.executor.execute_with(query, params, self.cache).await
    }

    /// Runs configured queries concurrently, in the given order.
    pub async fn run_all(
        &self,
        queries: &[(&str, QueryParams)],
    ) -> Result<Vec<(String, TabularResult)>> {
        let batch = queries
            .iter()
            .map(|(name, params)| {
                Ok(NamedQuery {
                    name: name.to_string(),
                    definition: self.config.get_query(name)?.clone(),
                    params: params.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        debug!("Running {} configured queries", batch.len());
        self.executor.execute_all(&batch, self.cache).await
    }

    /// Runs a query from the config file by name.
    pub async fn run_named(&self, name: &str, params: &QueryParams) -> Result<TabularResult> {
        let query = self.config.get_query(name)?;
        debug!("Running configured query '{}'", name);
        self.run(query, params).await
    }
}
