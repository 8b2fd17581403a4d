//! Command-line argument parsing for bi-dash.

use crate::config::ApiConfig;
use crate::export::OutputFormat;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Sales dashboards from a BI tool's query API, in the terminal.
#[derive(Parser, Debug)]
#[command(name = "bidash")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH", env = "BIDASH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// BI API base URL (e.g., https://bi.example.com/api)
    #[arg(long, value_name = "URL", global = true)]
    pub base_url: Option<String>,

    /// BI API user
    #[arg(short = 'U', long, value_name = "USER", global = true)]
    pub username: Option<String>,

    /// Database id inside the BI tool
    #[arg(short = 'd', long, value_name = "ID", global = true)]
    pub database_id: Option<u64>,

    /// Always run queries instead of reusing saved results
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Output format: table, csv, or json
    #[arg(short = 'f', long, value_name = "FORMAT", default_value = "table", global = true)]
    pub format: OutputFormat,

    /// Write output to file instead of stdout
    #[arg(short = 'o', long, value_name = "PATH", global = true)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a configured or ad-hoc native query
    Query(QueryArgs),
    /// Week-over-week sales report per SKU
    Report(ReportArgs),
    /// Revenue trend per SKU on a gap-free time axis
    Trend(TrendArgs),
    /// Revenue per postal region
    Regions(RegionsArgs),
    /// Sales, packing and regional sections for one week, loaded together
    Dashboard(DashboardArgs),
    /// Check credentials and manage the stored password
    Login(LoginArgs),
}

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Name of a query from the config file
    #[arg(value_name = "NAME", required_unless_present_any = ["sql", "file"])]
    pub name: Option<String>,

    /// SQL text to run instead of a configured query
    #[arg(long, value_name = "SQL", conflicts_with_all = ["name", "file"])]
    pub sql: Option<String>,

    /// File containing SQL to run
    #[arg(long, value_name = "PATH", conflicts_with = "name")]
    pub file: Option<PathBuf>,

    /// Query parameter as NAME=VALUE or NAME:TYPE=VALUE (repeatable)
    #[arg(short = 'p', long = "param", value_name = "NAME=VALUE")]
    pub params: Vec<String>,

    /// Columns to coerce to numbers (comma-separated)
    #[arg(long, value_name = "COLUMNS", value_delimiter = ',')]
    pub numeric: Vec<String>,

    /// Keep only the top N rows by --sort-by
    #[arg(long, value_name = "N", requires = "sort_by")]
    pub top: Option<usize>,

    /// Column to rank by (descending)
    #[arg(long, value_name = "COLUMN")]
    pub sort_by: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Any day of the reported week (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub week_start: NaiveDate,

    /// Change, in percent, that counts as an increase or decrease
    #[arg(long, value_name = "PCT", default_value_t = 10.0)]
    pub threshold: f64,

    /// Number of SKUs shown
    #[arg(long, value_name = "N", default_value_t = 20)]
    pub top: usize,

    /// Column to rank by
    #[arg(long, value_name = "COLUMN", default_value = "curr_rev")]
    pub sort_by: String,

    /// Only SKUs containing this text
    #[arg(long, value_name = "TEXT")]
    pub search: Option<String>,
}

/// Longest trend accepted on the command line: ten years of weeks.
pub const MAX_TREND_WEEKS: i64 = 520;

/// Time bucket of a trend.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Granularity {
    #[default]
    Week,
    Day,
}

#[derive(Args, Debug, Clone)]
pub struct TrendArgs {
    /// Any day of the last week shown (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub week_start: NaiveDate,

    /// Number of weeks shown (1 to 520)
    #[arg(
        long,
        value_name = "N",
        default_value_t = 8,
        value_parser = clap::value_parser!(u32).range(1..=MAX_TREND_WEEKS)
    )]
    pub weeks: u32,

    /// Bucket size
    #[arg(long, value_enum, default_value_t = Granularity::Week)]
    pub granularity: Granularity,

    /// SKU to include (repeatable); all SKUs when omitted
    #[arg(long = "sku", value_name = "SKU")]
    pub skus: Vec<String>,

    /// Only SKUs containing this text
    #[arg(long, value_name = "TEXT")]
    pub search: Option<String>,

    /// Value columns to chart, e.g. revenue,quantity
    #[arg(
        long = "metric",
        value_name = "COLUMNS",
        value_delimiter = ',',
        default_value = "revenue"
    )]
    pub metrics: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RegionsArgs {
    /// Any day of the reported week (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub week_start: NaiveDate,

    /// Value column summed per region
    #[arg(long, value_name = "COLUMN", default_value = "revenue")]
    pub metric: String,
}

#[derive(Args, Debug, Clone)]
pub struct DashboardArgs {
    /// Any day of the reported week (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub week_start: NaiveDate,

    /// Change, in percent, that counts as an increase or decrease
    #[arg(long, value_name = "PCT", default_value_t = 10.0)]
    pub threshold: f64,

    /// Number of SKUs in the sales section
    #[arg(long, value_name = "N", default_value_t = 20)]
    pub top: usize,
}

impl DashboardArgs {
    /// Settings for the sales section, ranked by current revenue.
    pub fn report_args(&self) -> ReportArgs {
        ReportArgs {
            week_start: self.week_start,
            threshold: self.threshold,
            top: self.top,
            sort_by: "curr_rev".to_string(),
            search: None,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    /// Store the password (from config or BI_PASSWORD) in the OS keyring after a successful login
    #[arg(long)]
    pub save_password: bool,

    /// Remove the stored password from the OS keyring
    #[arg(long, conflicts_with = "save_password")]
    pub forget: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::Config::default_path)
    }

    /// API settings given on the command line, for merging over the file.
    pub fn api_overrides(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
            database_id: self.database_id,
            username: self.username.clone(),
            ..Default::default()
        }
    }
}
