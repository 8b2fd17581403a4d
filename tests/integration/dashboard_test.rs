//! Subcommand handlers against a scripted API.

use async_trait::async_trait;
use bi_dash::api::{ApiRequest, ApiResponse, Method, MockTransport, Transport};
use bi_dash::cli::{DashboardArgs, Granularity, QueryArgs, RegionsArgs, ReportArgs, TrendArgs};
use bi_dash::clock::ManualClock;
use bi_dash::commands::dashboard::handle_dashboard;
use bi_dash::commands::query::handle_query;
use bi_dash::commands::regions::handle_regions;
use bi_dash::commands::report::handle_report;
use bi_dash::commands::trend::handle_trend;
use bi_dash::commands::CommandContext;
use bi_dash::config::{Config, QueryDefinition};
use bi_dash::error::Result;
use bi_dash::export::OutputFormat;
use bi_dash::query::{ExecutorSettings, QueryExecutor};
use bi_dash::session::{Credentials, SessionManager};
use bi_dash::table::Value;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::common::{columnar, harness, poll_settings, with_login};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn config() -> Config {
    let mut config = Config::default();
    config.queries.insert(
        "sales_report".into(),
        QueryDefinition::new("SELECT * FROM weekly_sales WHERE week_start = {{week_start}}")
            .with_numeric(["curr_rev", "curr_qty", "prev_rev", "prev_qty"]),
    );
    config.queries.insert(
        "trend_week".into(),
        QueryDefinition::new(
            "SELECT week_start, sku, revenue FROM weekly_sku \
             WHERE week_start >= {{date_from}} AND week_start < {{date_to}}",
        )
        .with_numeric(["revenue"]),
    );
    config.queries.insert(
        "orders_by_postcode".into(),
        QueryDefinition::new("SELECT postal_code, revenue FROM orders WHERE week = {{week_start}}")
            .with_numeric(["revenue"]),
    );
    config
}

#[tokio::test]
async fn test_report_flow() {
    let mock = with_login(MockTransport::new(), "s1").on(
        Method::Post,
        "dataset",
        columnar(
            &["sku", "product", "curr_rev", "curr_qty", "prev_rev", "prev_qty"],
            json!([
                ["SKU1", "Widget", "100", "10", "80", "8"],
                ["SKU2", "Gadget", "300", "1", "0", "0"]
            ]),
        ),
    );
    let h = harness(mock);
    let config = config();
    let ctx = CommandContext::new(&h.executor, &config);

    let args = ReportArgs {
        week_start: date(2024, 1, 3),
        threshold: 10.0,
        top: 10,
        sort_by: "rev_change_pct".into(),
        search: None,
    };
    let report = handle_report(&ctx, &args).await.unwrap();

    assert_eq!(report.get(0, "sku"), Some(&Value::from("SKU1")));
    assert_eq!(report.get(0, "rev_change_pct"), Some(&Value::Number(25.0)));
    assert_eq!(report.get(1, "trend"), Some(&Value::from("new")));

    let requests = h.mock.requests();
    let body = requests[1].body.as_ref().unwrap();
    assert_eq!(body["parameters"][0]["value"], "2024-01-01");

    let csv = OutputFormat::Csv.render(&report).unwrap();
    assert!(csv.starts_with(
        "sku,product,curr_rev,curr_qty,prev_rev,prev_qty,rev_change_pct,qty_change_pct,trend\n"
    ));
}

#[tokio::test]
async fn test_report_empty_week_is_not_an_error() {
    let mock = with_login(MockTransport::new(), "s1").on(
        Method::Post,
        "dataset",
        columnar(&["sku", "curr_rev", "prev_rev"], json!([])),
    );
    let h = harness(mock);
    let config = config();
    let ctx = CommandContext::new(&h.executor, &config);

    let args = ReportArgs {
        week_start: date(2024, 1, 1),
        threshold: 10.0,
        top: 10,
        sort_by: "curr_rev".into(),
        search: None,
    };
    let report = handle_report(&ctx, &args).await.unwrap();
    assert!(report.is_empty());
}

#[tokio::test]
async fn test_report_requires_configured_query() {
    let h = harness(with_login(MockTransport::new(), "s1"));
    let config = Config::default();
    let ctx = CommandContext::new(&h.executor, &config);

    let args = ReportArgs {
        week_start: date(2024, 1, 1),
        threshold: 10.0,
        top: 10,
        sort_by: "curr_rev".into(),
        search: None,
    };
    let err = handle_report(&ctx, &args).await.unwrap_err();
    assert!(err.to_string().contains("sales_report"));
    assert!(h.mock.requests().is_empty());
}

#[tokio::test]
async fn test_trend_flow_zero_fills() {
    let mock = with_login(MockTransport::new(), "s1").on(
        Method::Post,
        "dataset",
        ApiResponse::json(
            200,
            &json!([
                {"week_start": "2024-01-01T00:00:00Z", "sku": "A", "revenue": 5},
                {"week_start": "2024-01-15T00:00:00Z", "sku": "A", "revenue": 7},
                {"week_start": "2024-01-15T00:00:00Z", "sku": "B", "revenue": 1}
            ]),
        ),
    );
    let h = harness(mock);
    let config = config();
    let ctx = CommandContext::new(&h.executor, &config);

    let args = TrendArgs {
        week_start: date(2024, 1, 15),
        weeks: 3,
        granularity: Granularity::Week,
        skus: Vec::new(),
        search: None,
        metrics: vec!["revenue".into()],
    };
    let table = handle_trend(&ctx, &args).await.unwrap();

    assert_eq!(table.columns, vec!["week_start", "A", "B"]);
    assert_eq!(
        table.rows,
        vec![
            vec![Value::from("2024-01-01"), Value::Number(5.0), Value::Number(0.0)],
            vec![Value::from("2024-01-08"), Value::Number(0.0), Value::Number(0.0)],
            vec![Value::from("2024-01-15"), Value::Number(7.0), Value::Number(1.0)],
        ]
    );

    let requests = h.mock.requests();
    let body = requests[1].body.as_ref().unwrap();
    let values: Vec<&str> = body["parameters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["value"].as_str().unwrap())
        .collect();
    assert_eq!(values, vec!["2024-01-01", "2024-01-22"]);
}

#[tokio::test]
async fn test_trend_day_needs_its_query() {
    let h = harness(with_login(MockTransport::new(), "s1"));
    let config = config();
    let ctx = CommandContext::new(&h.executor, &config);

    let args = TrendArgs {
        week_start: date(2024, 1, 15),
        weeks: 1,
        granularity: Granularity::Day,
        skus: Vec::new(),
        search: None,
        metrics: vec!["revenue".into()],
    };
    let err = handle_trend(&ctx, &args).await.unwrap_err();
    assert!(err.to_string().contains("trend_day"));
}

#[tokio::test]
async fn test_regions_flow() {
    let mock = with_login(MockTransport::new(), "s1").on(
        Method::Post,
        "dataset",
        columnar(
            &["postal_code", "revenue"],
            json!([["61-001", 10], ["00-950", 40], ["62-300", 5], [null, 2]]),
        ),
    );
    let h = harness(mock);
    let config = config();
    let ctx = CommandContext::new(&h.executor, &config);

    let args = RegionsArgs {
        week_start: date(2024, 1, 1),
        metric: "revenue".into(),
    };
    let table = handle_regions(&ctx, &args).await.unwrap();

    assert_eq!(table.columns, vec!["region", "revenue"]);
    assert_eq!(
        table.rows,
        vec![
            vec![Value::from("Warszawa"), Value::Number(40.0)],
            vec![Value::from("Poznań"), Value::Number(15.0)],
            vec![Value::from("unknown"), Value::Number(2.0)],
        ]
    );
}

#[tokio::test]
async fn test_query_flow_ranks_and_caches() {
    let mock = with_login(MockTransport::new(), "s1").on(
        Method::Post,
        "dataset",
        ApiResponse::json(200, &json!([{"sku": "A", "n": "1"}, {"sku": "B", "n": "3"}])),
    );
    let h = harness(mock);
    let config = config();
    let executor = h
        .executor
        .with_cache(std::sync::Arc::new(bi_dash::cache::ResultCache::new(
            std::time::Duration::from_secs(60),
        )));
    let ctx = CommandContext::new(&executor, &config);

    let args = QueryArgs {
        name: None,
        sql: Some("SELECT sku, n FROM t WHERE n > {{min}}".into()),
        file: None,
        params: vec!["min=0".into()],
        numeric: vec!["n".into()],
        top: Some(1),
        sort_by: Some("n".into()),
    };

    let first = handle_query(&ctx, &args).await.unwrap();
    assert_eq!(first.rows, vec![vec![Value::from("B"), Value::Number(3.0)]]);

    handle_query(&ctx, &args).await.unwrap();
    assert_eq!(h.mock.count(Method::Post, "dataset"), 1);

    let uncached = CommandContext::new(&executor, &config).without_cache();
    handle_query(&uncached, &args).await.unwrap();
    assert_eq!(h.mock.count(Method::Post, "dataset"), 2);
}

/// Answers dataset calls by the table named in the SQL, so concurrent queries
/// get their own rows whatever order they arrive in.
struct TableRoutes {
    routes: Vec<(&'static str, ApiResponse)>,
    logins: AtomicUsize,
}

#[async_trait]
impl Transport for TableRoutes {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        if request.path == "session" {
            self.logins.fetch_add(1, Ordering::SeqCst);
            return Ok(ApiResponse::json(200, &json!({"id": "s1"})));
        }
        let sql = request
            .body
            .as_ref()
            .and_then(|b| b["native"]["query"].as_str())
            .unwrap_or_default()
            .to_string();
        Ok(self
            .routes
            .iter()
            .find(|(table, _)| sql.contains(table))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| ApiResponse::new(404, "no route")))
    }
}

fn dashboard_executor(transport: Arc<TableRoutes>) -> QueryExecutor {
    let clock = Arc::new(ManualClock::new());
    let sessions = Arc::new(SessionManager::new(
        transport.clone(),
        clock.clone(),
        Credentials::new("analyst", "secret"),
        Duration::from_secs(3000),
    ));
    QueryExecutor::new(
        transport,
        sessions,
        clock,
        ExecutorSettings {
            database_id: 2,
            poll: poll_settings(),
        },
    )
}

fn dashboard_args() -> DashboardArgs {
    DashboardArgs {
        week_start: date(2024, 1, 3),
        threshold: 10.0,
        top: 20,
    }
}

#[tokio::test]
async fn test_dashboard_loads_every_configured_section() {
    let transport = Arc::new(TableRoutes {
        routes: vec![
            (
                "weekly_sales",
                columnar(
                    &["sku", "product", "curr_rev", "curr_qty", "prev_rev", "prev_qty"],
                    json!([
                        ["SKU1", "Widget", "100", "10", "80", "8"],
                        ["SKU2", "Gadget", "300", "1", "0", "0"]
                    ]),
                ),
            ),
            (
                "packing",
                columnar(&["packer", "parcels"], json!([["Ala", 12], ["Ola", 9]])),
            ),
            (
                "orders",
                columnar(&["postal_code", "revenue"], json!([["00-950", 40], ["61-001", 10]])),
            ),
        ],
        logins: AtomicUsize::new(0),
    });
    let executor = dashboard_executor(transport.clone());
    let mut config = config();
    config.queries.insert(
        "packing_report".into(),
        QueryDefinition::new("SELECT packer, parcels FROM packing WHERE week = {{week_start}}")
            .with_numeric(["parcels"]),
    );
    let ctx = CommandContext::new(&executor, &config);

    let sections = handle_dashboard(&ctx, &dashboard_args()).await.unwrap();

    let names: Vec<&str> = sections.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["sales", "packing", "regions"]);
    assert_eq!(transport.logins.load(Ordering::SeqCst), 1);

    let sales = &sections[0].1;
    assert_eq!(sales.get(0, "sku"), Some(&Value::from("SKU2")));
    assert_eq!(sales.get(1, "rev_change_pct"), Some(&Value::Number(25.0)));

    let packing = &sections[1].1;
    assert_eq!(packing.get(1, "parcels"), Some(&Value::Number(9.0)));

    let regions = &sections[2].1;
    assert_eq!(regions.get(0, "region"), Some(&Value::from("Warszawa")));

    let json = OutputFormat::Json.render_sections(&sections).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["packing"][0]["packer"], "Ala");
}

#[tokio::test]
async fn test_dashboard_skips_unconfigured_sections() {
    let transport = Arc::new(TableRoutes {
        routes: vec![("weekly_sales", columnar(&["sku", "curr_rev", "prev_rev"], json!([])))],
        logins: AtomicUsize::new(0),
    });
    let executor = dashboard_executor(transport);
    let mut config = config();
    config.queries.remove("orders_by_postcode");
    let ctx = CommandContext::new(&executor, &config);

    let sections = handle_dashboard(&ctx, &dashboard_args()).await.unwrap();

    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].0, "sales");
    assert!(sections[0].1.is_empty());
}
