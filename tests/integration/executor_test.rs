//! Session and query flow tests: re-login, polling, payload shapes.

use std::time::Duration;

use bi_dash::analytics::with_change_column;
use bi_dash::api::{ApiResponse, Method, MockTransport};
use bi_dash::config::QueryDefinition;
use bi_dash::error::DashError;
use bi_dash::query::QueryParams;
use bi_dash::table::Value;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_test::assert_ok;

use super::common::{columnar, harness, with_login};

const SALES_SQL: &str = "SELECT sku, product, curr_rev, curr_qty, prev_rev, prev_qty \
                         FROM weekly_sales WHERE week_start = {{week_start}}";

fn sales_query() -> QueryDefinition {
    QueryDefinition::new(SALES_SQL).with_numeric(["curr_rev", "curr_qty", "prev_rev", "prev_qty"])
}

fn week_params() -> QueryParams {
    QueryParams::new().with("week_start", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
}

#[tokio::test]
async fn test_sales_example_end_to_end() {
    let mock = with_login(MockTransport::new(), "s1").on(
        Method::Post,
        "dataset",
        columnar(
            &["SKU", "Product", "Curr Rev", "Curr Qty", "Prev Rev", "Prev Qty"],
            json!([["SKU1", "Widget", 100, 10, 80, 8]]),
        ),
    );
    let h = harness(mock);

    let mut result = h
        .executor
        .execute_query(&sales_query(), &week_params())
        .await
        .unwrap();
    with_change_column(&mut result, "curr_rev", "prev_rev", "rev_change_pct").unwrap();

    assert_eq!(result.get(0, "sku"), Some(&Value::from("SKU1")));
    assert_eq!(result.get(0, "curr_rev"), Some(&Value::Number(100.0)));
    assert_eq!(result.get(0, "rev_change_pct"), Some(&Value::Number(25.0)));

    let requests = h.mock.requests();
    let body = requests[1].body.as_ref().unwrap();
    assert_eq!(body["type"], "native");
    assert_eq!(body["native"]["template-tags"]["week_start"]["type"], "date");
    assert_eq!(body["parameters"][0]["value"], "2024-01-01");
    assert_eq!(
        body["parameters"][0]["target"],
        json!(["variable", ["template-tag", "week_start"]])
    );
}

#[tokio::test]
async fn test_401_relogs_exactly_once() {
    let mock = MockTransport::new()
        .on(Method::Post, "session", ApiResponse::json(200, &json!({"id": "old"})))
        .on(Method::Post, "session", ApiResponse::json(200, &json!({"id": "new"})))
        .on(Method::Post, "dataset", ApiResponse::new(401, "Unauthenticated"))
        .on(Method::Post, "dataset", columnar(&["a"], json!([[1]])));
    let h = harness(mock);

    let result = assert_ok!(h.executor.execute("SELECT 1", &QueryParams::new()).await);
    assert_eq!(result.row_count(), 1);

    assert_eq!(h.sessions.login_count(), 2);
    assert_eq!(h.mock.count(Method::Post, "dataset"), 2);
    let sessions: Vec<Option<String>> = h
        .mock
        .requests()
        .into_iter()
        .filter(|r| r.path == "dataset")
        .map(|r| r.session)
        .collect();
    assert_eq!(sessions, vec![Some("old".into()), Some("new".into())]);
}

#[tokio::test]
async fn test_second_401_is_fatal() {
    let mock = with_login(MockTransport::new(), "s1").on(
        Method::Post,
        "dataset",
        ApiResponse::new(401, "Unauthenticated"),
    );
    let h = harness(mock);

    let err = h
        .executor
        .execute("SELECT 1", &QueryParams::new())
        .await
        .unwrap_err();

    assert!(matches!(err, DashError::SessionExpired(_)));
    assert_eq!(h.sessions.login_count(), 2);
    assert_eq!(h.mock.count(Method::Post, "dataset"), 2);
}

#[tokio::test]
async fn test_bad_credentials_stop_before_any_query() {
    let mock = MockTransport::new()
        .on(Method::Post, "session", ApiResponse::new(401, "bad password"))
        .on(Method::Post, "dataset", columnar(&["a"], json!([[1]])));
    let h = harness(mock);

    let err = h
        .executor
        .execute("SELECT 1", &QueryParams::new())
        .await
        .unwrap_err();

    assert_eq!(err.category(), "Authentication Error");
    assert_eq!(h.mock.count(Method::Post, "dataset"), 0);
}

#[tokio::test]
async fn test_202_never_finishing_times_out_without_blocking() {
    let mock = with_login(MockTransport::new(), "s1")
        .on(Method::Post, "dataset", ApiResponse::json(202, &json!({"token": "job-7"})))
        .on(Method::Get, "dataset/job-7/json", ApiResponse::json(202, &json!({"status": "running"})));
    let h = harness(mock);

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        h.executor.execute("SELECT 1", &QueryParams::new()),
    )
    .await
    .expect("poll loop must not block on a manual clock")
    .unwrap_err();

    match err {
        DashError::QueryPending { waited } => assert_eq!(waited, Duration::from_secs(5)),
        other => panic!("expected QueryPending, got {other:?}"),
    }
    assert_eq!(h.mock.count(Method::Get, "dataset/job-7/json"), 5);
    assert_eq!(h.clock.elapsed(), Duration::from_secs(5));
}

#[tokio::test]
async fn test_202_then_result_via_plain_endpoint() {
    let mock = with_login(MockTransport::new(), "s1")
        .on(Method::Post, "dataset", ApiResponse::json(202, &json!({"id": "job-8"})))
        .on(Method::Get, "dataset/job-8", ApiResponse::json(202, &json!({"status": "running"})))
        .on(Method::Get, "dataset/job-8", ApiResponse::json(200, &json!([{"sku": "A"}])));
    let h = harness(mock);

    let result = h
        .executor
        .execute("SELECT 1", &QueryParams::new())
        .await
        .unwrap();

    assert_eq!(result.get(0, "sku"), Some(&Value::from("A")));
    assert_eq!(h.mock.count(Method::Get, "dataset/job-8/json"), 1);
    assert_eq!(h.mock.count(Method::Get, "dataset/job-8"), 2);
}

#[tokio::test]
async fn test_records_and_columnar_give_same_table() {
    let records = with_login(MockTransport::new(), "s1").on(
        Method::Post,
        "dataset",
        ApiResponse::json(
            200,
            &json!([
                {"SKU": "A", "Curr Rev": 10, "Prev Rev": null},
                {"SKU": "B", "Curr Rev": 2.5, "Prev Rev": 1}
            ]),
        ),
    );
    let columnar_mock = with_login(MockTransport::new(), "s1").on(
        Method::Post,
        "dataset",
        columnar(
            &["sku", "curr_rev", "prev_rev"],
            json!([["A", 10, null], ["B", 2.5, 1]]),
        ),
    );

    let a = harness(records)
        .executor
        .execute("SELECT 1", &QueryParams::new())
        .await
        .unwrap();
    let b = harness(columnar_mock)
        .executor
        .execute("SELECT 1", &QueryParams::new())
        .await
        .unwrap();

    assert_eq!(a, b);
}

#[tokio::test]
async fn test_bare_rows_use_expected_columns() {
    let mock = with_login(MockTransport::new(), "s1").on(
        Method::Post,
        "dataset",
        ApiResponse::json(200, &json!([["A", 3], ["B", 4]])),
    );
    let h = harness(mock);

    let query = QueryDefinition::new("SELECT 1").with_expected_columns(["SKU", "Curr Rev"]);
    let result = h
        .executor
        .execute_query(&query, &QueryParams::new())
        .await
        .unwrap();
    assert_eq!(result.columns, vec!["sku", "curr_rev"]);

    let wrong = QueryDefinition::new("SELECT 1").with_expected_columns(["sku"]);
    let err = h
        .executor
        .execute_query(&wrong, &QueryParams::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DashError::SchemaMismatch(_)));
}

#[tokio::test]
async fn test_server_error_detail_is_truncated() {
    let long = "x".repeat(1000);
    let mock = with_login(MockTransport::new(), "s1").on(
        Method::Post,
        "dataset",
        ApiResponse::new(500, long),
    );
    let h = harness(mock);

    let err = h
        .executor
        .execute("SELECT 1", &QueryParams::new())
        .await
        .unwrap_err();
    match err {
        DashError::QueryFailed { status, detail } => {
            assert_eq!(status, 500);
            assert_eq!(detail.chars().count(), 301);
        }
        other => panic!("expected QueryFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unrecognized_payload_is_decode_error() {
    let mock = with_login(MockTransport::new(), "s1").on(
        Method::Post,
        "dataset",
        ApiResponse::json(200, &json!({"message": "hello"})),
    );
    let h = harness(mock);

    let err = h
        .executor
        .execute("SELECT 1", &QueryParams::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DashError::Decode(_)));
}

#[tokio::test]
async fn test_missing_parameter_never_reaches_the_api() {
    let h = harness(with_login(MockTransport::new(), "s1"));

    let err = h
        .executor
        .execute_query(&sales_query(), &QueryParams::new())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("week_start"));
    assert!(h.mock.requests().is_empty());
}
