//! Shared setup for API-level tests.

use std::sync::Arc;
use std::time::Duration;

use bi_dash::api::{ApiResponse, Method, MockTransport};
use bi_dash::clock::ManualClock;
use bi_dash::query::{ExecutorSettings, PollSettings, QueryExecutor};
use bi_dash::session::{Credentials, SessionManager};
use serde_json::json;

/// An executor wired to a mock transport and a manual clock.
pub struct Harness {
    pub mock: Arc<MockTransport>,
    pub clock: Arc<ManualClock>,
    pub sessions: Arc<SessionManager>,
    pub executor: QueryExecutor,
}

/// Poll every second, give up after five.
pub fn poll_settings() -> PollSettings {
    PollSettings {
        interval: Duration::from_secs(1),
        timeout: Duration::from_secs(5),
    }
}

/// Builds a harness around a scripted mock.
pub fn harness(mock: MockTransport) -> Harness {
    let mock = Arc::new(mock);
    let clock = Arc::new(ManualClock::new());
    let sessions = Arc::new(SessionManager::new(
        mock.clone(),
        clock.clone(),
        Credentials::new("analyst", "secret"),
        Duration::from_secs(3000),
    ));
    let executor = QueryExecutor::new(
        mock.clone(),
        sessions.clone(),
        clock.clone(),
        ExecutorSettings {
            database_id: 2,
            poll: poll_settings(),
        },
    );
    Harness {
        mock,
        clock,
        sessions,
        executor,
    }
}

/// Queues a successful login that hands out `token`.
pub fn with_login(mock: MockTransport, token: &str) -> MockTransport {
    mock.on(
        Method::Post,
        "session",
        ApiResponse::json(200, &json!({ "id": token })),
    )
}

/// A Metabase-style columnar result.
pub fn columnar(columns: &[&str], rows: serde_json::Value) -> ApiResponse {
    let cols: Vec<_> = columns
        .iter()
        .map(|c| json!({"name": c, "display_name": c}))
        .collect();
    ApiResponse::json(200, &json!({"data": {"cols": cols, "rows": rows}}))
}
