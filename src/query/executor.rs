//! Native query execution against the BI API.
//!
//! Handles the three response paths of `POST /dataset`: immediate result,
//! accepted-and-pending (polled to completion), and unauthenticated (one
//! re-login and retry). Results are normalized into [`TabularResult`].

use futures::future::try_join_all;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::api::{ApiRequest, Transport, DATASET_PATH};
use crate::cache::{CachePolicy, ResultCache};
use crate::clock::Clock;
use crate::config::QueryDefinition;
use crate::error::{DashError, Result};
use crate::query::params::{native_payload, QueryParams};
use crate::query::payload::RawPayload;
use crate::query::poll::{PollSettings, Poller};
use crate::session::SessionManager;
use crate::table::TabularResult;

/// Settings that shape every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorSettings {
    /// Database identifier inside the BI tool.
    pub database_id: u64,
    /// Polling of 202 responses.
    pub poll: PollSettings,
}

/// A named query to run as part of a batch.
#[derive(Debug, Clone)]
pub struct NamedQuery {
    pub name: String,
    pub definition: QueryDefinition,
    pub params: QueryParams,
}

/// Submits native queries and normalizes their results.
pub struct QueryExecutor {
    transport: Arc<dyn Transport>,
    sessions: Arc<SessionManager>,
    clock: Arc<dyn Clock>,
    settings: ExecutorSettings,
    cache: Option<Arc<ResultCache>>,
}

impl QueryExecutor {
    /// Creates a new query executor.
    pub fn new(
        transport: Arc<dyn Transport>,
        sessions: Arc<SessionManager>,
        clock: Arc<dyn Clock>,
        settings: ExecutorSettings,
    ) -> Self {
        Self {
            transport,
            sessions,
            clock,
            settings,
            cache: None,
        }
    }

    /// Enables result caching for [`execute_cached`](Self::execute_cached).
    pub fn with_cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// The session manager used by this executor.
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Runs raw SQL text with parameters. No numeric coercion, no column fallback.
    pub async fn execute(&self, query_text: &str, params: &QueryParams) -> Result<TabularResult> {
        self.execute_query(&QueryDefinition::new(query_text), params)
            .await
    }

    /// Runs a query definition: submit, normalize, coerce its numeric columns.
    pub async fn execute_query(
        &self,
        query: &QueryDefinition,
        params: &QueryParams,
    ) -> Result<TabularResult> {
        let payload = native_payload(self.settings.database_id, &query.sql, params)?;
        let start = Instant::now();

        let raw = self.submit_with_retry(&payload).await?;
        let mut result = raw.into_table(query.expected_columns.as_deref())?;

        if !result.is_empty() {
            result.coerce_numeric(&query.numeric)?;
        }

        info!(
            "Query returned {} rows, {} columns in {:?}",
            result.row_count(),
            result.columns.len(),
            start.elapsed()
        );
        Ok(result)
    }

    /// Like [`execute_query`](Self::execute_query), but serves fresh results from the cache.
    pub async fn execute_cached(
        &self,
        query: &QueryDefinition,
        params: &QueryParams,
    ) -> Result<TabularResult> {
        self.execute_with(query, params, CachePolicy::Reuse).await
    }

    /// Runs a query under `policy`. New results are stored whenever a cache is set.
    pub async fn execute_with(
        &self,
        query: &QueryDefinition,
        params: &QueryParams,
        policy: CachePolicy,
    ) -> Result<TabularResult> {
        let Some(cache) = &self.cache else {
            return self.execute_query(query, params).await;
        };

        let key = ResultCache::key(&query.sql, params);
        if policy == CachePolicy::Reuse {
            if let Some(hit) = cache.get(&key, self.clock.now()) {
                debug!("Result cache hit");
                return Ok(hit);
            }
        }

        let result = self.execute_query(query, params).await?;
        cache.insert(key, result.clone(), self.clock.now());
        Ok(result)
    }

    /// Runs several named queries concurrently. Fails if any of them fails.
    ///
    /// Results come back in the order of `queries`.
    pub async fn execute_all(
        &self,
        queries: &[NamedQuery],
        policy: CachePolicy,
    ) -> Result<Vec<(String, TabularResult)>> {
        let runs = queries.iter().map(|q| async move {
            let result = self.execute_with(&q.definition, &q.params, policy).await?;
            Ok::<_, DashError>((q.name.clone(), result))
        });
        try_join_all(runs).await
    }

    /// The result cache, if one is set.
    pub fn cache(&self) -> Option<&Arc<ResultCache>> {
        self.cache.as_ref()
    }

    /// Submits the payload; on a 401 invalidates the session and tries exactly once more.
    async fn submit_with_retry(&self, payload: &JsonValue) -> Result<RawPayload> {
        let token = self.sessions.acquire_session().await?;
        match self.submit(&token, payload).await {
            Err(DashError::SessionExpired(reason)) => {
                warn!("Session rejected ({}), logging in again", reason);
                self.sessions.invalidate().await;
                let token = self.sessions.acquire_session().await?;
                self.submit(&token, payload).await.map_err(|e| match e {
                    DashError::SessionExpired(_) => DashError::session_expired(
                        "the API rejected a freshly issued session; check the account's permissions",
                    ),
                    other => other,
                })
            }
            other => other,
        }
    }

    /// One submission: send, branch on status, poll if pending.
    async fn submit(&self, token: &str, payload: &JsonValue) -> Result<RawPayload> {
        let request = ApiRequest::post(DATASET_PATH, payload.clone()).with_session(token);
        let response = self.transport.send(request).await?;
        debug!("POST {} returned HTTP {}", DATASET_PATH, response.status);

        match response.status {
            401 => Err(DashError::session_expired(format!(
                "HTTP 401 from {DATASET_PATH}"
            ))),
            status if (200..300).contains(&status) => {
                match RawPayload::classify(response.parse_json()?)? {
                    RawPayload::Pending { token: job } => {
                        Poller::new(
                            self.transport.as_ref(),
                            self.clock.as_ref(),
                            token,
                            self.settings.poll,
                        )
                        .run(&job)
                        .await
                    }
                    RawPayload::Failed { message } => {
                        Err(DashError::query_failed(status, &message))
                    }
                    result => Ok(result),
                }
            }
            status => Err(DashError::query_failed(status, &response.body)),
        }
    }
}
