//! Polling of asynchronously running queries.
//!
//! A 202 response hands back a job token. [`Poller`] drives an explicit state
//! machine over that token:
//!
//! ```text
//! Pending ──▶ Polling ──┬──▶ Succeeded
//!               ▲   │   ├──▶ TimedOut
//!               └───┘   └──▶ Failed
//! ```
//!
//! Time comes from an injected [`Clock`], so tests can run a full timeout
//! without waiting. There is no cancellation: once started, the loop ends only
//! with a result, an error or the deadline.

use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::api::{ApiRequest, Transport, DATASET_PATH};
use crate::clock::Clock;
use crate::error::{DashError, Result};
use crate::query::payload::RawPayload;

/// Poll timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay between polls.
    pub interval: Duration,
    /// Maximum total wait.
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Which status endpoint is being polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEndpoint {
    /// `GET /dataset/{token}/json`
    Json,
    /// `GET /dataset/{token}`, used when the JSON endpoint is not available.
    Plain,
}

impl PollEndpoint {
    fn path(&self, token: &str) -> String {
        match self {
            Self::Json => format!("{DATASET_PATH}/{token}/json"),
            Self::Plain => format!("{DATASET_PATH}/{token}"),
        }
    }
}

/// States of one polling run.
#[derive(Debug)]
pub enum PollState {
    /// Job accepted; polling has not started.
    Pending { token: String },
    /// Waiting for the job to finish.
    Polling {
        token: String,
        endpoint: PollEndpoint,
        attempts: u32,
        started: Instant,
        deadline: Instant,
    },
    /// The job produced a result payload.
    Succeeded(RawPayload),
    /// The deadline passed first.
    TimedOut { attempts: u32, waited: Duration },
    /// Polling hit an unrecoverable error.
    Failed(DashError),
}

impl PollState {
    /// Returns true for Succeeded, TimedOut and Failed.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded(_) | Self::TimedOut { .. } | Self::Failed(_)
        )
    }
}

/// Drives a [`PollState`] to completion.
pub struct Poller<'a> {
    transport: &'a dyn Transport,
    clock: &'a dyn Clock,
    session: &'a str,
    settings: PollSettings,
}

impl<'a> Poller<'a> {
    /// Creates a poller for one job, authenticated with `session`.
    pub fn new(
        transport: &'a dyn Transport,
        clock: &'a dyn Clock,
        session: &'a str,
        settings: PollSettings,
    ) -> Self {
        Self {
            transport,
            clock,
            session,
            settings,
        }
    }

    /// Polls `token` until it yields a result, fails or times out.
    pub async fn run(&self, token: &str) -> Result<RawPayload> {
        let mut state = PollState::Pending {
            token: token.to_string(),
        };
        while !state.is_terminal() {
            state = self.step(state).await;
        }

        match state {
            PollState::Succeeded(payload) => Ok(payload),
            PollState::TimedOut { attempts, waited } => {
                info!(
                    "Query {} still pending after {:?} ({} polls)",
                    token, waited, attempts
                );
                Err(DashError::QueryPending { waited })
            }
            PollState::Failed(e) => Err(e),
            PollState::Pending { .. } | PollState::Polling { .. } => {
                Err(DashError::internal("poll loop ended in a non-terminal state"))
            }
        }
    }

    /// Advances the state machine by one transition.
    pub async fn step(&self, state: PollState) -> PollState {
        match state {
            PollState::Pending { token } => {
                let started = self.clock.now();
                debug!("Query accepted, polling job {}", token);
                PollState::Polling {
                    token,
                    endpoint: PollEndpoint::Json,
                    attempts: 0,
                    started,
                    deadline: started + self.settings.timeout,
                }
            }
            PollState::Polling {
                token,
                endpoint,
                attempts,
                started,
                deadline,
            } => {
                let now = self.clock.now();
                if now + self.settings.interval > deadline {
                    return PollState::TimedOut {
                        attempts,
                        waited: now.saturating_duration_since(started),
                    };
                }

                self.clock.sleep(self.settings.interval).await;
                let attempts = attempts + 1;

                let request = ApiRequest::get(endpoint.path(&token)).with_session(self.session);
                let response = match self.transport.send(request).await {
                    Ok(response) => response,
                    Err(e) => return PollState::Failed(e),
                };
                debug!(
                    "Poll {} of job {} returned HTTP {}",
                    attempts, token, response.status
                );

                let next = |endpoint| PollState::Polling {
                    token: token.clone(),
                    endpoint,
                    attempts,
                    started,
                    deadline,
                };

                match response.status {
                    202 => next(endpoint),
                    404 if endpoint == PollEndpoint::Json => next(PollEndpoint::Plain),
                    401 => PollState::Failed(DashError::session_expired(
                        "session rejected while polling",
                    )),
                    status if (200..300).contains(&status) => {
                        let classified = response.parse_json().and_then(RawPayload::classify);
                        match classified {
                            Ok(RawPayload::Pending { .. }) => next(endpoint),
                            Ok(RawPayload::Failed { message }) => {
                                PollState::Failed(DashError::query_failed(status, &message))
                            }
                            Ok(payload) => PollState::Succeeded(payload),
                            Err(e) => PollState::Failed(e),
                        }
                    }
                    status => PollState::Failed(DashError::query_failed(status, &response.body)),
                }
            }
            terminal => terminal,
        }
    }
}
