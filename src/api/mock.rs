//! Scripted transport for testing.
//!
//! Responses are queued per route (method + path). Each request pops the next
//! queued reply; the last reply of a route is repeated once the queue is down
//! to one entry, so "keeps answering 202" needs only a single entry.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::api::{ApiRequest, ApiResponse, Method, Transport};
use crate::error::{DashError, Result};

type Reply = std::result::Result<ApiResponse, String>;

/// Mock transport that replays canned responses and records every request.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    /// Creates a mock with no routes. Unrouted requests get a 404.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for a route.
    pub fn on(self, method: Method, path: &str, response: ApiResponse) -> Self {
        self.push(method, path, Ok(response));
        self
    }

    /// Queues a network failure for a route.
    pub fn on_error(self, method: Method, path: &str, message: &str) -> Self {
        self.push(method, path, Err(message.to_string()));
        self
    }

    fn push(&self, method: Method, path: &str, reply: Reply) {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        routes
            .entry((method, path.trim_start_matches('/').to_string()))
            .or_default()
            .push_back(reply);
    }

    /// All requests received so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of requests received for a route.
    pub fn count(&self, method: Method, path: &str) -> usize {
        let path = path.trim_start_matches('/');
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let key = (request.method, request.path.clone());
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        let reply = {
            let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
            match routes.get_mut(&key) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(DashError::transport(message)),
            None => Ok(ApiResponse::new(404, format!("no route for {} {}", key.0, key.1))),
        }
    }
}
