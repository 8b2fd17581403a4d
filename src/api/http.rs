//! reqwest-backed transport for the BI API.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::api::{ApiRequest, ApiResponse, Method, Transport, SESSION_HEADER};
use crate::error::{DashError, Result};

/// HTTP transport talking to a real BI server.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: Url,
    client: Client,
}

impl HttpTransport {
    /// Creates a transport for the given API base URL (e.g. `https://bi.example.com/api`).
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DashError::transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: with_trailing_slash(base_url),
            client,
        })
    }

    /// Resolves a request path against the base URL.
    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| DashError::config(format!("Invalid API path '{}': {}", path, e)))
    }

    /// Maps a reqwest error to a transport error with a readable message.
    fn map_request_error(e: reqwest::Error) -> DashError {
        if e.is_timeout() {
            DashError::transport("Request timed out. Try again.")
        } else if e.is_connect() {
            DashError::transport("Failed to connect to the BI API. Check the base URL and network.")
        } else {
            DashError::transport(format!("Request failed: {}", e))
        }
    }
}

/// `Url::join` replaces the last segment unless the base ends with `/`.
fn with_trailing_slash(url: &Url) -> Url {
    let mut url = url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = self.endpoint(&request.path)?;
        debug!("{} {}", request.method, url);

        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        if let Some(token) = &request.session {
            builder = builder.header(SESSION_HEADER, token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(Self::map_request_error)?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| DashError::transport(format!("Failed to read response: {}", e)))?;

        debug!("HTTP {} ({} bytes)", status, body.len());
        Ok(ApiResponse { status, body })
    }
}
