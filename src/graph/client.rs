//! Graph HTTP client
//!
//! reqwest-backed [`GraphTransport`] with bearer auth and retry on throttling
//! and server errors.

use crate::auth::{AuthError, TokenStore};
use crate::graph::transport::{GraphRequest, GraphTransport, HttpMethod};
use crate::teams::JoinUrlError;
use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

/// Graph client errors
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Authentication error: {0}")]
    AuthError(#[from] AuthError),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Rate limited (429): retry after {0} seconds")]
    RateLimited(u64),

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<JoinUrlError> for GraphError {
    fn from(err: JoinUrlError) -> Self {
        GraphError::InvalidInput(err.to_string())
    }
}

/// Microsoft Graph client
#[derive(Debug)]
pub struct GraphClient {
    auth: Arc<TokenStore>,
    endpoint: String,
    http_client: Client,
    max_retries: u32,
    retry_delay_ms: u64,
}

impl GraphClient {
    /// Create a new Graph client
    ///
    /// # Arguments
    /// * `auth` - Token source
    /// * `endpoint` - Service root URL (e.g., "https://graph.microsoft.com/v1.0")
    /// * `max_retries` - Maximum attempts for throttled or failed requests
    /// * `retry_delay_ms` - Initial delay between retries in milliseconds
    /// * `timeout` - Per-request timeout
    pub fn new(
        auth: Arc<TokenStore>,
        endpoint: &str,
        max_retries: u32,
        retry_delay_ms: u64,
        timeout: Duration,
    ) -> Result<Self, GraphError> {
        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            auth,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http_client,
            max_retries: max_retries.max(1),
            retry_delay_ms,
        })
    }

    /// Get endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.endpoint, path)
        } else {
            format!("{}/{}", self.endpoint, path)
        }
    }

    /// Execute HTTP request with retry logic
    async fn execute_with_retry(
        &self,
        request: &GraphRequest,
        accept: &str,
    ) -> Result<Response, GraphError> {
        let url = self.url(&request.path);
        let token = self.auth.get_token().await?;
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        };

        let mut attempt = 0;
        let mut delay = self.retry_delay_ms;

        loop {
            attempt += 1;
            tracing::debug!("{} {} (attempt {})", method, url, attempt);

            let mut builder = self
                .http_client
                .request(method.clone(), &url)
                .query(&request.query)
                .bearer_auth(&token)
                .header("Accept", accept);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(ref body) = request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await?;

            match response.status() {
                status if status.is_success() => {
                    return Ok(response);
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    // Get Retry-After header if available
                    let retry_after = response
                        .headers()
                        .get("Retry-After")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<u64>().ok())
                        .unwrap_or(delay / 1000);

                    if attempt >= self.max_retries {
                        return Err(GraphError::RateLimited(retry_after));
                    }

                    tracing::warn!(
                        "Rate limited (429), attempt {}/{}, retrying after {} seconds",
                        attempt,
                        self.max_retries,
                        retry_after
                    );

                    sleep(Duration::from_secs(retry_after)).await;
                    delay *= 2; // Exponential backoff
                }
                StatusCode::UNAUTHORIZED => {
                    // Force a reload of the token file on the next call
                    self.auth.clear_cache().await;
                    let body = response.text().await.unwrap_or_default();
                    return Err(AuthError::Rejected(body).into());
                }
                StatusCode::NOT_FOUND => {
                    let body = response.text().await.unwrap_or_default();
                    return Err(GraphError::NotFound(body));
                }
                StatusCode::FORBIDDEN => {
                    let body = response.text().await.unwrap_or_default();
                    return Err(GraphError::AccessDenied(body));
                }
                status if status.is_server_error() => {
                    if attempt >= self.max_retries {
                        let body = response.text().await.unwrap_or_default();
                        return Err(GraphError::ServerError(status.as_u16(), body));
                    }

                    tracing::warn!(
                        "Server error ({}), attempt {}/{}, retrying...",
                        status,
                        attempt,
                        self.max_retries
                    );

                    sleep(Duration::from_millis(delay)).await;
                    delay *= 2;
                }
                status => {
                    let body = response.text().await.unwrap_or_default();
                    return Err(GraphError::ServerError(status.as_u16(), body));
                }
            }
        }
    }
}

#[async_trait]
impl GraphTransport for GraphClient {
    async fn request(&self, request: GraphRequest) -> Result<Value, GraphError> {
        let response = self
            .execute_with_retry(&request, "application/json")
            .await?;

        let bytes = response.bytes().await.map_err(|e| {
            GraphError::ParseError(format!("Failed to read response body: {}", e))
        })?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            GraphError::ParseError(format!("Failed to parse Graph response: {}", e))
        })
    }

    async fn download(&self, path: &str, query: &[(String, String)]) -> Result<Vec<u8>, GraphError> {
        let mut request = GraphRequest::get(path);
        request.query = query.to_vec();

        let response = self.execute_with_retry(&request, "*/*").await?;
        let bytes = response.bytes().await.map_err(|e| {
            GraphError::ParseError(format!("Failed to read download body: {}", e))
        })?;

        tracing::debug!("Downloaded {} bytes from {}", bytes.len(), path);
        Ok(bytes.to_vec())
    }
}
