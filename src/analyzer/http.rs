/*!
 * HTTP-backed analyzer transport.
 *
 * Client for a semantic analysis service exposing a single completion
 * endpoint. Transport-level failures are retried with exponential backoff;
 * client errors fail fast. Reply content is handled by the robust adapter,
 * not here.
 */

use async_trait::async_trait;
use log::error;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::errors::AnalyzerError;

use super::AnalyzerTransport;

/// Completion request body
#[derive(Debug, Serialize)]
struct CompletionRequest {
    /// Model name
    model: String,
    /// The rendered prompt
    prompt: String,
    /// Ask the service for a non-streaming reply
    stream: bool,
    /// Constrain the reply to JSON
    format: String,
}

/// Completion response body
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    /// The reply text
    response: String,
}

/// HTTP client for the analyzer service
#[derive(Debug)]
pub struct HttpAnalyzer {
    /// Base URL of the service
    base_url: String,
    /// Model to query
    model: String,
    /// API key, sent as bearer token when non-empty
    api_key: String,
    /// HTTP client
    client: Client,
    /// Maximum number of retry attempts
    max_retries: u32,
    /// Base backoff time in milliseconds for exponential backoff
    backoff_base_ms: u64,
}

impl HttpAnalyzer {
    /// Create a new client
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_config(endpoint, model, String::new(), 3, 1000, 60)
    }

    /// Create a new client with full configuration.
    ///
    /// Uses connection pooling for better performance with concurrent requests.
    pub fn with_config(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        max_retries: u32,
        backoff_base_ms: u64,
        timeout_secs: u64,
    ) -> Self {
        Self {
            base_url: normalize_endpoint(&endpoint.into()),
            model: model.into(),
            api_key: api_key.into(),
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .pool_max_idle_per_host(20)
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            max_retries,
            backoff_base_ms,
        }
    }

    async fn post_completion(&self, prompt: &str) -> Result<String, AnalyzerError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = CompletionRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            format: "json".to_string(),
        };

        let mut attempt = 0u32;
        let mut last_error = None;

        while attempt <= self.max_retries {
            if attempt > 0 {
                let backoff_ms = self.backoff_base_ms * (1u64 << (attempt - 1));
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }

            let mut request = self.client.post(&url).json(&body);
            if !self.api_key.is_empty() {
                request = request.bearer_auth(&self.api_key);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json::<CompletionResponse>()
                            .await
                            .map(|r| r.response)
                            .map_err(|e| {
                                AnalyzerError::MalformedResponse(format!(
                                    "completion body does not parse: {}",
                                    e
                                ))
                            });
                    } else if status.is_server_error() {
                        // Server error - can retry
                        let message = response.text().await.unwrap_or_default();
                        error!(
                            "Analyzer service error ({}): {} - attempt {}/{}",
                            status,
                            message,
                            attempt + 1,
                            self.max_retries + 1
                        );
                        last_error = Some(AnalyzerError::ApiError {
                            status_code: status.as_u16(),
                            message,
                        });
                    } else {
                        // Client error - don't retry
                        let message = response.text().await.unwrap_or_default();
                        error!("Analyzer service error ({}): {}", status, message);
                        return Err(AnalyzerError::ApiError {
                            status_code: status.as_u16(),
                            message,
                        });
                    }
                }
                Err(e) => {
                    // Network error - can retry
                    last_error = Some(AnalyzerError::RequestFailed(e.to_string()));
                    error!(
                        "Analyzer network error: {} - attempt {}/{}",
                        e,
                        attempt + 1,
                        self.max_retries + 1
                    );
                }
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or_else(|| {
            AnalyzerError::RequestFailed(format!(
                "request failed after {} attempts",
                self.max_retries + 1
            ))
        }))
    }
}

#[async_trait]
impl AnalyzerTransport for HttpAnalyzer {
    async fn complete(&self, prompt: String) -> Result<String, AnalyzerError> {
        self.post_completion(&prompt).await
    }

    async fn test_connection(&self) -> Result<(), AnalyzerError> {
        self.post_completion("Reply with {\"answer\": true, \"confidence\": 100}")
            .await
            .map(|_| ())
    }
}

/// Normalize an endpoint string into a base URL with scheme, no trailing slash
fn normalize_endpoint(endpoint: &str) -> String {
    let with_scheme = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    };
    match Url::parse(&with_scheme) {
        Ok(url) => url.to_string().trim_end_matches('/').to_string(),
        Err(_) => with_scheme.trim_end_matches('/').to_string(),
    }
}
