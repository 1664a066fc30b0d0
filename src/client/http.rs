//! HTTP Client
//!
//! OpenAI-compatible chat completion client. Makes exactly one attempt per
//! call; retrying across models is the router's job.

use crate::api::{CompletionRequest, CompletionResponse};
use crate::client::ChatBackend;
use crate::error::{FallbackError, Result, UpstreamError};
use crate::router::classify::parse_retry_after;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Longest body excerpt kept in an error message
const ERROR_BODY_LIMIT: usize = 500;

/// HTTP client for one OpenAI-compatible endpoint
pub struct HttpClient {
    /// Inner reqwest client
    client: Client,

    /// `{base_url}/chat/completions`
    url: String,

    /// Authorization and extra headers sent with every request
    headers: HeaderMap,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        Self::with_headers(base_url, api_key, &HashMap::new())
    }

    /// Create a client that also sends `extra_headers` on every request
    pub fn with_headers(
        base_url: &str,
        api_key: &str,
        extra_headers: &HashMap<String, String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| FallbackError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| FallbackError::Config(format!("Invalid API key format: {}", e)))?,
        );

        for (key, value) in extra_headers {
            let name = HeaderName::try_from(key.as_str())
                .map_err(|e| FallbackError::Config(format!("Invalid header name '{}': {}", key, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| FallbackError::Config(format!("Invalid value for header '{}': {}", key, e)))?;
            headers.insert(name, value);
        }

        Ok(Self {
            client,
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            headers,
        })
    }

    /// Endpoint this client posts to
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ChatBackend for HttpClient {
    async fn chat_completion(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<CompletionResponse, UpstreamError> {
        let resp = self
            .client
            .post(&self.url)
            .headers(self.headers.clone())
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        let retry_after = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);

        let body = resp.text().await?;
        debug!(model = %request.model, status = status.as_u16(), "upstream responded");

        if !status.is_success() {
            let mut err = UpstreamError::with_status(status.as_u16(), excerpt(&body));
            if let Some(hint) = retry_after {
                err = err.retry_after(hint);
            }
            return Err(err);
        }

        serde_json::from_str(&body).map_err(|e| {
            UpstreamError::transport(format!(
                "Failed to parse response: {}. Body: {}",
                e,
                excerpt(&body)
            ))
        })
    }
}

fn excerpt(body: &str) -> &str {
    match body.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
