//! Client Module
//!
//! The upstream chat-completion call the router depends on, and its HTTP
//! implementation.

pub mod http;

pub use http::HttpClient;

use crate::api::{CompletionRequest, CompletionResponse};
use crate::error::UpstreamError;
use async_trait::async_trait;

/// A single chat-completion endpoint that can serve any backend by model name
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one request; `request.model` selects the backend
    async fn chat_completion(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<CompletionResponse, UpstreamError>;
}
