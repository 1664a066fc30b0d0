//! Model Fallback - rate-limit aware routing across chat-completion models
//!
//! Sends each chat request to an ordered list of models behind one
//! OpenAI-compatible endpoint, skipping models that are cooling down after a
//! rate limit and preferring whichever model answered last.
//!
//! ```no_run
//! use model_fallback::{FallbackClient, Message, RequestOptions};
//!
//! # async fn run() -> model_fallback::Result<()> {
//! let client = FallbackClient::new()?;
//! let reply = client
//!     .chat(&[Message::user("Explain closures")], &RequestOptions::new())
//!     .await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod router;

pub use api::{CompletionRequest, CompletionResponse, Message, MessageContent};
pub use client::{ChatBackend, HttpClient};
pub use config::{ConfigLoader, RouterConfig};
pub use error::{FallbackError, Result, UpstreamError};
pub use router::{Backend, HeuristicClassifier, ModelRouter, RequestOptions, RouterStatus};

/// Router wired to the configured HTTP endpoint
pub struct FallbackClient {
    router: Arc<ModelRouter>,
}

impl FallbackClient {
    /// Create a client from the default configuration sources
    pub fn new() -> Result<Self> {
        let loader = ConfigLoader::new()?;
        Self::from_config(loader.into_config())
    }

    /// Create a client with a custom config path
    pub fn with_config_path(path: &str) -> Result<Self> {
        let loader = ConfigLoader::from_path(path)?;
        Self::from_config(loader.into_config())
    }

    /// Create a client from a config object
    pub fn from_config(config: RouterConfig) -> Result<Self> {
        config.validate()?;

        let api_key = config.get_api_key()?;
        let http = HttpClient::with_headers(&config.get_base_url(), &api_key, &config.headers)?;
        Self::with_upstream(&config, Arc::new(http))
    }

    /// Create a client that sends requests through `upstream`
    pub fn with_upstream(config: &RouterConfig, upstream: Arc<dyn ChatBackend>) -> Result<Self> {
        let mut router = ModelRouter::new(config.backends(), upstream)?
            .with_defaults(config.defaults)
            .with_retry_after_hint(config.honor_retry_after);
        if config.detect_rate_limit_messages {
            router = router.with_classifier(Arc::new(HeuristicClassifier));
        }

        tracing::info!(
            backends = router.backends().len(),
            first = %router.backends()[0],
            "Model router ready"
        );

        Ok(Self {
            router: Arc::new(router),
        })
    }

    /// Get a reply for `messages` from the first model that answers
    pub async fn chat(&self, messages: &[Message], options: &RequestOptions) -> Result<String> {
        self.router.make_request(messages, options).await
    }

    /// Current availability snapshot
    pub fn status(&self) -> RouterStatus {
        self.router.status()
    }

    /// Shared handle for request handlers
    pub fn router(&self) -> Arc<ModelRouter> {
        self.router.clone()
    }
}
