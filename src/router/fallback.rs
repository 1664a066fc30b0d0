//! Model Fallback Router
//!
//! Sends a chat request to one backend after another until one of them
//! produces text. Backends that report a rate limit are put on cooldown and
//! skipped by later calls until it expires; the last backend that answered is
//! tried first while it stays eligible.
//!
//! Each call walks the backend list exactly once, starting at the cursor (or at
//! the last successful backend). Skipping a cooling backend uses up its step in
//! that walk but never another backend's, so every eligible backend gets one
//! live attempt per call.

use crate::api::{CompletionRequest, Message};
use crate::client::ChatBackend;
use crate::config::RequestDefaults;
use crate::error::{FallbackError, Result, UpstreamError};
use crate::router::backend::Backend;
use crate::router::classify::{ErrorClassifier, FailureKind, StatusClassifier};
use crate::router::ledger::RateLimitLedger;
use crate::router::status::RouterStatus;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-call sampling options; unset fields fall back to the router defaults
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,

    /// Extra body parameters forwarded verbatim
    pub extra: HashMap<String, serde_json::Value>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Mutable routing state, only touched under the router's lock
#[derive(Debug, Default)]
struct RouterState {
    /// Index of the next backend to try absent affinity
    cursor: usize,

    /// Index of the backend that last returned text
    last_success: Option<usize>,

    ledger: RateLimitLedger,
}

impl RouterState {
    fn sweep(&mut self) {
        let freed = self.ledger.sweep();
        if !freed.is_empty() {
            info!(models = ?freed, "Rate limits reset");
        }
    }
}

/// Rate-limit aware router over an ordered list of backends
pub struct ModelRouter {
    /// Fixed priority order
    backends: Vec<Backend>,

    upstream: Arc<dyn ChatBackend>,
    classifier: Arc<dyn ErrorClassifier>,
    defaults: RequestDefaults,

    /// Extend cooldowns to the upstream Retry-After hint when it is longer
    honor_retry_after: bool,

    state: Mutex<RouterState>,
}

impl ModelRouter {
    /// Create a router over `backends`, calling `upstream` for every attempt
    pub fn new(backends: Vec<Backend>, upstream: Arc<dyn ChatBackend>) -> Result<Self> {
        if backends.is_empty() {
            return Err(FallbackError::Config(
                "at least one backend must be configured".to_string(),
            ));
        }

        Ok(Self {
            backends,
            upstream,
            classifier: Arc::new(StatusClassifier),
            defaults: RequestDefaults::default(),
            honor_retry_after: false,
            state: Mutex::new(RouterState::default()),
        })
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_defaults(mut self, defaults: RequestDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_retry_after_hint(mut self, honor: bool) -> Self {
        self.honor_retry_after = honor;
        self
    }

    pub fn backends(&self) -> &[Backend] {
        &self.backends
    }

    /// Get generated text from the first backend that produces some
    pub async fn make_request(&self, messages: &[Message], options: &RequestOptions) -> Result<String> {
        if messages.is_empty() {
            return Err(FallbackError::InvalidRequest(
                "messages must not be empty".to_string(),
            ));
        }

        let total = self.backends.len();
        let order = {
            let mut state = self.state.lock();
            state.sweep();
            self.trial_order(&state)
        };

        let mut last_error: Option<UpstreamError> = None;

        for (step, idx) in order.into_iter().enumerate() {
            let backend = &self.backends[idx];

            {
                let mut state = self.state.lock();
                if let Some(remaining) = state.ledger.remaining(&backend.name) {
                    info!(
                        model = %backend.name,
                        remaining_secs = remaining.as_secs(),
                        "Skipping rate limited model"
                    );
                    state.cursor = (idx + 1) % total;
                    continue;
                }
            }

            info!(
                model = %backend.name,
                provider = %backend.label,
                attempt = step + 1,
                max_attempts = total,
                "Trying model"
            );

            let request = self.build_request(backend, messages, options);
            let failure = match self.upstream.chat_completion(&request).await {
                Ok(response) => match response.content() {
                    Some(text) => {
                        let mut state = self.state.lock();
                        state.last_success = Some(idx);
                        state.ledger.clear(&backend.name);
                        info!(model = %backend.name, provider = %backend.label, "Model succeeded");
                        return Ok(text);
                    }
                    None => UpstreamError::empty_response(),
                },
                Err(err) => err,
            };

            warn!(model = %backend.name, error = %failure, "Model failed");
            let kind = self.classifier.classify(&failure);

            {
                let mut state = self.state.lock();
                if let FailureKind::RateLimited { retry_after } = kind {
                    let cooldown = match retry_after {
                        Some(hint) if self.honor_retry_after => hint.max(backend.cooldown),
                        _ => backend.cooldown,
                    };
                    let cooldown = state.ledger.record(&backend.name, cooldown);
                    info!(
                        model = %backend.name,
                        cooldown_secs = cooldown.as_secs(),
                        "Recorded rate limit, trying next model"
                    );
                }
                state.cursor = (idx + 1) % total;
            }

            last_error = Some(failure);
        }

        warn!(
            last_status = ?last_error.as_ref().and_then(|e| e.status),
            "All models failed"
        );
        self.log_status();

        Err(FallbackError::AllBackendsUnavailable { last_error })
    }

    /// Backend indices in trial order: rotated to start at the last successful
    /// backend if it is eligible, else at the cursor
    fn trial_order(&self, state: &RouterState) -> Vec<usize> {
        let total = self.backends.len();
        let start = state
            .last_success
            .filter(|&idx| !state.ledger.is_cooling(&self.backends[idx].name))
            .unwrap_or(state.cursor);

        (0..total).map(|offset| (start + offset) % total).collect()
    }

    fn build_request(
        &self,
        backend: &Backend,
        messages: &[Message],
        options: &RequestOptions,
    ) -> CompletionRequest {
        let mut request = CompletionRequest::new(backend.name.clone(), messages.to_vec())
            .with_temperature(options.temperature.unwrap_or(self.defaults.temperature))
            .with_max_tokens(options.max_tokens.unwrap_or(self.defaults.max_tokens));
        request.extra = options.extra.clone();
        request
    }

    /// Availability snapshot; also drops expired cooldowns
    pub fn status(&self) -> RouterStatus {
        let mut state = self.state.lock();
        state.sweep();
        let last = state.last_success.map(|idx| self.backends[idx].name.as_str());
        RouterStatus::capture(&self.backends, &state.ledger, last)
    }

    /// Names of backends not cooling down, in priority order
    pub fn available_backends(&self) -> Vec<String> {
        let state = self.state.lock();
        self.backends
            .iter()
            .filter(|b| !state.ledger.is_cooling(&b.name))
            .map(|b| b.name.clone())
            .collect()
    }

    /// Backend the cursor points at
    pub fn current_backend(&self) -> &str {
        let cursor = self.state.lock().cursor;
        &self.backends[cursor].name
    }

    /// Move the cursor back to the first backend
    pub fn reset_cursor(&self) {
        self.state.lock().cursor = 0;
    }

    /// Log per-backend availability
    pub fn log_status(&self) {
        let status = self.status();
        for backend in &status.backends {
            match backend.cooldown_remaining_secs {
                Some(secs) => info!(
                    model = %backend.name,
                    provider = %backend.label,
                    reset_in_secs = secs,
                    "Model rate limited"
                ),
                None => debug!(model = %backend.name, provider = %backend.label, "Model available"),
            }
        }
        info!(
            available = status.available_backends,
            total = status.total_backends,
            next_reset_minutes = ?status.next_reset_minutes,
            "Model availability"
        );
    }
}

impl std::fmt::Debug for ModelRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRouter")
            .field("backends", &self.backends)
            .field("defaults", &self.defaults)
            .field("honor_retry_after", &self.honor_retry_after)
            .field("state", &*self.state.lock())
            .finish()
    }
}
