//! Router Configuration
//!
//! Defines the configuration schema for the upstream provider and its backends.

use crate::error::{FallbackError, Result};
use crate::router::{Backend, MAX_COOLDOWN};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,

    /// Environment variable name for the API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Optional environment variable overriding `base_url`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base_env: Option<String>,

    /// Additional headers to send with requests
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,

    /// Sampling defaults applied when a call leaves them unset
    #[serde(default)]
    pub defaults: RequestDefaults,

    /// Let a longer upstream Retry-After extend the configured cooldown
    #[serde(default)]
    pub honor_retry_after: bool,

    /// Also treat 400/403 bodies that mention rate limits or quota as rate limits
    #[serde(default)]
    pub detect_rate_limit_messages: bool,

    /// Backends in priority order
    pub backends: Vec<BackendConfig>,
}

/// Configuration for a single backend model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendConfig {
    /// Model name sent upstream
    pub name: String,

    /// Provider tag; derived from the model name when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Cooldown after a rate limit, in seconds
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

fn default_cooldown_secs() -> u64 {
    60
}

/// Sampling defaults
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RequestDefaults {
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    500
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl RouterConfig {
    /// Get the effective base URL (from env var if configured, otherwise default)
    pub fn get_base_url(&self) -> String {
        if let Some(env_var) = &self.api_base_env {
            if let Ok(url) = std::env::var(env_var) {
                return url;
            }
        }
        self.base_url.clone()
    }

    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        let env_var = self
            .api_key_env
            .as_deref()
            .ok_or_else(|| FallbackError::Config("api_key_env is not set".to_string()))?;

        std::env::var(env_var)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| FallbackError::Config(format!("{} is not set", env_var)))
    }

    /// Backend descriptors in priority order
    pub fn backends(&self) -> Vec<Backend> {
        self.backends.iter().map(Backend::from).collect()
    }

    /// Check invariants the router relies on
    pub fn validate(&self) -> Result<()> {
        if self.backends.is_empty() {
            return Err(FallbackError::Config(
                "at least one backend must be configured".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for backend in &self.backends {
            if backend.name.trim().is_empty() {
                return Err(FallbackError::Config("backend name must not be empty".to_string()));
            }
            if !seen.insert(backend.name.as_str()) {
                return Err(FallbackError::Config(format!(
                    "backend '{}' is listed more than once",
                    backend.name
                )));
            }
            if backend.cooldown_secs > MAX_COOLDOWN.as_secs() {
                return Err(FallbackError::Config(format!(
                    "backend '{}' cooldown of {}s exceeds the {}s limit",
                    backend.name,
                    backend.cooldown_secs,
                    MAX_COOLDOWN.as_secs()
                )));
            }
        }

        if !(0.0..=2.0).contains(&self.defaults.temperature) {
            return Err(FallbackError::Config(format!(
                "default temperature {} is outside 0.0..=2.0",
                self.defaults.temperature
            )));
        }
        if self.defaults.max_tokens == 0 {
            return Err(FallbackError::Config("default max_tokens must be positive".to_string()));
        }

        Ok(())
    }
}
