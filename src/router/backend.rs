//! Backend Descriptors

use crate::config::BackendConfig;
use std::time::Duration;

/// One upstream model the router can address by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    /// Model identifier passed to the upstream client
    pub name: String,

    /// How long to withhold this backend after a rate limit
    pub cooldown: Duration,

    /// Provider tag for diagnostics
    pub label: String,
}

impl Backend {
    pub fn new(name: impl Into<String>, cooldown: Duration, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cooldown,
            label: label.into(),
        }
    }
}

impl From<&BackendConfig> for Backend {
    fn from(config: &BackendConfig) -> Self {
        let label = config.label.clone().unwrap_or_else(|| {
            // "meta-llama/llama-3.2-3b-instruct:free" -> "meta-llama"
            config
                .name
                .split('/')
                .next()
                .unwrap_or(&config.name)
                .to_string()
        });

        Self {
            name: config.name.clone(),
            cooldown: Duration::from_secs(config.cooldown_secs),
            label,
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_derives_label() {
        let config = BackendConfig {
            name: "mistralai/mistral-7b-instruct:free".to_string(),
            label: None,
            cooldown_secs: 120,
        };

        let backend = Backend::from(&config);
        assert_eq!(backend.label, "mistralai");
        assert_eq!(backend.cooldown, Duration::from_secs(120));
        assert_eq!(
            backend.to_string(),
            "mistralai/mistral-7b-instruct:free (mistralai)"
        );
    }
}
