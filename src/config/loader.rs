//! Configuration Loader
//!
//! Layers router configuration from the built-in defaults and config files.
//! Objects are merged key by key; any other value (including the backend
//! list) is replaced wholesale by the later layer.

use crate::config::provider::RouterConfig;
use crate::error::{FallbackError, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Built-in backend list and provider settings
const BUILTIN_DEFAULTS: &str = include_str!("../../backends.json");

/// Configuration loader with support for multiple sources
pub struct ConfigLoader {
    /// Merged raw layers
    raw: Value,

    config: RouterConfig,
}

impl ConfigLoader {
    /// Create a new config loader and load from default locations
    pub fn new() -> Result<Self> {
        let mut loader = Self::builtin()?;
        loader.load_from_default_paths()?;
        Ok(loader)
    }

    /// Create a loader with a specific config file layered over the built-ins
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let mut loader = Self::builtin()?;
        loader.load_from_file(path)?;
        Ok(loader)
    }

    /// Loader holding only the built-in defaults
    pub fn builtin() -> Result<Self> {
        let raw: Value = serde_json::from_str(BUILTIN_DEFAULTS).map_err(|e| {
            FallbackError::Config(format!("Failed to parse built-in backends.json: {}", e))
        })?;
        let config = Self::parse(&raw, "built-in backends.json")?;
        Ok(Self { raw, config })
    }

    /// Load configuration from default paths
    fn load_from_default_paths(&mut self) -> Result<()> {
        for path in Self::get_config_paths() {
            if path.exists() {
                self.load_from_file(&path)?;
            }
        }
        Ok(())
    }

    /// Get list of config paths to check, lowest precedence first
    fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".model-fallback").join("config.json"));
        }

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("model-fallback").join("config.json"));
        }

        paths.push(PathBuf::from("model-fallback.json"));

        if let Ok(custom_path) = std::env::var("MODEL_FALLBACK_CONFIG") {
            paths.push(PathBuf::from(custom_path));
        }

        paths
    }

    /// Layer a config file over what is loaded so far
    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FallbackError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let overlay: Value = serde_json::from_str(&content).map_err(|e| {
            FallbackError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        self.merge(overlay, &path.display().to_string())?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(())
    }

    /// Merge a raw layer; rejected layers leave the loader unchanged
    fn merge(&mut self, overlay: Value, source: &str) -> Result<()> {
        let mut raw = self.raw.clone();
        merge_values(&mut raw, overlay);
        self.config = Self::parse(&raw, source)?;
        self.raw = raw;
        Ok(())
    }

    fn parse(raw: &Value, source: &str) -> Result<RouterConfig> {
        let config: RouterConfig = serde_json::from_value(raw.clone())
            .map_err(|e| FallbackError::Config(format!("Invalid config from {}: {}", source, e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Take ownership of the configuration
    pub fn into_config(self) -> RouterConfig {
        self.config
    }
}

fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", json).unwrap();
        file
    }

    #[test]
    fn test_load_builtin_defaults() {
        let loader = ConfigLoader::builtin().unwrap();
        let config = loader.config();

        assert_eq!(config.backends.len(), 5);
        assert_eq!(config.backends[0].name, "google/gemini-2.0-flash-exp:free");
        assert_eq!(config.backends[3].cooldown_secs, 120);
        assert_eq!(config.backends[4].cooldown_secs, 180);
        assert_eq!(config.api_key_env.as_deref(), Some("OPENROUTER_API_KEY"));
    }

    #[test]
    fn test_file_overrides_fields_it_sets() {
        let file = write_config(
            r#"{
                "defaults": {"max_tokens": 1000},
                "headers": {"X-Title": "Mock Interviews"},
                "backends": [
                    {"name": "custom/model-a", "cooldown_secs": 30},
                    {"name": "custom/model-b", "label": "Custom"}
                ]
            }"#,
        );

        let config = ConfigLoader::from_path(file.path()).unwrap().into_config();

        assert_eq!(config.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(config.defaults.max_tokens, 1000);
        assert_eq!(config.defaults.temperature, 0.7);
        assert_eq!(config.headers["X-Title"], "Mock Interviews");
        assert!(config.headers.contains_key("HTTP-Referer"));
        assert_eq!(config.backends.len(), 2);
        assert_eq!(config.backends[0].cooldown_secs, 30);
        assert_eq!(config.backends[1].label.as_deref(), Some("Custom"));
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let file = write_config(r#"{"backends": []}"#);
        assert!(matches!(
            ConfigLoader::from_path(file.path()),
            Err(FallbackError::Config(_))
        ));

        let file = write_config("not json");
        assert!(ConfigLoader::from_path(file.path()).is_err());
    }

    #[test]
    fn test_rejected_layer_keeps_previous_config() {
        let mut loader = ConfigLoader::builtin().unwrap();
        let file = write_config(r#"{"defaults": {"temperature": 9.0}}"#);

        assert!(loader.load_from_file(file.path()).is_err());
        assert_eq!(loader.config().defaults.temperature, 0.7);
    }

    #[test]
    fn test_missing_file() {
        assert!(ConfigLoader::from_path("/nonexistent/model-fallback.json").is_err());
    }
}
