use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const ALLOW_DIRECT_CALLS_ENV: &str = "ADVISOR_ALLOW_DIRECT_CALLS";

/// Reasons a request cannot be sent with the current configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("OPENAI_API_KEY is not defined. Add openai_api_key to the config file or set the OPENAI_API_KEY environment variable.")]
    MissingApiKey,
    #[error("Direct API calls are disabled. Use a server-side proxy or enable allow_direct_calls (or set ADVISOR_ALLOW_DIRECT_CALLS=1).")]
    DirectCallsDisabled,
}

#[derive(Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub allow_direct_calls: Option<bool>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub base_url: Option<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "[REDACTED]"))
            .field("allow_direct_calls", &self.allow_direct_calls)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the default location, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Ok(Self::load_from(&config_path)?.with_env_overrides())
    }

    /// Load a config file without environment overrides. A missing file
    /// yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| anyhow!("Invalid config file {}: {}", path.display(), e))?;
        Ok(config)
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Environment values win over file values.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.openai_api_key = Some(key);
        }
        if let Some(flag) = lookup(ALLOW_DIRECT_CALLS_ENV) {
            self.allow_direct_calls = Some(parse_flag(&flag));
        }
        self
    }

    pub fn get_config_path() -> Result<PathBuf> {
        Ok(Self::get_config_dir()?.join("config.json"))
    }

    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("advisor"))
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Values that must be present before any request can leave the process.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// The key is checked before the permission flag.
    pub fn resolve(config: &Config) -> std::result::Result<Self, ConfigError> {
        let api_key = config
            .openai_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        if config.allow_direct_calls != Some(true) {
            return Err(ConfigError::DirectCallsDisabled);
        }

        Ok(Self {
            api_key: api_key.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::new());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = Config {
            openai_api_key: Some("sk-test".to_string()),
            allow_direct_calls: Some(true),
            model: Some("gpt-4o-mini".to_string()),
            ..Config::default()
        };
        fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_env_overrides_file_values() {
        let config = Config {
            openai_api_key: Some("from-file".to_string()),
            allow_direct_calls: Some(false),
            ..Config::default()
        }
        .with_overrides_from(env(&[
            (API_KEY_ENV, "from-env"),
            (ALLOW_DIRECT_CALLS_ENV, "true"),
        ]));

        assert_eq!(config.openai_api_key.as_deref(), Some("from-env"));
        assert_eq!(config.allow_direct_calls, Some(true));
    }

    #[test]
    fn test_blank_env_key_does_not_override() {
        let config = Config {
            openai_api_key: Some("from-file".to_string()),
            ..Config::default()
        }
        .with_overrides_from(env(&[(API_KEY_ENV, "  ")]));

        assert_eq!(config.openai_api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_resolve_missing_key() {
        let config = Config {
            allow_direct_calls: Some(true),
            ..Config::default()
        };
        assert_eq!(Credentials::resolve(&config), Err(ConfigError::MissingApiKey));
    }

    #[test]
    fn test_resolve_missing_flag() {
        let config = Config {
            openai_api_key: Some("sk-test".to_string()),
            ..Config::default()
        };
        assert_eq!(
            Credentials::resolve(&config),
            Err(ConfigError::DirectCallsDisabled)
        );
    }

    #[test]
    fn test_resolve_ok() {
        let config = Config {
            openai_api_key: Some("sk-test".to_string()),
            allow_direct_calls: Some(true),
            ..Config::default()
        };
        let creds = Credentials::resolve(&config).unwrap();
        assert_eq!(creds.api_key, "sk-test");
        assert!(!format!("{:?}", creds).contains("sk-test"));
    }

    #[test]
    fn test_error_messages_name_the_missing_value() {
        assert!(ConfigError::MissingApiKey.to_string().contains(API_KEY_ENV));
        assert!(ConfigError::DirectCallsDisabled
            .to_string()
            .contains("allow_direct_calls"));
    }
}
