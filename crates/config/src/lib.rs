//! Configuration loading, validation, and management for cocochat.
//!
//! Loads configuration from `~/.cocochat/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.cocochat/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Deployment environment. `"local"` selects human-readable logs,
    /// anything else selects JSON lines.
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Chat model endpoint
    #[serde(default)]
    pub model: ModelConfig,

    /// Orchestrator loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// HTTP gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Tool configuration
    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_environment() -> String {
    "local".into()
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider kind (only OpenAI-compatible endpoints are supported)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Base URL of the endpoint; the provider's default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_model_id")]
    pub model_id: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per model response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model_id() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_request_timeout() -> u64 {
    120
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_url: None,
            api_key: None,
            model_id: default_model_id(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("model_id", &self.model_id)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum model round trips per exchange
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    /// Replaces the built-in shopping-assistant prompt when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,

    /// Capacity of the event channel between orchestrator and transport
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_max_rounds() -> u32 {
    8
}
fn default_event_buffer() -> usize {
    64
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            system_prompt_override: None,
            event_buffer: default_event_buffer(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS origins; `"*"` allows any
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8000
}
fn default_allowed_origins() -> Vec<String> {
    vec!["*".into()]
}
fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub item_search: ItemSearchConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ItemSearchConfig {
    /// Catalog search endpoint; the built-in sample catalog is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_search_limit")]
    pub limit: u32,

    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

fn default_search_limit() -> u32 {
    5
}
fn default_search_timeout() -> u64 {
    5
}

impl Default for ItemSearchConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            limit: default_search_limit(),
            timeout_secs: default_search_timeout(),
        }
    }
}

impl std::fmt::Debug for ItemSearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemSearchConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("limit", &self.limit)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.cocochat/config.toml),
    /// then apply environment variable overrides.
    ///
    /// API key lookup order: `COCOCHAT_API_KEY`, then `OPENAI_API_KEY`.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(None)
    }

    /// Like [`AppConfig::load`], reading from `path` when given.
    pub fn load_with(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);
        let mut config = Self::read_file(&path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path, without env overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read_file(path)?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Apply overrides from an environment lookup function.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(env) = lookup("ENVIRONMENT") {
            self.environment = env;
        }

        if self.model.api_key.is_none() {
            self.model.api_key = lookup("COCOCHAT_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }
        if let Some(model_id) = lookup("MODEL_ID") {
            self.model.model_id = model_id;
        }
        if let Some(raw) = lookup("MODEL_TEMPERATURE") {
            self.model.temperature = parse_env("MODEL_TEMPERATURE", &raw)?;
        }
        if let Some(raw) = lookup("MODEL_MAX_TOKENS") {
            self.model.max_tokens = parse_env("MODEL_MAX_TOKENS", &raw)?;
        }

        if let Some(raw) = lookup("PORT") {
            self.gateway.port = parse_env("PORT", &raw)?;
        }

        if let Some(url) = lookup("ITEM_SEARCH_API_URL") {
            self.tools.item_search.api_url = Some(url);
        }
        if let Some(key) = lookup("ITEM_SEARCH_API_KEY") {
            self.tools.item_search.api_key = Some(key);
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".cocochat")
    }

    /// Get the default configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError::ValidationError(
                "model.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.model.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "model.max_tokens must be > 0".into(),
            ));
        }

        if self.agent.max_rounds == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_rounds must be >= 1".into(),
            ));
        }

        if self.agent.event_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "agent.event_buffer must be >= 1".into(),
            ));
        }

        if self.model.provider != "openai" {
            return Err(ConfigError::ValidationError(format!(
                "unsupported model.provider '{}' (expected \"openai\")",
                self.model.provider
            )));
        }

        Ok(())
    }

    /// Whether logs should be human-readable rather than JSON.
    pub fn is_local(&self) -> bool {
        self.environment == "local"
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    /// A copy safe to print: secrets are masked.
    pub fn redacted(&self) -> Self {
        let mask = |secret: &Option<String>| secret.as_ref().map(|_| "********".to_string());
        let mut config = self.clone();
        config.model.api_key = mask(&self.model.api_key);
        config.tools.item_search.api_key = mask(&self.tools.item_search.api_key);
        config
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            model: ModelConfig::default(),
            agent: AgentConfig::default(),
            gateway: GatewayConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::ValidationError(format!("{key} has an invalid value: {raw:?}")))
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.model.provider, "openai");
        assert_eq!(config.gateway.port, 8000);
        assert_eq!(config.agent.max_rounds, 8);
        assert!(config.is_local());
    }

    #[test]
    fn redacted_masks_secrets_only() {
        let mut config = AppConfig::default();
        config.model.api_key = Some("sk-live-123".into());
        let shown = toml::to_string_pretty(&config.redacted()).unwrap();
        assert!(!shown.contains("sk-live-123"));
        assert!(shown.contains("********"));
        assert!(shown.contains("gpt-4o-mini"));
        assert!(config.redacted().tools.item_search.api_key.is_none());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model.model_id, config.model.model_id);
        assert_eq!(parsed.gateway.port, config.gateway.port);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.model.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_round_cap_rejected() {
        let mut config = AppConfig::default();
        config.agent.max_rounds = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_rounds"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.model.max_tokens, 2048);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "environment = \"production\"\n\n[agent]\nmax_rounds = 3\n\n[tools.item_search]\nlimit = 10"
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.environment, "production");
        assert!(!config.is_local());
        assert_eq!(config.agent.max_rounds, 3);
        assert_eq!(config.agent.event_buffer, 64);
        assert_eq!(config.tools.item_search.limit, 10);
        assert_eq!(config.tools.item_search.timeout_secs, 5);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model = [not toml").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config
            .apply_env_overrides(env(&[
                ("OPENAI_API_KEY", "sk-test"),
                ("MODEL_ID", "gpt-4o"),
                ("MODEL_TEMPERATURE", "0.9"),
                ("MODEL_MAX_TOKENS", "512"),
                ("PORT", "9100"),
                ("ENVIRONMENT", "staging"),
                ("ITEM_SEARCH_API_URL", "https://search.example.com/items"),
            ]))
            .unwrap();

        assert_eq!(config.model.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.model.model_id, "gpt-4o");
        assert!((config.model.temperature - 0.9).abs() < f32::EPSILON);
        assert_eq!(config.model.max_tokens, 512);
        assert_eq!(config.gateway.port, 9100);
        assert_eq!(config.environment, "staging");
        assert!(config.tools.item_search.api_url.is_some());
    }

    #[test]
    fn cocochat_key_takes_priority() {
        let mut config = AppConfig::default();
        config
            .apply_env_overrides(env(&[
                ("COCOCHAT_API_KEY", "primary"),
                ("OPENAI_API_KEY", "secondary"),
            ]))
            .unwrap();
        assert_eq!(config.model.api_key.as_deref(), Some("primary"));
    }

    #[test]
    fn unparseable_env_value_is_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env_overrides(env(&[("MODEL_MAX_TOKENS", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("MODEL_MAX_TOKENS"));
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut config = AppConfig::default();
        config.model.api_key = Some("sk-very-secret".into());
        config.tools.item_search.api_key = Some("search-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(!debug.contains("search-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-4o-mini"));
        assert!(toml_str.contains("max_rounds = 8"));
        assert!(toml_str.contains("8000"));
    }
}
