//! Configuration loading, validation, and management for AdPilot.
//!
//! Loads configuration from `~/.adpilot/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use adpilot_core::Locale;

/// The root configuration structure.
///
/// Maps directly to `~/.adpilot/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentSettings,

    /// State store settings
    #[serde(default)]
    pub store: StoreSettings,

    /// Tool confirmation rules (human-in-the-loop guardrails)
    #[serde(default)]
    pub confirmation: Vec<ConfirmationRule>,
}

/// Settings for the agent execution loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Maximum reasoning iterations per run
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Seconds a persisted session stays resumable
    #[serde(default = "default_state_ttl_secs")]
    pub state_ttl_secs: u64,

    /// Locale for reply interpretation and user-facing copy ("en", "vi")
    #[serde(default = "default_locale")]
    pub locale: String,
}

fn default_max_steps() -> u32 {
    10
}
fn default_state_ttl_secs() -> u64 {
    3600
}
fn default_locale() -> String {
    "en".into()
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            state_ttl_secs: default_state_ttl_secs(),
            locale: default_locale(),
        }
    }
}

/// Settings for the durable state store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Backend: "memory", "sqlite", or "none"
    #[serde(default = "default_store_backend")]
    pub backend: String,

    /// Database path (sqlite backend only)
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_backend() -> String {
    "memory".into()
}
fn default_store_path() -> String {
    "adpilot_state.db".into()
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: default_store_path(),
        }
    }
}

/// A rule that forces user confirmation before a tool runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationRule {
    /// Tool name this rule applies to ("*" matches every tool)
    pub tool: String,

    /// Question shown to the user when the rule fires
    pub question: String,

    /// Parameters that must be present and non-null before the tool may
    /// run; a missing one triggers a parameter request instead of a
    /// confirmation
    #[serde(default)]
    pub require_params: Vec<String>,

    /// Whether this rule is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Priority (higher wins when several rules match the same tool)
    #[serde(default)]
    pub priority: i32,
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Load configuration from the default path (~/.adpilot/config.toml).
    ///
    /// Environment variables override file values:
    /// - `ADPILOT_MAX_STEPS`
    /// - `ADPILOT_STATE_TTL_SECS`
    /// - `ADPILOT_LOCALE`
    /// - `ADPILOT_STORE_BACKEND`
    /// - `ADPILOT_STORE_PATH`
    pub fn load() -> Result<Self, ConfigError> {
        let config_dir = Self::config_dir();
        let config_path = config_dir.join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(max_steps) = std::env::var("ADPILOT_MAX_STEPS") {
            config.agent.max_steps = max_steps.parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "ADPILOT_MAX_STEPS must be a positive integer, got {max_steps:?}"
                ))
            })?;
        }

        if let Ok(ttl) = std::env::var("ADPILOT_STATE_TTL_SECS") {
            config.agent.state_ttl_secs = ttl.parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "ADPILOT_STATE_TTL_SECS must be a positive integer, got {ttl:?}"
                ))
            })?;
        }

        if let Ok(locale) = std::env::var("ADPILOT_LOCALE") {
            config.agent.locale = locale;
        }

        if let Ok(backend) = std::env::var("ADPILOT_STORE_BACKEND") {
            config.store.backend = backend;
        }

        if let Ok(path) = std::env::var("ADPILOT_STORE_PATH") {
            config.store.path = path;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".adpilot")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_steps must be at least 1".into(),
            ));
        }

        if self.agent.state_ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "agent.state_ttl_secs must be at least 1".into(),
            ));
        }

        Locale::from_str(&self.agent.locale)
            .map_err(|e| ConfigError::ValidationError(format!("agent.locale: {e}")))?;

        match self.store.backend.as_str() {
            "memory" | "sqlite" | "none" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "store.backend must be one of memory, sqlite, none; got {other:?}"
                )));
            }
        }

        for rule in &self.confirmation {
            if rule.tool.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "confirmation rule with empty tool name".into(),
                ));
            }
            if rule.question.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "confirmation rule for {:?} has an empty question",
                    rule.tool
                )));
            }
        }

        Ok(())
    }

    /// Parsed locale. Call after [`validate`](Self::validate); falls back
    /// to English on an unknown tag.
    pub fn locale(&self) -> Locale {
        Locale::from_str(&self.agent.locale).unwrap_or_default()
    }

    /// Generate a default config TOML string (for onboarding).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            agent: AgentSettings::default(),
            store: StoreSettings::default(),
            confirmation: vec![],
        }
    }
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
