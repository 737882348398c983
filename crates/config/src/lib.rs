//! Configuration loading, validation, and management for zeroloop.
//!
//! Loads configuration from `~/.zeroloop/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use zeroloop_core::agent::{AgentConfig, RateLimitConfig};

/// The root configuration structure.
///
/// Maps directly to `~/.zeroloop/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key shared by both models unless a model sets its own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Directory whose `<name>.md` files override the built-in prompts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts_dir: Option<PathBuf>,

    /// Model driving the conversation
    #[serde(default)]
    pub chat_model: ModelConfig,

    /// Model used for summaries and memory cleanup
    #[serde(default = "default_utility_model")]
    pub utility_model: ModelConfig,

    /// History and memory settings
    #[serde(default)]
    pub agent: AgentSection,

    /// Sliding-window call limits
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Long-term memory store
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// One model endpoint.
#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider label used in logs
    #[serde(default = "default_provider")]
    pub provider: String,

    /// OpenAI-compatible base URL (without `/chat/completions`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Overrides the top-level `api_key`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_utility_model() -> ModelConfig {
    ModelConfig {
        model: "gpt-4o-mini".into(),
        ..ModelConfig::default()
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            model: default_model(),
            temperature: 0.0,
            max_tokens: None,
            api_key: None,
        }
    }
}

/// The `[agent]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub auto_memory_count: usize,
    pub auto_memory_skip: u32,
    pub msgs_keep_max: usize,
    pub msgs_keep_start: usize,
    pub msgs_keep_end: usize,
    pub max_tool_response_length: usize,
}

impl Default for AgentSection {
    fn default() -> Self {
        let defaults = AgentConfig::default();
        Self {
            auto_memory_count: defaults.auto_memory_count,
            auto_memory_skip: defaults.auto_memory_skip,
            msgs_keep_max: defaults.msgs_keep_max,
            msgs_keep_start: defaults.msgs_keep_start,
            msgs_keep_end: defaults.msgs_keep_end,
            max_tool_response_length: defaults.max_tool_response_length,
        }
    }
}

/// Which memory store to attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryBackendKind {
    #[default]
    None,
    InMemory,
    File,
}

/// The `[memory]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default)]
    pub backend: MemoryBackendKind,

    /// JSONL file for the `file` backend (default `~/.zeroloop/memory/memories.jsonl`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("chat_model", &self.chat_model)
            .field("utility_model", &self.utility_model)
            .field("agent", &self.agent)
            .field("rate_limit", &self.rate_limit)
            .field("memory", &self.memory)
            .field("prompts_dir", &self.prompts_dir)
            .finish()
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.zeroloop/config.toml).
    ///
    /// Environment overrides:
    /// - `ZEROLOOP_API_KEY`, then `OPENAI_API_KEY`, when no key is configured
    /// - `ZEROLOOP_MODEL` replaces the chat model
    /// - `ZEROLOOP_BASE_URL` replaces the base URL of both models
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
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

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("ZEROLOOP_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }
        if let Some(model) = lookup("ZEROLOOP_MODEL") {
            self.chat_model.model = model;
        }
        if let Some(base_url) = lookup("ZEROLOOP_BASE_URL") {
            self.chat_model.base_url = base_url.clone();
            self.utility_model.base_url = base_url;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".zeroloop")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, model) in [("chat_model", &self.chat_model), ("utility_model", &self.utility_model)] {
            if !(0.0..=2.0).contains(&model.temperature) {
                return Err(ConfigError::ValidationError(format!(
                    "{name}.temperature must be between 0.0 and 2.0"
                )));
            }
            if model.model.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!("{name}.model must not be empty")));
            }
        }

        // Compaction can leave one extra message at each end.
        let agent = &self.agent;
        if agent.msgs_keep_start + agent.msgs_keep_end + 3 > agent.msgs_keep_max {
            return Err(ConfigError::ValidationError(format!(
                "msgs_keep_start + msgs_keep_end + 3 must not exceed msgs_keep_max ({} + {} + 3 > {})",
                agent.msgs_keep_start, agent.msgs_keep_end, agent.msgs_keep_max
            )));
        }

        Ok(())
    }

    /// API key for `model`: its own, else the shared one.
    pub fn api_key_for(&self, model: &ModelConfig) -> Option<String> {
        model.api_key.clone().or_else(|| self.api_key.clone())
    }

    /// Runtime settings for the agent loop.
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            auto_memory_count: self.agent.auto_memory_count,
            auto_memory_skip: self.agent.auto_memory_skip,
            msgs_keep_max: self.agent.msgs_keep_max,
            msgs_keep_start: self.agent.msgs_keep_start,
            msgs_keep_end: self.agent.msgs_keep_end,
            max_tool_response_length: self.agent.max_tool_response_length,
            rate_limit: self.rate_limit.clone(),
        }
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        Self::default().to_toml()
    }

    /// Render this configuration as TOML.
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            chat_model: ModelConfig::default(),
            utility_model: default_utility_model(),
            agent: AgentSection::default(),
            rate_limit: RateLimitConfig::default(),
            memory: MemoryConfig::default(),
            prompts_dir: None,
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
