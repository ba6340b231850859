//! Application configuration.
//!
//! Loaded from a TOML file with serde defaults for every section, so an
//! empty or missing file yields a runnable configuration.

use agora_core::TieBreak;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file, or defaults when the path is
    /// absent or the file does not exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.server.port != 0, "server.port cannot be 0");
        anyhow::ensure!(
            !self.agents.enabled.is_empty(),
            "agents.enabled cannot be empty"
        );
        Ok(())
    }

    /// Effective public base URL.
    pub fn base_url(&self) -> String {
        self.server.base_url.clone().unwrap_or_else(|| {
            format!("http://{}:{}", self.server.host, self.server.port)
        })
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public base URL, when served behind a proxy
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8484
}

/// Agent adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    /// Adapters to register at startup, in catalog order
    #[serde(default = "default_enabled")]
    pub enabled: Vec<String>,
    /// Execution timeout in seconds for every adapter
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub ollama: OllamaAgentConfig,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            timeout_secs: default_timeout_secs(),
            ollama: OllamaAgentConfig::default(),
        }
    }
}

fn default_enabled() -> Vec<String> {
    vec![
        "claude".to_string(),
        "gemini".to_string(),
        "codex".to_string(),
        "ollama".to_string(),
    ]
}

fn default_timeout_secs() -> u64 {
    300
}

/// Ollama-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaAgentConfig {
    #[serde(default = "default_ollama_host")]
    pub host: String,
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

impl Default for OllamaAgentConfig {
    fn default() -> Self {
        Self {
            host: default_ollama_host(),
            model: default_ollama_model(),
        }
    }
}

fn default_ollama_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2".to_string()
}

/// Routing configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Tie-break among capable agents: `first_registered` or `round_robin`
    #[serde(default)]
    pub tie_break: TieBreak,
    /// Per-task execution deadline in seconds (0 = no deadline)
    #[serde(default)]
    pub deadline_secs: u64,
}

impl RoutingConfig {
    /// The configured deadline as a duration, if any.
    pub fn deadline(&self) -> Option<Duration> {
        (self.deadline_secs > 0).then(|| Duration::from_secs(self.deadline_secs))
    }
}

/// Finished-task retention configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// How long finished tasks stay queryable, in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// How often the eviction sweep runs, in seconds
    #[serde(default = "default_sweep_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_secs(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    3600
}

fn default_sweep_secs() -> u64 {
    60
}

/// Provider identity advertised on the agent card
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_name")]
    pub name: String,
    #[serde(default = "default_provider_url")]
    pub url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            url: default_provider_url(),
        }
    }
}

fn default_provider_name() -> String {
    "Agora".to_string()
}

fn default_provider_url() -> String {
    "https://github.com/agora-agents/agora".to_string()
}
