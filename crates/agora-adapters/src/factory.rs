//! Adapter construction from configuration.

use crate::claude::{ClaudeCodeAdapter, ClaudeConfig};
use crate::codex::{CodexCliAdapter, CodexConfig};
use crate::gemini::{GeminiCliAdapter, GeminiConfig};
use crate::ollama::{OllamaAdapter, OllamaConfig};
use agora_core::{Adapter, AdapterError, AdapterResult};
use std::sync::Arc;

/// Settings shared by the factory when building adapters.
#[derive(Debug, Clone)]
pub struct AdapterSettings {
    /// Execution timeout in seconds for every adapter
    pub timeout_secs: u64,
    /// Ollama server configuration
    pub ollama: OllamaConfig,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            ollama: OllamaConfig::default(),
        }
    }
}

/// Names of the built-in adapters, in registration order.
pub const BUILTIN_ADAPTERS: &[&str] = &["claude", "gemini", "codex", "ollama"];

/// Build an adapter by name.
///
/// Both the short name (`claude`) and the full name (`claude-code`) are
/// accepted. Fails with [`AdapterError::Unknown`] for anything else.
pub fn build_adapter(name: &str, settings: &AdapterSettings) -> AdapterResult<Arc<dyn Adapter>> {
    match name {
        "claude" | "claude-code" => Ok(Arc::new(ClaudeCodeAdapter::new(ClaudeConfig {
            timeout_secs: settings.timeout_secs,
            model: None,
        }))),
        "gemini" | "gemini-cli" => Ok(Arc::new(GeminiCliAdapter::new(GeminiConfig {
            timeout_secs: settings.timeout_secs,
            model: None,
        }))),
        "codex" | "codex-cli" => Ok(Arc::new(CodexCliAdapter::new(CodexConfig {
            timeout_secs: settings.timeout_secs,
        }))),
        "ollama" => Ok(Arc::new(OllamaAdapter::new(OllamaConfig {
            timeout_secs: settings.timeout_secs,
            ..settings.ollama.clone()
        }))),
        other => Err(AdapterError::Unknown(other.to_string())),
    }
}
