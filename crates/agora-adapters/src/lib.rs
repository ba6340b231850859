//! Agora Adapters - concrete tool wrappers
//!
//! This crate implements the adapter contract from `agora-core` for the
//! supported AI tools:
//! - Claude Code: `claude --print --output-format json|stream-json`
//! - Gemini CLI: `gemini --output-format json|stream-json`
//! - Codex CLI: `codex exec --json` (blocking only)
//! - Ollama: local HTTP chat API with NDJSON streaming
//!
//! CLI adapters invoke locally installed binaries via subprocess, so
//! execution rides on the user's existing tool installations and
//! authentication rather than direct API credentials.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod claude;
pub mod codex;
pub mod factory;
pub mod gemini;
pub mod ollama;

mod output;
mod process;

pub use claude::{ClaudeCodeAdapter, ClaudeConfig};
pub use codex::{CodexCliAdapter, CodexConfig};
pub use factory::{build_adapter, AdapterSettings, BUILTIN_ADAPTERS};
pub use gemini::{GeminiCliAdapter, GeminiConfig};
pub use ollama::{OllamaAdapter, OllamaConfig};
