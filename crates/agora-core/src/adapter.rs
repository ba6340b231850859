//! Adapter contract consumed by the task manager.
//!
//! An adapter wraps one AI tool (a CLI binary or a local HTTP server) and
//! exposes two operations: a blocking `execute` and an optional streaming
//! `execute_stream`. The manager consults [`Adapter::supports_streaming`]
//! before choosing an execution path, and never retries a failed call.

use crate::catalog::Skill;
use crate::message::{Message, Role};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by adapters.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The backing CLI binary is not installed
    #[error("[{adapter}] CLI not found: {command} - {install_hint}")]
    CliNotFound {
        /// Adapter name
        adapter: String,
        /// The missing command
        command: String,
        /// How to install it
        install_hint: String,
    },

    /// The adapter could not be constructed or initialized
    #[error("[{adapter}] initialization failed: {message}")]
    Init {
        /// Adapter name
        adapter: String,
        /// What went wrong
        message: String,
    },

    /// The underlying tool reported a failure
    #[error("[{adapter}] execution failed: {message}")]
    Execution {
        /// Adapter name
        adapter: String,
        /// Failure description (stderr or error body)
        message: String,
        /// Process exit code, when applicable
        exit_code: Option<i32>,
    },

    /// Execution exceeded the adapter's timeout
    #[error("[{adapter}] execution timed out after {timeout:?}")]
    Timeout {
        /// Adapter name
        adapter: String,
        /// The configured timeout
        timeout: Duration,
    },

    /// The adapter does not implement the streaming contract
    #[error("[{adapter}] streaming not supported")]
    StreamingUnsupported {
        /// Adapter name
        adapter: String,
    },

    /// No adapter is registered under the requested name
    #[error("unknown adapter: {0}")]
    Unknown(String),
}

impl AdapterError {
    /// Failure category used for normalized error details.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            AdapterError::CliNotFound { .. } => "cli-not-found",
            AdapterError::Init { .. } => "initialization",
            AdapterError::Execution { .. } => "execution",
            AdapterError::Timeout { .. } => "timeout",
            AdapterError::StreamingUnsupported { .. } => "streaming-unsupported",
            AdapterError::Unknown(_) => "unknown-adapter",
        }
    }
}

/// Adapter result type alias
pub type AdapterResult<T> = std::result::Result<T, AdapterError>;

/// Outcome of a blocking execution.
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    /// Text content of the response
    pub content: String,
    /// Structured payload the tool produced alongside the text, if any
    pub structured: Option<serde_json::Value>,
    /// The tool asked for a follow-up message instead of finishing
    pub needs_input: bool,
}

impl ExecutionResult {
    /// Create a plain text result.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            structured: None,
            needs_input: false,
        }
    }
}

/// One chunk of a streaming execution.
#[derive(Debug, Clone, Default)]
pub struct StreamChunk {
    /// Text delta carried by this chunk, possibly empty
    pub content: String,
    /// No more chunks will follow
    pub is_final: bool,
    /// The tool asked for a follow-up message instead of finishing
    pub needs_input: bool,
    /// In-band failure; the stream ends after an error chunk
    pub error: Option<String>,
}

impl StreamChunk {
    /// A non-final text chunk.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// The empty final chunk closing a successful stream.
    #[must_use]
    pub fn done() -> Self {
        Self {
            is_final: true,
            ..Self::default()
        }
    }

    /// A final chunk carrying an in-band failure.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            is_final: true,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Finite, non-restartable stream of execution chunks.
pub type ChunkStream = BoxStream<'static, StreamChunk>;

/// Capability interface over one AI tool.
///
/// Implementations must be cheap to share (`Arc<dyn Adapter>`); each
/// `execute`/`execute_stream` call is an independent invocation of the
/// underlying tool. A well-behaved adapter eventually completes, fails, or
/// honors cancellation — it never silently hangs.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Stable identifier, used for registration and routing.
    fn name(&self) -> &str;

    /// Human-readable name for discovery documents.
    fn display_name(&self) -> String;

    /// Description of what the wrapped tool can do.
    fn description(&self) -> String;

    /// Skills this adapter provides, used for capability-based routing.
    fn skills(&self) -> Vec<Skill>;

    /// Whether [`Adapter::execute_stream`] is implemented.
    fn supports_streaming(&self) -> bool {
        false
    }

    /// Whether the underlying tool is installed and responding.
    async fn health_check(&self) -> bool;

    /// Run a prompt to completion and return the full result.
    async fn execute(&self, prompt: &str, context: &[Message]) -> AdapterResult<ExecutionResult>;

    /// Run a prompt, yielding chunks as the tool produces them.
    ///
    /// The default implementation reports the streaming contract as
    /// unsupported; adapters that set `supports_streaming` must override.
    async fn execute_stream(
        &self,
        _prompt: &str,
        _context: &[Message],
    ) -> AdapterResult<ChunkStream> {
        Err(AdapterError::StreamingUnsupported {
            adapter: self.name().to_string(),
        })
    }
}

impl std::fmt::Debug for dyn Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Adapter").field("name", &self.name()).finish()
    }
}

/// Render conversation history into a plain-text context block.
///
/// CLI tools take a single prompt string, so prior turns are folded in as
/// `User:`/`Assistant:` lines ahead of the new prompt.
#[must_use]
pub fn context_prompt(context: &[Message]) -> String {
    context
        .iter()
        .map(|msg| {
            let speaker = match msg.role {
                Role::User => "User",
                Role::Agent => "Assistant",
            };
            format!("{}: {}", speaker, msg.text_content())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Combine context history and the new prompt into one CLI input.
#[must_use]
pub fn full_prompt(prompt: &str, context: &[Message]) -> String {
    if context.is_empty() {
        prompt.to_string()
    } else {
        format!("{}\n\nUser: {}", context_prompt(context), prompt)
    }
}
