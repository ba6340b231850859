//! Gemini CLI adapter.
//!
//! Invokes the locally installed `gemini` binary with
//! `--output-format json` (or `stream-json` when streaming).

use crate::output::{parse_json_output, parse_stream_line};
use crate::process::{cli_available, cli_responds, ensure_cli, run_cli, spawn_cli_stream};
use agora_core::{
    full_prompt, Adapter, AdapterResult, ChunkStream, ExecutionResult, Message, Skill,
};
use async_trait::async_trait;
use std::time::Duration;

const CLI_COMMAND: &str = "gemini";
const INSTALL_HINT: &str = "install with: npm install -g @google/gemini-cli";

/// Configuration for the Gemini CLI adapter.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Execution timeout in seconds
    pub timeout_secs: u64,
    /// Optional model override passed as `--model`
    pub model: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 180,
            model: None,
        }
    }
}

/// Adapter for the Gemini CLI.
#[derive(Debug, Clone)]
pub struct GeminiCliAdapter {
    config: GeminiConfig,
}

impl GeminiCliAdapter {
    /// Create an adapter with the given configuration.
    #[must_use]
    pub fn new(config: GeminiConfig) -> Self {
        Self { config }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    fn build_args(&self, output_format: &str, input: String) -> Vec<String> {
        let mut args = vec!["--output-format".to_string(), output_format.to_string()];
        if let Some(model) = &self.config.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }
        args.push(input);
        args
    }
}

#[async_trait]
impl Adapter for GeminiCliAdapter {
    fn name(&self) -> &str {
        "gemini-cli"
    }

    fn display_name(&self) -> String {
        "Gemini CLI".to_string()
    }

    fn description(&self) -> String {
        "Google's Gemini CLI - multimodal reasoning, coding help, grounded \
         search, and large-context document analysis."
            .to_string()
    }

    fn skills(&self) -> Vec<Skill> {
        vec![
            Skill::new(
                "reasoning",
                "General Reasoning",
                "Analysis and multi-step problem solving",
                &["reasoning", "analysis", "problem-solving", "thinking"],
            ),
            Skill::new(
                "coding",
                "Coding Assistance",
                "Code generation, debugging, and review",
                &["coding", "development", "debugging", "review"],
            ),
            Skill::new(
                "search",
                "Grounded Search",
                "Answer questions grounded in current web results",
                &["search", "research", "current-events", "facts"],
            )
            .with_examples(&[
                "What changed in the latest Rust release?",
                "Summarize today's top stories about AI",
            ]),
            Skill::new(
                "documents",
                "Document Analysis",
                "Analyze long documents within a large context window",
                &["analysis", "documents", "large-context"],
            ),
        ]
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    async fn health_check(&self) -> bool {
        cli_available(CLI_COMMAND).await && cli_responds(CLI_COMMAND).await
    }

    async fn execute(&self, prompt: &str, context: &[Message]) -> AdapterResult<ExecutionResult> {
        ensure_cli(self.name(), CLI_COMMAND, INSTALL_HINT).await?;
        let args = self.build_args("json", full_prompt(prompt, context));
        let stdout = run_cli(self.name(), CLI_COMMAND, &args, self.timeout()).await?;
        let (content, structured) = parse_json_output(&stdout);
        Ok(ExecutionResult {
            content,
            structured,
            needs_input: false,
        })
    }

    async fn execute_stream(
        &self,
        prompt: &str,
        context: &[Message],
    ) -> AdapterResult<ChunkStream> {
        ensure_cli(self.name(), CLI_COMMAND, INSTALL_HINT).await?;
        let args = self.build_args("stream-json", full_prompt(prompt, context));
        spawn_cli_stream(
            self.name().to_string(),
            CLI_COMMAND,
            &args,
            self.timeout(),
            parse_stream_line,
        )
    }
}
