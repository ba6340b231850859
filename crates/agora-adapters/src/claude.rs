//! Claude Code CLI adapter.
//!
//! Invokes the locally installed `claude` binary with
//! `--print --output-format json` (or `stream-json` when streaming), so
//! execution rides on the user's existing subscription and authentication.

use crate::output::{parse_json_output, parse_stream_line};
use crate::process::{cli_available, cli_responds, ensure_cli, run_cli, spawn_cli_stream};
use agora_core::{
    full_prompt, Adapter, AdapterResult, ChunkStream, ExecutionResult, Message, Skill,
};
use async_trait::async_trait;
use std::time::Duration;

const CLI_COMMAND: &str = "claude";
const INSTALL_HINT: &str = "install with: npm install -g @anthropic-ai/claude-code";

/// Configuration for the Claude Code adapter.
#[derive(Debug, Clone)]
pub struct ClaudeConfig {
    /// Execution timeout in seconds
    pub timeout_secs: u64,
    /// Optional model override passed as `--model`
    pub model: Option<String>,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            model: None,
        }
    }
}

/// Adapter for the Claude Code CLI.
#[derive(Debug, Clone)]
pub struct ClaudeCodeAdapter {
    config: ClaudeConfig,
}

impl ClaudeCodeAdapter {
    /// Create an adapter with the given configuration.
    #[must_use]
    pub fn new(config: ClaudeConfig) -> Self {
        Self { config }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    fn build_args(&self, output_format: &str, input: String) -> Vec<String> {
        let mut args = vec![
            "--print".to_string(),
            "--output-format".to_string(),
            output_format.to_string(),
        ];
        if let Some(model) = &self.config.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }
        args.push(input);
        args
    }
}

#[async_trait]
impl Adapter for ClaudeCodeAdapter {
    fn name(&self) -> &str {
        "claude-code"
    }

    fn display_name(&self) -> String {
        "Claude Code".to_string()
    }

    fn description(&self) -> String {
        "Anthropic's Claude Code CLI - an agentic coding assistant for code \
         generation, review, debugging, and complex development tasks."
            .to_string()
    }

    fn skills(&self) -> Vec<Skill> {
        vec![
            Skill::new(
                "code-generation",
                "Code Generation",
                "Generate code from natural language descriptions",
                &["coding", "generation", "development"],
            )
            .with_examples(&[
                "Write a Python function to parse JSON",
                "Implement a binary search algorithm in Go",
            ]),
            Skill::new(
                "code-review",
                "Code Review",
                "Review and analyze code for issues, bugs, and improvements",
                &["coding", "review", "analysis", "quality"],
            ),
            Skill::new(
                "debugging",
                "Debugging Assistance",
                "Help debug and fix code issues",
                &["coding", "debugging", "troubleshooting", "fix"],
            ),
            Skill::new(
                "refactoring",
                "Code Refactoring",
                "Improve code structure and maintainability",
                &["coding", "refactoring", "cleanup", "optimization"],
            ),
            Skill::new(
                "explanation",
                "Code Explanation",
                "Explain how code works",
                &["coding", "explanation", "documentation", "learning"],
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
