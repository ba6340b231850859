//! Codex CLI adapter.
//!
//! Invokes `codex exec --json`. The Codex CLI has no incremental output
//! mode, so this adapter implements only the blocking contract.

use crate::output::parse_json_output;
use crate::process::{cli_available, cli_responds, ensure_cli, run_cli};
use agora_core::{full_prompt, Adapter, AdapterResult, ExecutionResult, Message, Skill};
use async_trait::async_trait;
use std::time::Duration;

const CLI_COMMAND: &str = "codex";
const INSTALL_HINT: &str = "install with: npm install -g @openai/codex";

/// Configuration for the Codex CLI adapter.
#[derive(Debug, Clone)]
pub struct CodexConfig {
    /// Execution timeout in seconds
    pub timeout_secs: u64,
}

impl Default for CodexConfig {
    fn default() -> Self {
        Self { timeout_secs: 300 }
    }
}

/// Adapter for the Codex CLI.
#[derive(Debug, Clone)]
pub struct CodexCliAdapter {
    config: CodexConfig,
}

impl CodexCliAdapter {
    /// Create an adapter with the given configuration.
    #[must_use]
    pub fn new(config: CodexConfig) -> Self {
        Self { config }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }
}

#[async_trait]
impl Adapter for CodexCliAdapter {
    fn name(&self) -> &str {
        "codex-cli"
    }

    fn display_name(&self) -> String {
        "Codex CLI".to_string()
    }

    fn description(&self) -> String {
        "OpenAI's Codex CLI - code generation and workspace automation with \
         file editing and command execution."
            .to_string()
    }

    fn skills(&self) -> Vec<Skill> {
        vec![
            Skill::new(
                "code-generation",
                "Code Generation",
                "Generate code from natural language descriptions",
                &["coding", "generation", "development"],
            ),
            Skill::new(
                "file-operations",
                "File Operations",
                "Create and edit files in a workspace",
                &["files", "editing", "workspace"],
            ),
            Skill::new(
                "code-execution",
                "Command Execution",
                "Run shell commands as part of a task",
                &["execution", "shell", "commands"],
            ),
            Skill::new(
                "project-scaffolding",
                "Project Scaffolding",
                "Set up new projects and boilerplate",
                &["scaffolding", "setup", "initialization"],
            ),
        ]
    }

    async fn health_check(&self) -> bool {
        cli_available(CLI_COMMAND).await && cli_responds(CLI_COMMAND).await
    }

    async fn execute(&self, prompt: &str, context: &[Message]) -> AdapterResult<ExecutionResult> {
        ensure_cli(self.name(), CLI_COMMAND, INSTALL_HINT).await?;
        let args = vec![
            "exec".to_string(),
            "--json".to_string(),
            full_prompt(prompt, context),
        ];
        let stdout = run_cli(self.name(), CLI_COMMAND, &args, self.timeout()).await?;
        let (content, structured) = parse_json_output(&stdout);
        Ok(ExecutionResult {
            content,
            structured,
            needs_input: false,
        })
    }
}
