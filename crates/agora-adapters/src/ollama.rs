//! Ollama adapter - local model inference over HTTP.
//!
//! Talks to a local Ollama instance via its chat API. Non-streaming calls
//! use `stream: false`; streaming calls consume the NDJSON response body
//! line by line.

use agora_core::{
    Adapter, AdapterError, AdapterResult, ChunkStream, ExecutionResult, Message, Role, Skill,
    StreamChunk,
};
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Default Ollama API URL
const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default model
const DEFAULT_MODEL: &str = "llama3.2";

/// Configuration for the Ollama adapter.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Server URL (default: `http://localhost:11434`)
    pub base_url: String,
    /// Model to run
    pub model: String,
    /// Request timeout in seconds (local inference can be slow)
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 300,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Adapter for a local Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaAdapter {
    config: OllamaConfig,
    client: reqwest::Client,
}

impl OllamaAdapter {
    /// Create an adapter with the given configuration.
    #[must_use]
    pub fn new(config: OllamaConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.config.base_url.trim_end_matches('/'))
    }

    fn build_messages(&self, prompt: &str, context: &[Message]) -> Vec<ChatMessage> {
        let mut messages: Vec<ChatMessage> = context
            .iter()
            .map(|msg| ChatMessage {
                role: match msg.role {
                    Role::User => "user".to_string(),
                    Role::Agent => "assistant".to_string(),
                },
                content: msg.text_content(),
            })
            .collect();
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        });
        messages
    }

    fn http_error(&self, message: impl std::fmt::Display) -> AdapterError {
        AdapterError::Execution {
            adapter: self.name().to_string(),
            message: message.to_string(),
            exit_code: None,
        }
    }
}

#[async_trait]
impl Adapter for OllamaAdapter {
    fn name(&self) -> &str {
        "ollama"
    }

    fn display_name(&self) -> String {
        format!("Ollama ({})", self.config.model)
    }

    fn description(&self) -> String {
        format!(
            "Local Ollama instance running {}. Privacy-focused inference; no \
             data leaves the machine.",
            self.config.model
        )
    }

    fn skills(&self) -> Vec<Skill> {
        vec![
            Skill::new(
                "local-inference",
                "Local Inference",
                "Privacy-focused local model inference",
                &["local", "privacy", "inference", "free"],
            ),
            Skill::new(
                "text-generation",
                "Text Generation",
                "General text generation and completion",
                &["generation", "completion", "text", "creative"],
            ),
            Skill::new(
                "chat",
                "Conversational AI",
                "Multi-turn conversational capabilities",
                &["chat", "conversation", "assistant"],
            ),
            Skill::new(
                "code-assistance",
                "Code Assistance",
                "Code generation and explanation (model dependent)",
                &["coding", "development"],
            ),
        ]
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url.trim_end_matches('/'));
        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn execute(&self, prompt: &str, context: &[Message]) -> AdapterResult<ExecutionResult> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: self.build_messages(prompt, context),
            stream: false,
        };
        debug!(model = %self.config.model, "Sending Ollama chat request");

        let response = self
            .client
            .post(self.chat_url())
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.http_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(self.http_error(format!("HTTP {}: {}", status, body.trim())));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| self.http_error(e))?;
        let content = chat.message.map(|m| m.content).unwrap_or_default();
        Ok(ExecutionResult::text(content))
    }

    async fn execute_stream(
        &self,
        prompt: &str,
        context: &[Message],
    ) -> AdapterResult<ChunkStream> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: self.build_messages(prompt, context),
            stream: true,
        };
        debug!(model = %self.config.model, "Sending Ollama chat request (streaming)");

        let response = self
            .client
            .post(self.chat_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| self.http_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(self.http_error(format!("HTTP {}: {}", status, body.trim())));
        }

        let (tx, rx) = mpsc::channel::<StreamChunk>(32);
        tokio::spawn(async move {
            let mut body = response.bytes_stream();
            let mut buffer = String::new();
            while let Some(item) = body.next().await {
                let bytes = match item {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let _ = tx.send(StreamChunk::failed(e.to_string())).await;
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&bytes));
                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim().to_string();
                    buffer.drain(..=pos);
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<ChatResponse>(&line) {
                        Ok(chunk) => {
                            let content = chunk.message.map(|m| m.content).unwrap_or_default();
                            let done = chunk.done;
                            if !content.is_empty() || done {
                                let sent = tx
                                    .send(StreamChunk {
                                        content,
                                        is_final: done,
                                        ..StreamChunk::default()
                                    })
                                    .await;
                                if sent.is_err() {
                                    // Receiver dropped: execution was canceled
                                    return;
                                }
                            }
                            if done {
                                return;
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "Skipping malformed Ollama stream line");
                        }
                    }
                }
            }
            let _ = tx.send(StreamChunk::done()).await;
        });

        Ok(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|chunk| (chunk, rx))
        })
        .boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OllamaConfig::default();
        assert_eq!(config.base_url, "http://localhost:11434");
        assert_eq!(config.model, "llama3.2");
    }

    #[test]
    fn test_chat_url_strips_trailing_slash() {
        let adapter = OllamaAdapter::new(OllamaConfig {
            base_url: "http://localhost:11434/".to_string(),
            ..OllamaConfig::default()
        });
        assert_eq!(adapter.chat_url(), "http://localhost:11434/api/chat");
    }

    #[test]
    fn test_build_messages_maps_roles() {
        let adapter = OllamaAdapter::new(OllamaConfig::default());
        let context = vec![
            Message::user_text("hi"),
            Message::agent_text("hello, how can I help?"),
        ];
        let messages = adapter.build_messages("summarize", &context);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[1].role, "assistant");
        assert_eq!(messages[2].role, "user");
        assert_eq!(messages[2].content, "summarize");
    }

    #[test]
    fn test_chat_request_serialization() {
        let request = ChatRequest {
            model: "llama3.2".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "hi".to_string(),
            }],
            stream: false,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"model\":\"llama3.2\""));
        assert!(json.contains("\"stream\":false"));
    }

    #[test]
    fn test_chat_response_deserialization() {
        let json = r#"{"model":"llama3.2","message":{"role":"assistant","content":"hey"},"done":true}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert!(response.done);
        assert_eq!(response.message.unwrap().content, "hey");
    }

    #[test]
    fn test_display_name_includes_model() {
        let adapter = OllamaAdapter::new(OllamaConfig::default());
        assert_eq!(adapter.display_name(), "Ollama (llama3.2)");
    }
}
