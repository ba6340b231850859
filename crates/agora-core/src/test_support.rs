//! Scripted adapter double shared by unit tests.

use crate::adapter::{
    Adapter, AdapterError, AdapterResult, ChunkStream, ExecutionResult, StreamChunk,
};
use crate::catalog::Skill;
use crate::message::Message;
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub(crate) struct MockAdapter {
    name: String,
    tags: Vec<String>,
    streaming: bool,
    delay: Option<Duration>,
    chunk_delay: Option<Duration>,
    chunks: Vec<StreamChunk>,
    results: Vec<ExecutionResult>,
    fail_with: Option<String>,
    calls: AtomicUsize,
}

impl MockAdapter {
    /// Blocking adapter that echoes its prompt.
    pub(crate) fn new(name: &str, tags: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
            streaming: false,
            delay: None,
            chunk_delay: None,
            chunks: Vec::new(),
            results: Vec::new(),
            fail_with: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Streaming adapter replaying the given chunks.
    pub(crate) fn streaming(name: &str, tags: &[&str], chunks: Vec<StreamChunk>) -> Self {
        let mut adapter = Self::new(name, tags);
        adapter.streaming = true;
        adapter.chunks = chunks;
        adapter
    }

    /// Blocking adapter whose every call fails.
    pub(crate) fn failing(name: &str, tags: &[&str], error: &str) -> Self {
        let mut adapter = Self::new(name, tags);
        adapter.fail_with = Some(error.to_string());
        adapter
    }

    /// Sleep this long before answering each call.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sleep this long before each streamed chunk.
    pub(crate) fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    /// Script results for successive blocking calls; the last entry
    /// repeats once the script runs out.
    pub(crate) fn with_results(mut self, results: Vec<ExecutionResult>) -> Self {
        self.results = results;
        self
    }

    #[allow(dead_code)]
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Adapter for MockAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> String {
        format!("Mock {}", self.name)
    }

    fn description(&self) -> String {
        "scripted test adapter".to_string()
    }

    fn skills(&self) -> Vec<Skill> {
        let tags: Vec<&str> = self.tags.iter().map(String::as_str).collect();
        vec![Skill::new(
            format!("{}-skill", self.name),
            "Mock Skill",
            "scripted capability",
            &tags,
        )]
    }

    fn supports_streaming(&self) -> bool {
        self.streaming
    }

    async fn health_check(&self) -> bool {
        true
    }

    async fn execute(&self, prompt: &str, _context: &[Message]) -> AdapterResult<ExecutionResult> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = &self.fail_with {
            return Err(AdapterError::Execution {
                adapter: self.name.clone(),
                message: error.clone(),
                exit_code: Some(1),
            });
        }
        if !self.results.is_empty() {
            let index = call.min(self.results.len() - 1);
            return Ok(self.results[index].clone());
        }
        Ok(ExecutionResult::text(format!("echo: {}", prompt)))
    }

    async fn execute_stream(
        &self,
        _prompt: &str,
        _context: &[Message],
    ) -> AdapterResult<ChunkStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let chunk_delay = self.chunk_delay;
        let stream = futures::stream::iter(self.chunks.clone()).then(move |chunk| async move {
            if let Some(delay) = chunk_delay {
                tokio::time::sleep(delay).await;
            }
            chunk
        });
        Ok(stream.boxed())
    }
}
