//! Concurrent task manager.
//!
//! The manager is the single authority that creates, executes, and mutates
//! tasks. Each task lives in its own slot with a `Mutex` around the task
//! record, a broadcast channel for events, and a cancellation token for the
//! in-flight execution. Transitions are applied and their events published
//! under the per-task lock, so every subscriber observes events in exactly
//! the order they were generated; unrelated tasks never contend.

use crate::adapter::ExecutionResult;
use crate::catalog::AgentDescriptor;
use crate::error::{Error, Result};
use crate::event::TaskEvent;
use crate::message::{generate_id, Artifact, Message, Part};
use crate::router::{RouteRequirements, Router};
use crate::task::{ErrorDetail, Task, TaskState};
use chrono::Utc;
use futures::stream::{BoxStream, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Task manager tuning knobs.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Per-task event channel capacity; subscribers further behind than
    /// this start missing events
    pub event_capacity: usize,
    /// Optional wall-clock limit for one execution attempt; when exceeded
    /// the task fails with a `deadline-exceeded` detail
    pub execution_deadline: Option<Duration>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            event_capacity: 256,
            execution_deadline: None,
        }
    }
}

/// Per-task state owned by the manager.
struct TaskSlot {
    task: Mutex<Task>,
    events: broadcast::Sender<TaskEvent>,
    cancel: CancellationToken,
    agent: OnceLock<Arc<AgentDescriptor>>,
}

fn emit_status(slot: &TaskSlot, task: &Task) {
    let event = TaskEvent::StatusUpdate {
        task_id: task.id.clone(),
        context_id: task.context_id.clone(),
        status: task.status.clone(),
        is_final: task.is_terminal(),
    };
    let _ = slot.events.send(event);
}

fn emit_artifact(slot: &TaskSlot, task: &Task, artifact: Artifact, append: bool, last_chunk: bool) {
    let event = TaskEvent::ArtifactUpdate {
        task_id: task.id.clone(),
        context_id: task.context_id.clone(),
        artifact,
        append,
        last_chunk,
    };
    let _ = slot.events.send(event);
}

/// Handle to a created task.
///
/// The event receiver is subscribed before the first transition is applied,
/// so a handle never misses an event of its own task.
pub struct TaskHandle {
    task_id: String,
    context_id: String,
    manager: Arc<TaskManager>,
    events: broadcast::Receiver<TaskEvent>,
}

impl TaskHandle {
    /// Id of the task this handle refers to.
    #[must_use]
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Context id of the task.
    #[must_use]
    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    /// Wait until the task reaches a terminal or input-required state and
    /// return its snapshot.
    pub async fn wait(mut self) -> Result<Task> {
        loop {
            match self.events.recv().await {
                Ok(TaskEvent::StatusUpdate { status, .. })
                    if status.state.is_terminal() || status.state == TaskState::InputRequired =>
                {
                    break;
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Task handle lagged behind events");
                    let task = self.manager.get(&self.task_id).await?;
                    if task.is_terminal() || task.status.state == TaskState::InputRequired {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        self.manager.get(&self.task_id).await
    }

    /// Consume the handle, yielding the task's event stream.
    ///
    /// The stream ends after the final status event.
    #[must_use]
    pub fn into_events(self) -> BoxStream<'static, TaskEvent> {
        event_stream(self.events)
    }
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("task_id", &self.task_id)
            .field("context_id", &self.context_id)
            .finish_non_exhaustive()
    }
}

/// Turn a broadcast receiver into a stream that ends after the final event.
fn event_stream(receiver: broadcast::Receiver<TaskEvent>) -> BoxStream<'static, TaskEvent> {
    futures::stream::unfold(Some(receiver), |state| async move {
        let mut receiver = state?;
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let next = if event.is_final() { None } else { Some(receiver) };
                    return Some((event, next));
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event subscriber lagged; events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .boxed()
}

/// Creates, executes, and mutates tasks.
///
/// Owns the in-memory task registry. Reads take a shared lock on the
/// registry map only; all task mutation goes through the per-task mutex.
pub struct TaskManager {
    tasks: RwLock<HashMap<String, Arc<TaskSlot>>>,
    router: Router,
    config: ManagerConfig,
}

impl TaskManager {
    /// Create a manager with default configuration.
    #[must_use]
    pub fn new(router: Router) -> Self {
        Self::with_config(router, ManagerConfig::default())
    }

    /// Create a manager with explicit configuration.
    #[must_use]
    pub fn with_config(router: Router, config: ManagerConfig) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            router,
            config,
        }
    }

    /// The router used for agent selection.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Create a task from its originating message and start executing it.
    ///
    /// Routing failure is an expected outcome: the returned handle then
    /// refers to a task already in the failed state.
    pub async fn create_and_run(
        self: &Arc<Self>,
        message: Message,
        requirements: RouteRequirements,
    ) -> TaskHandle {
        let task = Task::new(message);
        let task_id = task.id.clone();
        let context_id = task.context_id.clone();

        let (events, _) = broadcast::channel(self.config.event_capacity);
        let slot = Arc::new(TaskSlot {
            task: Mutex::new(task),
            events,
            cancel: CancellationToken::new(),
            agent: OnceLock::new(),
        });
        {
            let mut tasks = self.tasks.write().unwrap_or_else(|e| e.into_inner());
            tasks.insert(task_id.clone(), Arc::clone(&slot));
        }
        // Subscribe before any transition so the handle sees every event.
        let receiver = slot.events.subscribe();

        match self.router.select(&requirements) {
            Ok(agent) => {
                info!(task = %task_id, agent = %agent.id, "Task accepted");
                {
                    let mut task = slot.task.lock().await;
                    task.agent_id = Some(agent.id.clone());
                    if task.transition(TaskState::Working, None).is_ok() {
                        emit_status(&slot, &task);
                    }
                }
                let _ = slot.agent.set(Arc::clone(&agent));
                let manager = Arc::clone(self);
                let exec_slot = Arc::clone(&slot);
                tokio::spawn(async move {
                    manager.run_execution(exec_slot, agent).await;
                });
            }
            Err(err) => {
                warn!(task = %task_id, error = %err, "Routing failed");
                let mut task = slot.task.lock().await;
                if task
                    .fail(ErrorDetail::new("routing", err.to_string()))
                    .is_ok()
                {
                    emit_status(&slot, &task);
                }
            }
        }

        TaskHandle {
            task_id,
            context_id,
            manager: Arc::clone(self),
            events: receiver,
        }
    }

    /// Resume a task waiting for input with a follow-up message.
    ///
    /// The message is appended to the history as part of the transition to
    /// working, before any new event from the resumed execution.
    pub async fn continue_task(self: &Arc<Self>, task_id: &str, message: Message) -> Result<TaskHandle> {
        let slot = self.slot(task_id)?;

        let (receiver, context_id, agent) = {
            let mut task = slot.task.lock().await;
            if task.status.state != TaskState::InputRequired {
                return Err(Error::InvalidTaskState {
                    id: task.id.clone(),
                    state: task.status.state,
                    expected: TaskState::InputRequired,
                });
            }
            let agent = slot.agent.get().cloned().ok_or_else(|| Error::InvalidTaskState {
                id: task.id.clone(),
                state: task.status.state,
                expected: TaskState::InputRequired,
            })?;
            let receiver = slot.events.subscribe();
            let message = message.with_task(task.id.clone(), task.context_id.clone());
            task.transition(TaskState::Working, Some(message))?;
            emit_status(&slot, &task);
            (receiver, task.context_id.clone(), agent)
        };

        info!(task = %task_id, agent = %agent.id, "Task resumed");
        let manager = Arc::clone(self);
        let exec_slot = Arc::clone(&slot);
        tokio::spawn(async move {
            manager.run_execution(exec_slot, agent).await;
        });

        Ok(TaskHandle {
            task_id: task_id.to_string(),
            context_id,
            manager: Arc::clone(self),
            events: receiver,
        })
    }

    /// Snapshot of a task: history, current state, and artifacts.
    pub async fn get(&self, task_id: &str) -> Result<Task> {
        let slot = self.slot(task_id)?;
        let task = slot.task.lock().await;
        Ok(task.clone())
    }

    /// Request cancellation of a task.
    ///
    /// Signals the execution's cancellation token and transitions to
    /// canceled immediately; the adapter call is abandoned in the
    /// background. Canceling an already-finished task is a no-op.
    pub async fn cancel(&self, task_id: &str) -> Result<Task> {
        let slot = self.slot(task_id)?;
        let mut task = slot.task.lock().await;
        if task.is_terminal() {
            debug!(task = %task_id, state = %task.status.state, "Cancel on finished task is a no-op");
            return Ok(task.clone());
        }
        slot.cancel.cancel();
        task.transition(TaskState::Canceled, None)?;
        emit_status(&slot, &task);
        info!(task = %task_id, "Task canceled");
        Ok(task.clone())
    }

    /// Subscribe to a task's events from this moment onward.
    ///
    /// The stream ends after the final status event. Subscribing to a task
    /// that already finished yields an immediately-closed stream.
    pub async fn subscribe(&self, task_id: &str) -> Result<BoxStream<'static, TaskEvent>> {
        let slot = self.slot(task_id)?;
        let receiver = {
            let task = slot.task.lock().await;
            if task.is_terminal() {
                return Ok(futures::stream::empty().boxed());
            }
            slot.events.subscribe()
        };
        Ok(event_stream(receiver))
    }

    /// List task snapshots, newest first, optionally filtered by state.
    pub async fn list(&self, state: Option<TaskState>, limit: usize) -> Vec<Task> {
        let slots: Vec<Arc<TaskSlot>> = {
            let tasks = self.tasks.read().unwrap_or_else(|e| e.into_inner());
            tasks.values().cloned().collect()
        };
        let mut out = Vec::new();
        for slot in slots {
            let task = slot.task.lock().await;
            if state.map_or(true, |s| task.status.state == s) {
                out.push(task.clone());
            }
        }
        out.sort_by(|a, b| b.status.timestamp.cmp(&a.status.timestamp));
        out.truncate(limit);
        out
    }

    /// Number of tasks in the registry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict finished tasks older than `max_age`. Returns how many were
    /// removed. The server drives this on a periodic sweep; retention is
    /// bounded by configuration, not by the manager itself.
    pub async fn cleanup_finished(&self, max_age: Duration) -> usize {
        let cutoff = Utc::now() - chrono::Duration::from_std(max_age).unwrap_or_default();
        let slots: Vec<(String, Arc<TaskSlot>)> = {
            let tasks = self.tasks.read().unwrap_or_else(|e| e.into_inner());
            tasks.iter().map(|(k, v)| (k.clone(), Arc::clone(v))).collect()
        };
        let mut expired = Vec::new();
        for (id, slot) in slots {
            let task = slot.task.lock().await;
            let finished_before_cutoff =
                task.is_terminal() && task.status.timestamp.is_some_and(|t| t < cutoff);
            if finished_before_cutoff {
                expired.push(id);
            }
        }
        let mut tasks = self.tasks.write().unwrap_or_else(|e| e.into_inner());
        let before = tasks.len();
        for id in &expired {
            tasks.remove(id);
        }
        let removed = before - tasks.len();
        if removed > 0 {
            debug!(removed, "Evicted finished tasks");
        }
        removed
    }

    fn slot(&self, task_id: &str) -> Result<Arc<TaskSlot>> {
        let tasks = self.tasks.read().unwrap_or_else(|e| e.into_inner());
        tasks
            .get(task_id)
            .cloned()
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))
    }

    async fn run_execution(&self, slot: Arc<TaskSlot>, agent: Arc<AgentDescriptor>) {
        match self.config.execution_deadline {
            Some(deadline) => {
                let attempt = self.drive_adapter(&slot, &agent);
                if tokio::time::timeout(deadline, attempt).await.is_err() {
                    slot.cancel.cancel();
                    warn!(agent = %agent.id, ?deadline, "Execution deadline exceeded");
                    self.fail(
                        &slot,
                        ErrorDetail::new(
                            "deadline-exceeded",
                            format!("execution exceeded the {}s deadline", deadline.as_secs()),
                        ),
                    )
                    .await;
                }
            }
            None => self.drive_adapter(&slot, &agent).await,
        }
    }

    async fn drive_adapter(&self, slot: &TaskSlot, agent: &AgentDescriptor) {
        let (prompt, context) = {
            let task = slot.task.lock().await;
            (task.latest_prompt(), task.context_messages())
        };
        if agent.supports_streaming {
            self.run_streaming(slot, agent, &prompt, &context).await;
        } else {
            self.run_blocking(slot, agent, &prompt, &context).await;
        }
    }

    /// Drive the streaming contract: each non-final chunk with content
    /// becomes one artifact-update event; the accumulated artifact is
    /// recorded on the task as chunks arrive, so partial output survives a
    /// later failure.
    async fn run_streaming(
        &self,
        slot: &TaskSlot,
        agent: &AgentDescriptor,
        prompt: &str,
        context: &[Message],
    ) {
        let mut stream = match agent.adapter.execute_stream(prompt, context).await {
            Ok(stream) => stream,
            Err(err) => {
                self.fail(slot, ErrorDetail::new(err.kind(), err.to_string()))
                    .await;
                return;
            }
        };

        let artifact_id = generate_id();
        let mut chunk_count = 0usize;
        let mut needs_input = false;

        loop {
            let next = tokio::select! {
                () = slot.cancel.cancelled() => {
                    debug!(agent = %agent.id, "Cancellation observed, abandoning adapter stream");
                    return;
                }
                next = stream.next() => next,
            };
            let Some(chunk) = next else { break };

            if let Some(error) = chunk.error {
                self.fail(slot, ErrorDetail::new("execution", error)).await;
                return;
            }
            if !chunk.content.is_empty() {
                let mut task = slot.task.lock().await;
                if task.is_terminal() {
                    debug!(task = %task.id, "Discarding chunk for finished task");
                    return;
                }
                let append = chunk_count > 0;
                if append {
                    if let Some(artifact) = task
                        .artifacts
                        .iter_mut()
                        .find(|a| a.artifact_id == artifact_id)
                    {
                        artifact.parts.push(Part::text(chunk.content.clone()));
                    }
                } else {
                    let mut artifact = Artifact::new(artifact_id.clone(), "response");
                    artifact.parts.push(Part::text(chunk.content.clone()));
                    task.artifacts.push(artifact);
                }
                // The event carries only this chunk's delta
                let mut delta = Artifact::new(artifact_id.clone(), "response");
                delta.parts.push(Part::text(chunk.content));
                emit_artifact(slot, &task, delta, append, false);
                chunk_count += 1;
            }
            if chunk.needs_input {
                needs_input = true;
            }
            if chunk.is_final {
                break;
            }
        }

        self.finish(slot, agent, &artifact_id, needs_input, chunk_count > 0)
            .await;
    }

    /// Drive the blocking contract: one synthetic artifact-update followed
    /// immediately by the terminal transition.
    async fn run_blocking(
        &self,
        slot: &TaskSlot,
        agent: &AgentDescriptor,
        prompt: &str,
        context: &[Message],
    ) {
        let result = tokio::select! {
            () = slot.cancel.cancelled() => {
                debug!(agent = %agent.id, "Cancellation observed, abandoning adapter call");
                return;
            }
            result = agent.adapter.execute(prompt, context) => result,
        };

        match result {
            Ok(result) => self.apply_result(slot, result).await,
            Err(err) => {
                self.fail(slot, ErrorDetail::new(err.kind(), err.to_string()))
                    .await;
            }
        }
    }

    async fn apply_result(&self, slot: &TaskSlot, result: ExecutionResult) {
        let mut task = slot.task.lock().await;
        if task.is_terminal() {
            debug!(task = %task.id, "Discarding adapter result for finished task");
            return;
        }

        if result.needs_input {
            let text = if result.content.is_empty() {
                "Additional input required".to_string()
            } else {
                result.content
            };
            let message =
                Message::agent_text(text).with_task(task.id.clone(), task.context_id.clone());
            match task.transition(TaskState::InputRequired, Some(message)) {
                Ok(_) => emit_status(slot, &task),
                Err(err) => warn!(task = %task.id, error = %err, "Input-required transition rejected"),
            }
            return;
        }

        let mut artifact = Artifact::new(generate_id(), "response");
        artifact.parts.push(Part::text(result.content.clone()));
        if let Some(data) = result.structured {
            artifact.parts.push(Part::data(data));
        }
        artifact.last_chunk = true;
        task.artifacts.push(artifact.clone());
        emit_artifact(slot, &task, artifact, false, true);

        let message = Message::agent_text(result.content)
            .with_task(task.id.clone(), task.context_id.clone());
        match task.transition(TaskState::Completed, Some(message)) {
            Ok(_) => {
                emit_status(slot, &task);
                debug!(task = %task.id, "Task completed");
            }
            Err(err) => warn!(task = %task.id, error = %err, "Completion transition rejected"),
        }
    }

    /// Close out a streaming execution: seal the artifact and apply the
    /// input-required or completed transition.
    async fn finish(
        &self,
        slot: &TaskSlot,
        agent: &AgentDescriptor,
        artifact_id: &str,
        needs_input: bool,
        has_artifact: bool,
    ) {
        let mut task = slot.task.lock().await;
        if task.is_terminal() {
            debug!(task = %task.id, "Discarding adapter result for finished task");
            return;
        }

        let content = task
            .artifacts
            .iter()
            .find(|a| a.artifact_id == artifact_id)
            .map(Artifact::text_content)
            .unwrap_or_default();
        if has_artifact {
            if let Some(artifact) = task
                .artifacts
                .iter_mut()
                .find(|a| a.artifact_id == artifact_id)
            {
                artifact.last_chunk = true;
            }
        }

        let (target, text) = if needs_input {
            let text = if content.is_empty() {
                "Additional input required".to_string()
            } else {
                content
            };
            (TaskState::InputRequired, text)
        } else {
            (TaskState::Completed, content)
        };
        let message = Message::agent_text(text).with_task(task.id.clone(), task.context_id.clone());
        match task.transition(target, Some(message)) {
            Ok(_) => {
                emit_status(slot, &task);
                debug!(task = %task.id, agent = %agent.id, state = %target, "Stream finished");
            }
            Err(err) => warn!(task = %task.id, error = %err, "Finish transition rejected"),
        }
    }

    async fn fail(&self, slot: &TaskSlot, detail: ErrorDetail) {
        let mut task = slot.task.lock().await;
        if task.is_terminal() {
            debug!(task = %task.id, "Discarding failure for finished task");
            return;
        }
        match task.fail(detail) {
            Ok(_) => emit_status(slot, &task),
            Err(err) => warn!(task = %task.id, error = %err, "Failure transition rejected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{ExecutionResult, StreamChunk};
    use crate::catalog::{AgentDescriptor, Catalog};
    use crate::router::TieBreak;
    use crate::test_support::MockAdapter;

    fn manager_with(adapters: Vec<MockAdapter>) -> Arc<TaskManager> {
        manager_with_config(adapters, ManagerConfig::default())
    }

    fn manager_with_config(adapters: Vec<MockAdapter>, config: ManagerConfig) -> Arc<TaskManager> {
        let catalog = Arc::new(Catalog::new());
        for adapter in adapters {
            catalog
                .register(AgentDescriptor::from_adapter(Arc::new(adapter)))
                .unwrap();
        }
        let router = Router::new(catalog, TieBreak::FirstRegistered);
        Arc::new(TaskManager::with_config(router, config))
    }

    #[tokio::test]
    async fn test_streaming_chunks_become_artifact_events() {
        let adapter = MockAdapter::streaming(
            "a",
            &["code"],
            vec![
                StreamChunk::text("Hel"),
                StreamChunk::text("lo"),
                StreamChunk::done(),
            ],
        );
        let manager = manager_with(vec![adapter]);

        let handle = manager
            .create_and_run(Message::user_text("greet"), RouteRequirements::tags(["code"]))
            .await;
        let task_id = handle.task_id().to_string();
        let events: Vec<TaskEvent> = handle.into_events().collect().await;

        // working, two artifact deltas, completed
        assert_eq!(events.len(), 4);
        assert!(
            matches!(&events[0], TaskEvent::StatusUpdate { status, is_final, .. }
                if status.state == TaskState::Working && !is_final)
        );
        match &events[1] {
            TaskEvent::ArtifactUpdate { artifact, append, .. } => {
                assert!(!append);
                assert_eq!(artifact.text_content(), "Hel");
            }
            other => panic!("expected artifact update, got: {:?}", other),
        }
        match &events[2] {
            TaskEvent::ArtifactUpdate { artifact, append, .. } => {
                assert!(append);
                assert_eq!(artifact.text_content(), "lo");
            }
            other => panic!("expected artifact update, got: {:?}", other),
        }
        assert!(
            matches!(&events[3], TaskEvent::StatusUpdate { status, is_final, .. }
                if status.state == TaskState::Completed && *is_final)
        );

        let task = manager.get(&task_id).await.unwrap();
        assert_eq!(task.status.state, TaskState::Completed);
        assert_eq!(task.artifacts.len(), 1);
        assert_eq!(task.artifacts[0].text_content(), "Hello");
        assert!(task.artifacts[0].last_chunk);
        assert_eq!(task.agent_id.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_blocking_adapter_synthesizes_single_artifact() {
        let manager = manager_with(vec![MockAdapter::new("b", &["search"])]);

        let handle = manager
            .create_and_run(Message::user_text("find it"), RouteRequirements::any())
            .await;
        let task = handle.wait().await.unwrap();

        assert_eq!(task.status.state, TaskState::Completed);
        assert_eq!(task.artifacts.len(), 1);
        assert!(task.artifacts[0].last_chunk);
        assert_eq!(task.artifacts[0].text_content(), "echo: find it");
        // Response message appended to history
        assert_eq!(task.history.len(), 2);
        assert_eq!(task.history[1].text_content(), "echo: find it");
    }

    #[tokio::test]
    async fn test_routing_failure_yields_failed_task_not_error() {
        let manager = manager_with(vec![MockAdapter::new("a", &["code"])]);

        let handle = manager
            .create_and_run(
                Message::user_text("translate this"),
                RouteRequirements::tags(["translate"]),
            )
            .await;
        let task = handle.wait().await.unwrap();

        assert_eq!(task.status.state, TaskState::Failed);
        let detail = task.error.as_ref().unwrap();
        assert_eq!(detail.kind, "routing");
        assert!(detail.message.contains("translate"));
    }

    #[tokio::test]
    async fn test_adapter_error_becomes_failed_with_detail() {
        let manager = manager_with(vec![MockAdapter::failing("a", &["code"], "boom")]);

        let handle = manager
            .create_and_run(Message::user_text("x"), RouteRequirements::any())
            .await;
        let task = handle.wait().await.unwrap();

        assert_eq!(task.status.state, TaskState::Failed);
        let detail = task.error.as_ref().unwrap();
        assert_eq!(detail.kind, "execution");
        assert!(detail.message.contains("boom"));
    }

    #[tokio::test]
    async fn test_cancel_wins_race_against_slow_adapter() {
        let adapter = MockAdapter::new("slow", &["code"]).with_delay(Duration::from_millis(200));
        let manager = manager_with(vec![adapter]);

        let handle = manager
            .create_and_run(Message::user_text("x"), RouteRequirements::any())
            .await;
        let task_id = handle.task_id().to_string();

        tokio::time::sleep(Duration::from_millis(30)).await;
        let task = manager.cancel(&task_id).await.unwrap();
        assert_eq!(task.status.state, TaskState::Canceled);

        // The late adapter result must be discarded, not applied
        tokio::time::sleep(Duration::from_millis(300)).await;
        let task = manager.get(&task_id).await.unwrap();
        assert_eq!(task.status.state, TaskState::Canceled);
        assert!(task.artifacts.is_empty());
        assert!(task.error.is_none());
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent_on_finished_task() {
        let manager = manager_with(vec![MockAdapter::new("a", &["code"])]);

        let handle = manager
            .create_and_run(Message::user_text("x"), RouteRequirements::any())
            .await;
        let task = handle.wait().await.unwrap();
        assert_eq!(task.status.state, TaskState::Completed);

        // No error, state unchanged
        let task = manager.cancel(&task.id).await.unwrap();
        assert_eq!(task.status.state, TaskState::Completed);
    }

    #[tokio::test]
    async fn test_subscribe_after_terminal_yields_closed_stream() {
        let manager = manager_with(vec![MockAdapter::new("a", &["code"])]);

        let handle = manager
            .create_and_run(Message::user_text("x"), RouteRequirements::any())
            .await;
        let task = handle.wait().await.unwrap();

        let events: Vec<TaskEvent> = manager.subscribe(&task.id).await.unwrap().collect().await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_observe_same_order() {
        let adapter = MockAdapter::streaming(
            "a",
            &["code"],
            vec![
                StreamChunk::text("one"),
                StreamChunk::text("two"),
                StreamChunk::text("three"),
                StreamChunk::done(),
            ],
        )
        .with_chunk_delay(Duration::from_millis(25));
        let manager = manager_with(vec![adapter]);

        let handle = manager
            .create_and_run(Message::user_text("x"), RouteRequirements::any())
            .await;
        let task_id = handle.task_id().to_string();
        let second = manager.subscribe(&task_id).await.unwrap();

        let (first_events, second_events): (Vec<TaskEvent>, Vec<TaskEvent>) =
            tokio::join!(handle.into_events().collect(), second.collect());

        let texts = |events: &[TaskEvent]| {
            events
                .iter()
                .filter_map(|e| match e {
                    TaskEvent::ArtifactUpdate { artifact, .. } => Some(artifact.text_content()),
                    TaskEvent::StatusUpdate { .. } => None,
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(texts(&first_events), vec!["one", "two", "three"]);
        assert_eq!(texts(&first_events), texts(&second_events));
        assert!(first_events.last().unwrap().is_final());
        assert!(second_events.last().unwrap().is_final());
    }

    #[tokio::test]
    async fn test_input_required_and_continue_flow() {
        let adapter = MockAdapter::new("a", &["code"]).with_results(vec![
            ExecutionResult {
                content: "which file?".to_string(),
                structured: None,
                needs_input: true,
            },
            ExecutionResult::text("patched main.rs"),
        ]);
        let manager = manager_with(vec![adapter]);

        let handle = manager
            .create_and_run(Message::user_text("fix the bug"), RouteRequirements::any())
            .await;
        let task = handle.wait().await.unwrap();
        assert_eq!(task.status.state, TaskState::InputRequired);

        let handle = manager
            .continue_task(&task.id, Message::user_text("main.rs"))
            .await
            .unwrap();
        let task = handle.wait().await.unwrap();

        assert_eq!(task.status.state, TaskState::Completed);
        // History: prompt, clarification, follow-up, response — in order
        let texts: Vec<String> = task.history.iter().map(Message::text_content).collect();
        assert_eq!(
            texts,
            vec!["fix the bug", "which file?", "main.rs", "patched main.rs"]
        );
    }

    #[tokio::test]
    async fn test_follow_up_in_history_before_new_events() {
        let adapter = MockAdapter::new("a", &["code"])
            .with_results(vec![
                ExecutionResult {
                    content: "clarify?".to_string(),
                    structured: None,
                    needs_input: true,
                },
                ExecutionResult::text("done"),
            ])
            .with_delay(Duration::from_millis(50));
        let manager = manager_with(vec![adapter]);

        let handle = manager
            .create_and_run(Message::user_text("go"), RouteRequirements::any())
            .await;
        let task = handle.wait().await.unwrap();

        let handle = manager
            .continue_task(&task.id, Message::user_text("here"))
            .await
            .unwrap();
        // Immediately after continue_task returns, the follow-up is already
        // the last history entry even though execution may not have started.
        let snapshot = manager.get(&task.id).await.unwrap();
        assert_eq!(snapshot.history.last().unwrap().text_content(), "here");
        assert_eq!(snapshot.status.state, TaskState::Working);

        let task = handle.wait().await.unwrap();
        assert_eq!(task.status.state, TaskState::Completed);
    }

    #[tokio::test]
    async fn test_continue_task_invalid_state() {
        let manager = manager_with(vec![MockAdapter::new("a", &["code"])]);

        let handle = manager
            .create_and_run(Message::user_text("x"), RouteRequirements::any())
            .await;
        let task = handle.wait().await.unwrap();
        assert_eq!(task.status.state, TaskState::Completed);

        let err = manager
            .continue_task(&task.id, Message::user_text("more"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTaskState {
                state: TaskState::Completed,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_deadline_exceeded_fails_task() {
        let adapter = MockAdapter::new("slow", &["code"]).with_delay(Duration::from_millis(500));
        let manager = manager_with_config(
            vec![adapter],
            ManagerConfig {
                event_capacity: 16,
                execution_deadline: Some(Duration::from_millis(50)),
            },
        );

        let handle = manager
            .create_and_run(Message::user_text("x"), RouteRequirements::any())
            .await;
        let task = handle.wait().await.unwrap();

        assert_eq!(task.status.state, TaskState::Failed);
        assert_eq!(task.error.as_ref().unwrap().kind, "deadline-exceeded");
    }

    #[tokio::test]
    async fn test_get_unknown_task() {
        let manager = manager_with(vec![MockAdapter::new("a", &["code"])]);
        let err = manager.get("nope").await.unwrap_err();
        assert!(matches!(err, Error::TaskNotFound(id) if id == "nope"));

        let err = manager.cancel("nope").await.unwrap_err();
        assert!(matches!(err, Error::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn test_failed_state_is_stable_across_gets() {
        let manager = manager_with(vec![MockAdapter::failing("a", &["code"], "broken")]);

        let handle = manager
            .create_and_run(Message::user_text("x"), RouteRequirements::any())
            .await;
        let first = handle.wait().await.unwrap();
        let second = manager.get(&first.id).await.unwrap();

        assert_eq!(first.status.state, TaskState::Failed);
        assert_eq!(second.status.state, TaskState::Failed);
        assert_eq!(
            first.error.as_ref().unwrap().message,
            second.error.as_ref().unwrap().message
        );
    }

    #[tokio::test]
    async fn test_cleanup_finished_evicts_terminal_tasks() {
        let manager = manager_with(vec![MockAdapter::new("a", &["code"])]);

        let done = manager
            .create_and_run(Message::user_text("x"), RouteRequirements::any())
            .await
            .wait()
            .await
            .unwrap();
        assert_eq!(manager.len(), 1);

        // Zero max-age: everything finished is eligible
        let removed = manager.cleanup_finished(Duration::ZERO).await;
        assert_eq!(removed, 1);
        assert!(manager.is_empty());
        assert!(matches!(
            manager.get(&done.id).await.unwrap_err(),
            Error::TaskNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_cleanup_spares_running_tasks() {
        let adapter = MockAdapter::new("slow", &["code"]).with_delay(Duration::from_millis(300));
        let manager = manager_with(vec![adapter]);

        let handle = manager
            .create_and_run(Message::user_text("x"), RouteRequirements::any())
            .await;
        let removed = manager.cleanup_finished(Duration::ZERO).await;
        assert_eq!(removed, 0);
        assert_eq!(manager.len(), 1);

        let _ = handle.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_list_filters_by_state() {
        let manager = manager_with(vec![MockAdapter::new("a", &["code"])]);

        let done = manager
            .create_and_run(Message::user_text("one"), RouteRequirements::any())
            .await
            .wait()
            .await
            .unwrap();
        let failed = manager
            .create_and_run(Message::user_text("two"), RouteRequirements::tags(["zz"]))
            .await
            .wait()
            .await
            .unwrap();

        let completed = manager.list(Some(TaskState::Completed), 10).await;
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, done.id);

        let failures = manager.list(Some(TaskState::Failed), 10).await;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].id, failed.id);

        assert_eq!(manager.list(None, 10).await.len(), 2);
        assert_eq!(manager.list(None, 1).await.len(), 1);
    }
}
