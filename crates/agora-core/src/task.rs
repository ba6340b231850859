//! Task lifecycle entity and state machine.
//!
//! A task moves through a fixed set of states; the transition table below
//! is the single source of truth and every mutation goes through
//! [`Task::transition`]. Terminal tasks are frozen: any further transition
//! fails and leaves the task untouched.

use crate::error::{Error, Result};
use crate::message::{generate_id, Artifact, Message};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    /// Accepted, not yet routed to an agent
    Submitted,
    /// An agent is executing the task
    Working,
    /// The agent asked for a follow-up message
    InputRequired,
    /// Finished successfully (terminal)
    Completed,
    /// Finished with an error (terminal)
    Failed,
    /// Canceled by the caller (terminal)
    Canceled,
}

impl TaskState {
    /// Whether a transition from `self` to `target` is allowed.
    #[must_use]
    pub fn can_transition_to(self, target: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, target),
            (Submitted, Working)
                | (Submitted, Failed)
                | (Submitted, Canceled)
                | (Working, Completed)
                | (Working, Failed)
                | (Working, InputRequired)
                | (Working, Canceled)
                | (InputRequired, Working)
                | (InputRequired, Canceled)
        )
    }

    /// Whether this state admits no further transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Canceled
        )
    }

    /// Wire name of the state.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Submitted => "submitted",
            TaskState::Working => "working",
            TaskState::InputRequired => "input-required",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current state of a task plus the message that caused it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    /// Current state
    pub state: TaskState,
    /// Message associated with the transition into this state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// When the state was entered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl TaskStatus {
    fn now(state: TaskState, message: Option<Message>) -> Self {
        Self {
            state,
            message,
            timestamp: Some(Utc::now()),
        }
    }
}

/// Normalized failure payload, present only on failed tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    /// Failure category, e.g. `"execution"` or `"deadline-exceeded"`
    pub kind: String,
    /// Human-readable description
    pub message: String,
}

impl ErrorDetail {
    /// Create a new error detail.
    #[must_use]
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

fn task_kind() -> String {
    "task".to_string()
}

/// The fundamental unit of work tracked by the manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task identifier
    pub id: String,
    /// Conversation context identifier
    pub context_id: String,
    /// Current status
    pub status: TaskStatus,
    /// Message history, append-only
    pub history: Vec<Message>,
    /// Artifacts emitted during execution, in order
    pub artifacts: Vec<Artifact>,
    /// Failure detail; set only when the task is failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    /// Id of the agent the task was routed to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    /// Discriminator, always `"task"`
    #[serde(default = "task_kind")]
    pub kind: String,
}

impl Task {
    /// Create a new task in the submitted state from its originating message.
    ///
    /// The message's `context_id` is reused when present so conversations
    /// can span tasks; otherwise a fresh context is allocated.
    #[must_use]
    pub fn new(mut message: Message) -> Self {
        let id = generate_id();
        let context_id = message
            .context_id
            .clone()
            .unwrap_or_else(generate_id);
        message.task_id = Some(id.clone());
        message.context_id = Some(context_id.clone());
        Self {
            id,
            context_id,
            status: TaskStatus::now(TaskState::Submitted, None),
            history: vec![message],
            artifacts: Vec::new(),
            error: None,
            agent_id: None,
            kind: task_kind(),
        }
    }

    /// Apply a state transition.
    ///
    /// When a message accompanies the transition it is appended to the
    /// history and recorded on the new status. Fails with
    /// [`Error::InvalidTransition`] without touching the task when the
    /// transition is not in the table.
    pub fn transition(
        &mut self,
        target: TaskState,
        message: Option<Message>,
    ) -> Result<TaskStatus> {
        if !self.status.state.can_transition_to(target) {
            return Err(Error::InvalidTransition {
                from: self.status.state,
                to: target,
            });
        }
        if let Some(msg) = &message {
            self.history.push(msg.clone());
        }
        self.status = TaskStatus::now(target, message);
        Ok(self.status.clone())
    }

    /// Transition to failed, recording the normalized error detail.
    pub fn fail(&mut self, detail: ErrorDetail) -> Result<TaskStatus> {
        let message = Message::agent_text(format!("Error: {}", detail.message))
            .with_task(self.id.clone(), self.context_id.clone());
        let status = self.transition(TaskState::Failed, Some(message))?;
        self.error = Some(detail);
        Ok(status)
    }

    /// Whether the task is in a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.state.is_terminal()
    }

    /// Text of the most recent user message, used as the execution prompt.
    #[must_use]
    pub fn latest_prompt(&self) -> String {
        self.history
            .iter()
            .rev()
            .find(|m| m.role == crate::message::Role::User)
            .map(Message::text_content)
            .unwrap_or_default()
    }

    /// History preceding the most recent user message, used as context.
    #[must_use]
    pub fn context_messages(&self) -> Vec<Message> {
        let last_user = self
            .history
            .iter()
            .rposition(|m| m.role == crate::message::Role::User);
        match last_user {
            Some(idx) => self.history[..idx].to_vec(),
            None => self.history.clone(),
        }
    }
}
