//! Per-task event stream payloads.
//!
//! Every state transition and every streamed artifact chunk becomes one
//! event. Subscribers receive independent, ordered copies; a status update
//! flagged `final` is always the last event of a task.

use crate::message::Artifact;
use crate::task::TaskStatus;
use serde::{Deserialize, Serialize};

/// An event observed on a task's stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TaskEvent {
    /// The task entered a new state
    #[serde(rename = "status-update")]
    #[serde(rename_all = "camelCase")]
    StatusUpdate {
        /// Task identifier
        task_id: String,
        /// Context identifier
        context_id: String,
        /// The new status
        status: TaskStatus,
        /// Whether this is the last event for the task
        #[serde(rename = "final")]
        is_final: bool,
    },
    /// An artifact chunk was produced
    #[serde(rename = "artifact-update")]
    #[serde(rename_all = "camelCase")]
    ArtifactUpdate {
        /// Task identifier
        task_id: String,
        /// Context identifier
        context_id: String,
        /// The artifact chunk
        artifact: Artifact,
        /// Whether this chunk appends to a previously sent artifact
        append: bool,
        /// Whether this is the last chunk of the artifact
        last_chunk: bool,
    },
}

impl TaskEvent {
    /// Whether this event closes the task's stream.
    #[must_use]
    pub fn is_final(&self) -> bool {
        matches!(self, TaskEvent::StatusUpdate { is_final: true, .. })
    }

    /// Task id the event belongs to.
    #[must_use]
    pub fn task_id(&self) -> &str {
        match self {
            TaskEvent::StatusUpdate { task_id, .. } => task_id,
            TaskEvent::ArtifactUpdate { task_id, .. } => task_id,
        }
    }
}
