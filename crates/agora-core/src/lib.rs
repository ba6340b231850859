//! Agora Core - Task Orchestration Engine
//!
//! This crate provides the task orchestration core for the Agora agent
//! gateway:
//! - Task: lifecycle entity with an enforced state machine
//! - Manager: concurrent task execution, event fan-out, cancellation
//! - Router: skill-based agent selection with configurable tie-break
//! - Catalog: registration and discovery of agents
//! - Adapter: the capability contract concrete tool wrappers implement

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod catalog;
pub mod error;
pub mod event;
pub mod manager;
pub mod message;
pub mod router;
pub mod task;

#[cfg(test)]
pub(crate) mod test_support;

pub use adapter::{
    context_prompt, full_prompt, Adapter, AdapterError, AdapterResult, ChunkStream,
    ExecutionResult, StreamChunk,
};
pub use catalog::{AgentDescriptor, Catalog, Skill};
pub use error::{codes, Error, Result};
pub use event::TaskEvent;
pub use manager::{ManagerConfig, TaskHandle, TaskManager};
pub use message::{Artifact, FileContent, Message, Part, Role};
pub use router::{RouteRequirements, Router, TieBreak};
pub use task::{ErrorDetail, Task, TaskState, TaskStatus};
