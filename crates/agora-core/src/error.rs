//! Error types for agora-core
//!
//! This module defines the core error type and its mapping to JSON-RPC
//! error codes used on the wire.

use crate::adapter::AdapterError;
use crate::task::TaskState;
use std::time::Duration;
use thiserror::Error;

/// JSON-RPC 2.0 and A2A error codes.
pub mod codes {
    /// Invalid JSON was received
    pub const PARSE_ERROR: i32 = -32700;
    /// The JSON sent is not a valid request object
    pub const INVALID_REQUEST: i32 = -32600;
    /// The method does not exist or is not available
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid method parameters
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error
    pub const INTERNAL_ERROR: i32 = -32603;
    /// The specified task was not found
    pub const TASK_NOT_FOUND: i32 = -32001;
    /// The task cannot be acted on in its current state
    pub const TASK_NOT_CANCELABLE: i32 = -32002;
}

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// An agent with the same id is already registered
    #[error("agent '{0}' already registered")]
    DuplicateAgent(String),

    /// No agent with the given id exists in the catalog
    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    /// No registered agent covers the requested skill tags
    #[error("no capable agent for skills [{0}]")]
    NoCapableAgent(String),

    /// Task id is not present in the registry
    #[error("task not found: {0}")]
    TaskNotFound(String),

    /// Operation requires a different task state
    #[error("task {id} is in state '{state}', expected '{expected}'")]
    InvalidTaskState {
        /// Task identifier
        id: String,
        /// State the task is actually in
        state: TaskState,
        /// State the operation requires
        expected: TaskState,
    },

    /// State machine rejected the transition
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state
        from: TaskState,
        /// Rejected target state
        to: TaskState,
    },

    /// Adapter-level failure
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// Configured execution deadline elapsed
    #[error("execution deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),
}

impl Error {
    /// JSON-RPC error code for this error.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Error::TaskNotFound(_) => codes::TASK_NOT_FOUND,
            Error::InvalidTaskState { .. } => codes::TASK_NOT_CANCELABLE,
            Error::InvalidTransition { .. } => codes::INVALID_REQUEST,
            Error::UnknownAgent(_) | Error::NoCapableAgent(_) => codes::INVALID_PARAMS,
            Error::DuplicateAgent(_) | Error::Adapter(_) | Error::DeadlineExceeded(_) => {
                codes::INTERNAL_ERROR
            }
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::TaskNotFound("t1".into()).code(), -32001);
        assert_eq!(
            Error::InvalidTaskState {
                id: "t1".into(),
                state: TaskState::Completed,
                expected: TaskState::InputRequired,
            }
            .code(),
            -32002
        );
        assert_eq!(
            Error::InvalidTransition {
                from: TaskState::Completed,
                to: TaskState::Working,
            }
            .code(),
            -32600
        );
        assert_eq!(Error::NoCapableAgent("translate".into()).code(), -32602);
        assert_eq!(Error::DuplicateAgent("a".into()).code(), -32603);
    }

    #[test]
    fn test_error_display() {
        let err = Error::UnknownAgent("gemini-cli".into());
        assert_eq!(err.to_string(), "unknown agent: gemini-cli");

        let err = Error::InvalidTransition {
            from: TaskState::Canceled,
            to: TaskState::Working,
        };
        assert!(err.to_string().contains("canceled -> working"));
    }
}
