//! A2A wire model: messages, parts, and artifacts.
//!
//! Messages are the unit of communication between callers and agents.
//! Each message has a role and an ordered list of content parts; artifacts
//! are the outputs produced while a task executes. All types serialize in
//! the camelCase form the protocol expects.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate a unique identifier.
pub(crate) fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

fn message_kind() -> String {
    "message".to_string()
}

/// Role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The caller
    User,
    /// The responding agent
    Agent,
}

/// File content, either inline bytes or a URI reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileContent {
    /// File referenced by URI
    Uri {
        /// URI pointing to the file
        uri: String,
        /// MIME type of the file
        #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
        /// Original filename
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// File content as base64-encoded bytes
    Bytes {
        /// Base64-encoded content
        bytes: String,
        /// MIME type of the file
        #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
        /// Original filename
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

/// One content part of a message or artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    /// Plain text
    Text {
        /// The text content
        text: String,
        /// Optional metadata
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<serde_json::Value>,
    },
    /// Structured data payload
    Data {
        /// The data payload
        data: serde_json::Value,
        /// Optional metadata
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<serde_json::Value>,
    },
    /// File content or reference
    File {
        /// File content or URI
        file: FileContent,
        /// Optional metadata
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<serde_json::Value>,
    },
}

impl Part {
    /// Create a text part.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text {
            text: text.into(),
            metadata: None,
        }
    }

    /// Create a structured data part.
    #[must_use]
    pub fn data(data: serde_json::Value) -> Self {
        Part::Data {
            data,
            metadata: None,
        }
    }

    /// Text content of this part, if it is a text part.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// A protocol message: a role plus an ordered list of parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message identifier
    #[serde(default = "generate_id")]
    pub message_id: String,
    /// Role of the sender
    pub role: Role,
    /// Content parts, in order
    pub parts: Vec<Part>,
    /// Conversation context identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    /// Associated task identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Discriminator, always `"message"`
    #[serde(default = "message_kind")]
    pub kind: String,
}

impl Message {
    /// Create a user message with a single text part.
    #[must_use]
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::text(Role::User, text)
    }

    /// Create an agent message with a single text part.
    #[must_use]
    pub fn agent_text(text: impl Into<String>) -> Self {
        Self::text(Role::Agent, text)
    }

    fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            message_id: generate_id(),
            role,
            parts: vec![Part::text(text)],
            context_id: None,
            task_id: None,
            kind: message_kind(),
        }
    }

    /// Attach task and context identifiers.
    #[must_use]
    pub fn with_task(mut self, task_id: impl Into<String>, context_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self.context_id = Some(context_id.into());
        self
    }

    /// Concatenated text content of all text parts.
    #[must_use]
    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// An output produced while a task executes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Unique artifact identifier
    #[serde(default = "generate_id")]
    pub artifact_id: String,
    /// Content parts, in order
    pub parts: Vec<Part>,
    /// Artifact name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whether the artifact is complete (no more parts will be appended)
    #[serde(default)]
    pub last_chunk: bool,
}

impl Artifact {
    /// Create an empty artifact with the given id and name.
    #[must_use]
    pub fn new(artifact_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            artifact_id: artifact_id.into(),
            parts: Vec::new(),
            name: Some(name.into()),
            last_chunk: false,
        }
    }

    /// Concatenated text content of all text parts.
    #[must_use]
    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<String>()
    }
}
