//! Agent catalog: registration and discovery.
//!
//! The catalog owns the set of known agents. Descriptors are immutable
//! once registered; reads are concurrent and registration takes a short
//! exclusive section. Enumeration preserves registration order.

use crate::adapter::Adapter;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

/// Capability declaration for an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    /// Unique skill identifier
    pub id: String,
    /// Human-readable skill name
    pub name: String,
    /// What the skill does
    pub description: String,
    /// Tags used for capability matching
    #[serde(default)]
    pub tags: Vec<String>,
    /// Example prompts for this skill
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<String>>,
}

impl Skill {
    /// Create a skill with the given id, name, description and tags.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        tags: &[&str],
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
            examples: None,
        }
    }

    /// Attach example prompts.
    #[must_use]
    pub fn with_examples(mut self, examples: &[&str]) -> Self {
        self.examples = Some(examples.iter().map(|e| (*e).to_string()).collect());
        self
    }
}

/// A registered agent: identity, capabilities, and its adapter handle.
#[derive(Clone)]
pub struct AgentDescriptor {
    /// Stable agent identifier
    pub id: String,
    /// Human-readable name
    pub display_name: String,
    /// What the agent does
    pub description: String,
    /// Declared skills, in order
    pub skills: Vec<Skill>,
    /// Whether the agent's adapter implements the streaming contract
    pub supports_streaming: bool,
    /// The adapter used to execute tasks routed to this agent
    pub adapter: Arc<dyn Adapter>,
    tags: BTreeSet<String>,
}

impl AgentDescriptor {
    /// Build a descriptor from an adapter's self-description.
    #[must_use]
    pub fn from_adapter(adapter: Arc<dyn Adapter>) -> Self {
        let skills = adapter.skills();
        let tags = skills
            .iter()
            .flat_map(|s| s.tags.iter().cloned())
            .collect();
        Self {
            id: adapter.name().to_string(),
            display_name: adapter.display_name(),
            description: adapter.description(),
            supports_streaming: adapter.supports_streaming(),
            skills,
            adapter,
            tags,
        }
    }

    /// All skill tags declared by this agent.
    #[must_use]
    pub fn skill_tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Whether the agent's tags cover every requested tag.
    #[must_use]
    pub fn covers(&self, requested: &BTreeSet<String>) -> bool {
        requested.iter().all(|t| self.tags.contains(t))
    }
}

impl std::fmt::Debug for AgentDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentDescriptor")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("skills", &self.skills.len())
            .field("supports_streaming", &self.supports_streaming)
            .finish()
    }
}

#[derive(Default)]
struct Inner {
    agents: HashMap<String, Arc<AgentDescriptor>>,
    order: Vec<Arc<AgentDescriptor>>,
}

/// Catalog of registered agents.
///
/// Populated at startup from the configured adapters, read-mostly after
/// that. Safe for concurrent reads.
#[derive(Default)]
pub struct Catalog {
    inner: RwLock<Inner>,
}

impl Catalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent.
    ///
    /// Fails with [`Error::DuplicateAgent`] if the id is already taken.
    pub fn register(&self, descriptor: AgentDescriptor) -> Result<Arc<AgentDescriptor>> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if inner.agents.contains_key(&descriptor.id) {
            return Err(Error::DuplicateAgent(descriptor.id));
        }
        let descriptor = Arc::new(descriptor);
        inner
            .agents
            .insert(descriptor.id.clone(), Arc::clone(&descriptor));
        inner.order.push(Arc::clone(&descriptor));
        tracing::debug!(agent = %descriptor.id, "Registered agent");
        Ok(descriptor)
    }

    /// Look up an agent by id.
    ///
    /// Fails with [`Error::UnknownAgent`] if absent.
    pub fn get(&self, id: &str) -> Result<Arc<AgentDescriptor>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner
            .agents
            .get(id)
            .cloned()
            .ok_or_else(|| Error::UnknownAgent(id.to_string()))
    }

    /// All descriptors, in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<Arc<AgentDescriptor>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.order.clone()
    }

    /// Number of registered agents.
    #[must_use]
    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.order.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
