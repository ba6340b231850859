//! Skill-based agent selection.
//!
//! The router filters the catalog down to agents whose skill tags cover
//! the requested set, then applies a tie-break strategy. The round-robin
//! cursor is a process-wide atomic so concurrent selections never skip or
//! double-count an agent.

use crate::catalog::{AgentDescriptor, Catalog};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Tie-break strategy applied among capable agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Pick the earliest-registered capable agent (default)
    #[default]
    FirstRegistered,
    /// Rotate through capable agents
    RoundRobin,
}

/// What a task asks of the agent that will run it.
#[derive(Debug, Clone, Default)]
pub struct RouteRequirements {
    /// Requested skill tags; empty means any agent qualifies
    pub tags: BTreeSet<String>,
    /// Explicit agent pin, bypassing tie-break but not the tag check
    pub agent: Option<String>,
}

impl RouteRequirements {
    /// Requirements matching any agent.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Requirements for the given skill tags.
    #[must_use]
    pub fn tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            agent: None,
        }
    }

    /// Pin selection to a specific agent id.
    #[must_use]
    pub fn pinned(agent: impl Into<String>) -> Self {
        Self {
            tags: BTreeSet::new(),
            agent: Some(agent.into()),
        }
    }
}

/// Selects one agent from the catalog for each task.
pub struct Router {
    catalog: Arc<Catalog>,
    strategy: TieBreak,
    cursor: AtomicUsize,
}

impl Router {
    /// Create a router over the given catalog.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, strategy: TieBreak) -> Self {
        Self {
            catalog,
            strategy,
            cursor: AtomicUsize::new(0),
        }
    }

    /// The catalog this router selects from.
    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Select an agent satisfying the requirements.
    ///
    /// Fails with [`Error::NoCapableAgent`] when no registered agent covers
    /// the requested tags, and with [`Error::UnknownAgent`] when a pinned
    /// agent does not exist.
    pub fn select(&self, requirements: &RouteRequirements) -> Result<Arc<AgentDescriptor>> {
        if let Some(id) = &requirements.agent {
            let agent = self.catalog.get(id)?;
            if !agent.covers(&requirements.tags) {
                return Err(Error::NoCapableAgent(join_tags(&requirements.tags)));
            }
            debug!(agent = %agent.id, "Routed task to pinned agent");
            return Ok(agent);
        }

        let capable: Vec<_> = self
            .catalog
            .list()
            .into_iter()
            .filter(|a| a.covers(&requirements.tags))
            .collect();

        if capable.is_empty() {
            return Err(Error::NoCapableAgent(join_tags(&requirements.tags)));
        }

        let selected = match self.strategy {
            TieBreak::FirstRegistered => Arc::clone(&capable[0]),
            TieBreak::RoundRobin => {
                let index = self.cursor.fetch_add(1, Ordering::Relaxed) % capable.len();
                Arc::clone(&capable[index])
            }
        };
        debug!(
            agent = %selected.id,
            strategy = ?self.strategy,
            candidates = capable.len(),
            "Routed task"
        );
        Ok(selected)
    }
}

fn join_tags(tags: &BTreeSet<String>) -> String {
    tags.iter().cloned().collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AgentDescriptor;
    use crate::test_support::MockAdapter;

    fn catalog_with(agents: &[(&str, &[&str])]) -> Arc<Catalog> {
        let catalog = Arc::new(Catalog::new());
        for (id, tags) in agents {
            catalog
                .register(AgentDescriptor::from_adapter(Arc::new(MockAdapter::new(
                    id, tags,
                ))))
                .unwrap();
        }
        catalog
    }

    #[test]
    fn test_skill_match_selects_capable_agent() {
        let catalog = catalog_with(&[("a", &["code"]), ("b", &["search"])]);
        let router = Router::new(catalog, TieBreak::FirstRegistered);

        let agent = router.select(&RouteRequirements::tags(["code"])).unwrap();
        assert_eq!(agent.id, "a");

        let agent = router.select(&RouteRequirements::tags(["search"])).unwrap();
        assert_eq!(agent.id, "b");
    }

    #[test]
    fn test_no_capable_agent() {
        let catalog = catalog_with(&[("a", &["code"]), ("b", &["search"])]);
        let router = Router::new(catalog, TieBreak::FirstRegistered);

        let err = router
            .select(&RouteRequirements::tags(["translate"]))
            .unwrap_err();
        assert!(matches!(err, Error::NoCapableAgent(tags) if tags == "translate"));
    }

    #[test]
    fn test_empty_tags_match_any_agent() {
        let catalog = catalog_with(&[("a", &["code"]), ("b", &["search"])]);
        let router = Router::new(catalog, TieBreak::FirstRegistered);

        let agent = router.select(&RouteRequirements::any()).unwrap();
        assert_eq!(agent.id, "a");
    }

    #[test]
    fn test_superset_required() {
        let catalog = catalog_with(&[("a", &["code"]), ("b", &["code", "review"])]);
        let router = Router::new(catalog, TieBreak::FirstRegistered);

        let agent = router
            .select(&RouteRequirements::tags(["code", "review"]))
            .unwrap();
        assert_eq!(agent.id, "b");
    }

    #[test]
    fn test_round_robin_visits_each_agent_once() {
        let catalog = catalog_with(&[("a", &["code"]), ("b", &["code"]), ("c", &["code"])]);
        let router = Router::new(catalog, TieBreak::RoundRobin);

        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(router.select(&RouteRequirements::tags(["code"])).unwrap().id.clone());
        }
        seen.sort();
        assert_eq!(seen, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_round_robin_wraps() {
        let catalog = catalog_with(&[("a", &["code"]), ("b", &["code"])]);
        let router = Router::new(catalog, TieBreak::RoundRobin);

        let first = router.select(&RouteRequirements::any()).unwrap().id.clone();
        let second = router.select(&RouteRequirements::any()).unwrap().id.clone();
        let third = router.select(&RouteRequirements::any()).unwrap().id.clone();
        assert_ne!(first, second);
        assert_eq!(first, third);
    }

    #[test]
    fn test_first_registered_is_deterministic() {
        let catalog = catalog_with(&[("a", &["code"]), ("b", &["code"])]);
        let router = Router::new(catalog, TieBreak::FirstRegistered);

        for _ in 0..5 {
            let agent = router.select(&RouteRequirements::tags(["code"])).unwrap();
            assert_eq!(agent.id, "a");
        }
    }

    #[test]
    fn test_pinned_agent() {
        let catalog = catalog_with(&[("a", &["code"]), ("b", &["code"])]);
        let router = Router::new(catalog, TieBreak::FirstRegistered);

        let agent = router.select(&RouteRequirements::pinned("b")).unwrap();
        assert_eq!(agent.id, "b");
    }

    #[test]
    fn test_pinned_agent_must_cover_tags() {
        let catalog = catalog_with(&[("a", &["code"]), ("b", &["search"])]);
        let router = Router::new(catalog, TieBreak::FirstRegistered);

        let mut req = RouteRequirements::pinned("b");
        req.tags.insert("code".to_string());
        let err = router.select(&req).unwrap_err();
        assert!(matches!(err, Error::NoCapableAgent(_)));
    }

    #[test]
    fn test_pinned_unknown_agent() {
        let catalog = catalog_with(&[("a", &["code"])]);
        let router = Router::new(catalog, TieBreak::FirstRegistered);

        let err = router.select(&RouteRequirements::pinned("zz")).unwrap_err();
        assert!(matches!(err, Error::UnknownAgent(id) if id == "zz"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_round_robin_concurrent_selections_balanced() {
        let catalog = catalog_with(&[("a", &["code"]), ("b", &["code"])]);
        let router = Arc::new(Router::new(catalog, TieBreak::RoundRobin));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let router = Arc::clone(&router);
            handles.push(tokio::spawn(async move {
                router
                    .select(&RouteRequirements::tags(["code"]))
                    .unwrap()
                    .id
                    .clone()
            }));
        }

        let mut counts = std::collections::HashMap::new();
        for handle in handles {
            *counts.entry(handle.await.unwrap()).or_insert(0usize) += 1;
        }
        // Cursor is atomic: 10 selections over 2 agents split exactly 5/5
        assert_eq!(counts.get("a"), Some(&5));
        assert_eq!(counts.get("b"), Some(&5));
    }
}
