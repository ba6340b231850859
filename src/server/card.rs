//! Agent card discovery document.
//!
//! The card is the read-only capability document served at
//! `/.well-known/agent.json`: provider identity, protocol version,
//! capability flags, the aggregated skill list, and one summary per
//! registered agent.

use crate::config::AppConfig;
use agora_core::{Catalog, Skill};
use serde::Serialize;

/// A2A protocol version advertised by the server.
const PROTOCOL_VERSION: &str = "0.3.0";

/// Self-describing agent manifest.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    pub url: String,
    pub version: String,
    pub protocol_version: String,
    pub capabilities: AgentCapabilities,
    pub skills: Vec<Skill>,
    pub agents: Vec<AgentSummary>,
    pub provider: AgentProvider,
    pub default_input_modes: Vec<String>,
    pub default_output_modes: Vec<String>,
}

/// Capability flags.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    pub streaming: bool,
    pub push_notifications: bool,
    pub state_transition_history: bool,
}

/// One registered agent as listed on the card.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub streaming: bool,
    pub skills: Vec<String>,
}

/// Provider identity.
#[derive(Debug, Clone, Serialize)]
pub struct AgentProvider {
    pub organization: String,
    pub url: String,
}

impl AgentCard {
    /// Build the card from the catalog contents.
    ///
    /// Skills are aggregated across agents, first occurrence of each skill
    /// id wins; the streaming flag is set when any agent streams.
    pub fn from_catalog(catalog: &Catalog, config: &AppConfig) -> Self {
        let descriptors = catalog.list();

        let mut skills: Vec<Skill> = Vec::new();
        for descriptor in &descriptors {
            for skill in &descriptor.skills {
                if !skills.iter().any(|s| s.id == skill.id) {
                    skills.push(skill.clone());
                }
            }
        }

        let agents = descriptors
            .iter()
            .map(|d| AgentSummary {
                id: d.id.clone(),
                name: d.display_name.clone(),
                description: d.description.clone(),
                streaming: d.supports_streaming,
                skills: d.skills.iter().map(|s| s.id.clone()).collect(),
            })
            .collect();

        Self {
            name: format!("{} A2A Gateway", config.provider.name),
            description: "Exposes heterogeneous AI command-line tools as interoperable \
                          agents under the A2A protocol."
                .to_string(),
            url: format!("{}/a2a", config.base_url()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: AgentCapabilities {
                streaming: descriptors.iter().any(|d| d.supports_streaming),
                push_notifications: false,
                state_transition_history: true,
            },
            skills,
            agents,
            provider: AgentProvider {
                organization: config.provider.name.clone(),
                url: config.provider.url.clone(),
            },
            default_input_modes: vec!["text/plain".to_string()],
            default_output_modes: vec!["text/plain".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::{
        Adapter, AdapterResult, AgentDescriptor, ExecutionResult, Message,
    };
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FakeAdapter {
        name: &'static str,
        streaming: bool,
        skills: Vec<Skill>,
    }

    #[async_trait]
    impl Adapter for FakeAdapter {
        fn name(&self) -> &str {
            self.name
        }
        fn display_name(&self) -> String {
            self.name.to_uppercase()
        }
        fn description(&self) -> String {
            "fake".to_string()
        }
        fn skills(&self) -> Vec<Skill> {
            self.skills.clone()
        }
        fn supports_streaming(&self) -> bool {
            self.streaming
        }
        async fn health_check(&self) -> bool {
            true
        }
        async fn execute(
            &self,
            _prompt: &str,
            _context: &[Message],
        ) -> AdapterResult<ExecutionResult> {
            Ok(ExecutionResult::text("ok"))
        }
    }

    fn catalog() -> Catalog {
        let catalog = Catalog::new();
        catalog
            .register(AgentDescriptor::from_adapter(Arc::new(FakeAdapter {
                name: "alpha",
                streaming: true,
                skills: vec![Skill::new("code", "Code", "writes code", &["coding"])],
            })))
            .unwrap();
        catalog
            .register(AgentDescriptor::from_adapter(Arc::new(FakeAdapter {
                name: "beta",
                streaming: false,
                skills: vec![
                    Skill::new("code", "Code", "writes code", &["coding"]),
                    Skill::new("search", "Search", "finds things", &["search"]),
                ],
            })))
            .unwrap();
        catalog
    }

    #[test]
    fn test_card_aggregates_skills() {
        let card = AgentCard::from_catalog(&catalog(), &AppConfig::default());
        // "code" deduplicated across agents
        let ids: Vec<_> = card.skills.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["code", "search"]);
        assert_eq!(card.agents.len(), 2);
        assert!(card.capabilities.streaming);
        assert_eq!(card.protocol_version, "0.3.0");
    }

    #[test]
    fn test_card_url_from_config() {
        let card = AgentCard::from_catalog(&catalog(), &AppConfig::default());
        assert_eq!(card.url, "http://127.0.0.1:8484/a2a");
    }

    #[test]
    fn test_card_serializes_camel_case() {
        let card = AgentCard::from_catalog(&catalog(), &AppConfig::default());
        let json = serde_json::to_string(&card).unwrap();
        assert!(json.contains("\"protocolVersion\""));
        assert!(json.contains("\"defaultInputModes\""));
        assert!(json.contains("\"pushNotifications\":false"));
    }
}
