//! HTTP server wiring.
//!
//! Builds the catalog from the configured adapters, constructs the router
//! and task manager, and exposes the protocol surface:
//! - `POST /a2a` — JSON-RPC 2.0 (message/send, tasks/get, tasks/cancel)
//! - `POST /a2a/stream` — message/stream over SSE
//! - `GET /.well-known/agent.json` — agent card discovery
//! - `GET /health` — server and per-agent status

pub mod card;
pub mod rpc;
pub mod stream;

use crate::config::AppConfig;
use agora_adapters::{build_adapter, AdapterSettings, OllamaConfig};
use agora_core::{
    AgentDescriptor, Catalog, ManagerConfig, Router as AgentRouter, TaskManager,
};
use anyhow::{Context, Result};
use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use card::AgentCard;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<TaskManager>,
    pub catalog: Arc<Catalog>,
    pub card: AgentCard,
}

/// Adapter factory settings derived from the app config.
pub fn adapter_settings(config: &AppConfig) -> AdapterSettings {
    AdapterSettings {
        timeout_secs: config.agents.timeout_secs,
        ollama: OllamaConfig {
            base_url: config.agents.ollama.host.clone(),
            model: config.agents.ollama.model.clone(),
            timeout_secs: config.agents.timeout_secs,
        },
    }
}

/// Build the catalog from the configured adapter names.
///
/// Adapters whose tool is not installed are still registered (they fail at
/// execution time with a normalized error); unknown names are skipped with
/// a warning so one typo does not take the server down.
pub async fn build_catalog(config: &AppConfig) -> Result<Arc<Catalog>> {
    let settings = adapter_settings(config);
    let catalog = Arc::new(Catalog::new());
    for name in &config.agents.enabled {
        match build_adapter(name, &settings) {
            Ok(adapter) => {
                if !adapter.health_check().await {
                    warn!(agent = %adapter.name(), "Agent tool unavailable; registering anyway");
                }
                let descriptor = AgentDescriptor::from_adapter(adapter);
                let id = descriptor.id.clone();
                catalog
                    .register(descriptor)
                    .with_context(|| format!("Failed to register agent '{}'", id))?;
                info!(agent = %id, "Agent registered");
            }
            Err(err) => warn!(agent = %name, error = %err, "Skipping unknown adapter"),
        }
    }
    anyhow::ensure!(!catalog.is_empty(), "no agents could be registered");
    Ok(catalog)
}

/// Assemble the application state from configuration.
pub async fn build_state(config: &AppConfig) -> Result<AppState> {
    let catalog = build_catalog(config).await?;
    let router = AgentRouter::new(Arc::clone(&catalog), config.routing.tie_break);
    let manager = Arc::new(TaskManager::with_config(
        router,
        ManagerConfig {
            execution_deadline: config.routing.deadline(),
            ..ManagerConfig::default()
        },
    ));
    let card = AgentCard::from_catalog(&catalog, config);
    Ok(AppState {
        manager,
        catalog,
        card,
    })
}

/// Run the server until shutdown.
pub async fn run(config: AppConfig) -> Result<()> {
    let state = build_state(&config).await?;

    // Periodic eviction of finished tasks; unbounded retention would leak
    // under sustained load.
    let sweeper = {
        let manager = Arc::clone(&state.manager);
        let ttl = Duration::from_secs(config.retention.ttl_secs);
        let interval = Duration::from_secs(config.retention.sweep_interval_secs.max(1));
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            tick.tick().await; // first tick fires immediately, skip it
            loop {
                tick.tick().await;
                manager.cleanup_finished(ttl).await;
            }
        })
    };

    let app = routes(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "Agora listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    sweeper.abort();
    Ok(())
}

/// Build the protocol routes.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/.well-known/agent.json", get(agent_card))
        .route("/a2a", post(rpc::handle_http))
        .route("/a2a/stream", post(stream::handle_http))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to install Ctrl+C handler");
        return;
    }
    info!("Shutdown signal received");
}

#[derive(Debug, Serialize)]
struct RootResponse {
    name: &'static str,
    version: &'static str,
    protocol: &'static str,
    agent_card: &'static str,
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        name: "Agora A2A Server",
        version: env!("CARGO_PKG_VERSION"),
        protocol: "A2A v0.3",
        agent_card: "/.well-known/agent.json",
    })
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    agents: Vec<AgentHealth>,
    tasks: usize,
}

#[derive(Debug, Serialize)]
struct AgentHealth {
    id: String,
    available: bool,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut agents = Vec::new();
    for descriptor in state.catalog.list() {
        agents.push(AgentHealth {
            id: descriptor.id.clone(),
            available: descriptor.adapter.health_check().await,
        });
    }
    let status = if agents.iter().any(|a| a.available) {
        "healthy"
    } else {
        "degraded"
    };
    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        agents,
        tasks: state.manager.len(),
    })
}

async fn agent_card(State(state): State<AppState>) -> Json<AgentCard> {
    Json(state.card.clone())
}
