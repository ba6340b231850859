//! CLI module for Agora
//!
//! Commands:
//! - `serve`: start the A2A server (default)
//! - `agents`: list configured agents and their availability
//! - `card`: print the agent card as JSON

use crate::config::AppConfig;
use crate::server::{self, card::AgentCard};
use agora_adapters::build_adapter;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Agora A2A gateway CLI
#[derive(Parser, Debug)]
#[command(name = "agora")]
#[command(about = "Expose AI command-line tools as A2A protocol agents")]
#[command(version)]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the A2A server (default)
    Serve {
        /// Bind host override
        #[arg(long)]
        host: Option<String>,
        /// Bind port override
        #[arg(long)]
        port: Option<u16>,
        /// Comma-separated adapters to register
        #[arg(long, value_delimiter = ',')]
        agents: Option<Vec<String>>,
    },
    /// List configured agents and their availability
    Agents,
    /// Print the agent card as JSON
    Card,
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Serve { host, port, agents }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(agents) = agents {
                config.agents.enabled = agents;
            }
            server::run(config).await
        }
        Some(Commands::Agents) => agents_command(&config).await,
        Some(Commands::Card) => card_command(&config).await,
        None => server::run(config).await,
    }
}

async fn agents_command(config: &AppConfig) -> anyhow::Result<()> {
    let settings = server::adapter_settings(config);
    for name in &config.agents.enabled {
        match build_adapter(name, &settings) {
            Ok(adapter) => {
                let status = if adapter.health_check().await {
                    "available"
                } else {
                    "unavailable"
                };
                println!("{:<12} {:<20} {}", adapter.name(), adapter.display_name(), status);
            }
            Err(err) => println!("{:<12} {}", name, err),
        }
    }
    Ok(())
}

async fn card_command(config: &AppConfig) -> anyhow::Result<()> {
    let catalog = server::build_catalog(config).await?;
    let card = AgentCard::from_catalog(&catalog, config);
    println!("{}", serde_json::to_string_pretty(&card)?);
    Ok(())
}
