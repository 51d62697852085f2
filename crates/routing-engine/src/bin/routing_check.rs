//! Offline inspection of routing decisions.
//!
//! Seeds an engine from a scenario dump and answers "which pool / which agent
//! would this URL get" without a running connection layer.
//!
//! ```text
//! routing-check --scenario seed.json resolve --org acme --url https://acme.com/docs/intro
//! routing-check --scenario seed.json select --org acme --url /pricing --exclude alice
//! RUST_LOG=debug routing-check --scenario seed.json --config engine.json stats
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use engage_routing::scenario::RoutingScenario;
use engage_routing::{AgentId, EngineConfig, OrganizationId, RoutingEngine};

/// Inspect routing decisions for a seeded engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scenario JSON (organization configs and agents)
    #[arg(short, long)]
    scenario: PathBuf,

    /// Engine configuration JSON; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the pool a page URL resolves to
    Resolve {
        #[arg(long)]
        org: String,
        #[arg(long)]
        url: String,
    },

    /// Print the agent the scheduler would pick for a page URL
    Select {
        #[arg(long)]
        org: String,
        #[arg(long)]
        url: String,
        /// Agent to leave out, as after a rejection
        #[arg(long)]
        exclude: Option<String>,
    },

    /// Print engine statistics as JSON
    Stats,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("loading engine config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let scenario = RoutingScenario::from_json_file(&args.scenario)
        .with_context(|| format!("loading scenario {}", args.scenario.display()))?;

    let engine = RoutingEngine::new(config)?;
    scenario.apply(&engine)?;
    info!("🔍 Engine seeded from {}", args.scenario.display());

    match args.command {
        Command::Resolve { org, url } => {
            let org = OrganizationId::from(org);
            scenario.require_organization(&org)?;
            match engine.resolve_pool(&org, &url) {
                Some(pool) => println!("{}", pool),
                None => println!("(no pool)"),
            }
        }
        Command::Select { org, url, exclude } => {
            let org = OrganizationId::from(org);
            scenario.require_organization(&org)?;
            let exclude = exclude.map(AgentId::from);
            match engine.select_agent_for_visitor(&org, &url, exclude.as_ref()) {
                Some(selection) => {
                    let pool = selection
                        .pool_id
                        .map(|p| p.to_string())
                        .unwrap_or_else(|| "(any)".to_string());
                    println!("{} via pool {}", selection.agent.agent_id, pool);
                }
                None => println!("(no agent available)"),
            }
        }
        Command::Stats => {
            println!("{}", serde_json::to_string_pretty(&engine.stats())?);
        }
    }

    Ok(())
}
