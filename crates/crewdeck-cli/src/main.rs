mod crews;

use anyhow::Context;
use clap::{Parser, Subcommand};
use crewdeck_engine::{engine_from_config, EngineConfig};
use crewdeck_events::EventBus;
use crewdeck_gateway::GatewayServer;
use crewdeck_orchestrator::Orchestrator;
use crewdeck_store::{FileStore, MemoryStore};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "crewdeck", about = "Crewdeck — crew execution orchestrator")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "crewdeck.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run one crew definition to completion and print its output
    Run {
        /// Path to a crew definition file
        crew: PathBuf,
        /// Input passed to the run
        #[arg(long)]
        input: Option<String>,
    },
}

#[derive(Deserialize)]
struct CrewdeckConfig {
    #[serde(default = "default_data_dir")]
    data_dir: PathBuf,
    #[serde(default = "default_crew_dir")]
    crew_dir: PathBuf,
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    engine: EngineConfig,
}

impl Default for CrewdeckConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            crew_dir: default_crew_dir(),
            server: ServerConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

#[derive(Deserialize)]
struct ServerConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_crew_dir() -> PathBuf {
    PathBuf::from("./crews")
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config).await?;

    match cli.command {
        Commands::Serve { host, port } => serve(config, host, port).await,
        Commands::Run { crew, input } => run_once(config, &crew, input).await,
    }
}

async fn load_config(path: &Path) -> anyhow::Result<CrewdeckConfig> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => {
            toml::from_str(&raw).with_context(|| format!("Invalid config file '{}'", path.display()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(config = %path.display(), "Config file not found, using defaults");
            Ok(CrewdeckConfig::default())
        }
        Err(e) => {
            Err(e).with_context(|| format!("Failed to read config file '{}'", path.display()))
        }
    }
}

async fn serve(
    config: CrewdeckConfig,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let host = host.unwrap_or(config.server.host);
    let port = port.unwrap_or(config.server.port);

    let store = Arc::new(FileStore::new(&config.data_dir).await?);
    let crews = crews::load_crew_dir(store.as_ref(), &config.crew_dir).await?;
    info!(
        count = crews.len(),
        dir = %config.crew_dir.display(),
        "Crews loaded"
    );

    let engine = engine_from_config(&config.engine);
    let bus = Arc::new(EventBus::new());
    let orchestrator = Arc::new(Orchestrator::new(store, engine, bus.clone()));
    let app = GatewayServer::build(orchestrator, bus);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Crewdeck gateway listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn run_once(
    config: CrewdeckConfig,
    crew_path: &Path,
    input: Option<String>,
) -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::new());
    let crew = crews::load_crew(store.as_ref(), crew_path).await?;

    let engine = engine_from_config(&config.engine);
    let bus = Arc::new(EventBus::new());
    let orchestrator = Orchestrator::new(store, engine, bus);

    match orchestrator.execute(crew.id, None, input).await {
        Ok(execution) => {
            if let Some(output) = &execution.output {
                println!("{output}");
            }
            for metric in orchestrator.metrics(execution.id).await? {
                eprintln!(
                    "tokens: {}  time: {}ms  cost: ${:.2}",
                    metric.token_usage, metric.execution_time_ms, metric.cost
                );
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Execution failed: {e}");
            std::process::exit(1);
        }
    }
}
