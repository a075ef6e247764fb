use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

use agent_bunkers::{config::Config, create_router, utils::init_logger, AppState};

/// Payment-gated memory bunker for autonomous agents
#[derive(Parser, Debug)]
#[command(name = "agent-bunkers", version, about)]
struct Args {
    /// Address to bind (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides PORT)
    #[arg(long, short)]
    port: Option<u16>,

    /// Load environment variables from this file instead of ./.env
    #[arg(long, env = "BUNKER_ENV_FILE")]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logger();

    // Load configuration
    let mut config = match &args.env_file {
        Some(path) => {
            dotenvy::from_path(path)?;
            Config::from_current_env()?
        }
        None => Config::from_env()?,
    };
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    info!("Configuration loaded: {:?}", config.server);
    if config.vault.token.is_none() {
        warn!("GITHUB_TOKEN not set - vault commits will be rejected by GitHub");
    }

    // Create shared state
    let state = AppState::from_config(config.clone())?;
    info!(
        address = %state.bunkers.receiving_address(),
        rpc = %config.chain.rpc_url,
        vault = %config.vault.repo,
        "Bunker service ready"
    );

    // Expire stale invoices now and then periodically
    state.bunkers.sweep().await;
    let sweeper = state
        .bunkers
        .spawn_sweeper(Duration::from_secs(config.bunker.sweep_interval_secs));

    // Create router
    let app = create_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    sweeper.abort();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
