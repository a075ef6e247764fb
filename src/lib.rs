// Agent Bunkers - payment-gated memory storage for autonomous agents

pub mod bunker;
pub mod config;
pub mod middleware;
pub mod models;
pub mod payment;
pub mod routes;
pub mod storage;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

use std::sync::Arc;

use bunker::{BunkerService, SystemClock};
use payment::{PaymentVerifier, SolanaRpcClient};
use storage::{GitHubContents, VaultStore};

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}

impl AppState {
    /// Wire the production chain and vault adapters from configuration
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let chain = SolanaRpcClient::new(
            &config.chain.rpc_url,
            &config.chain.commitment,
            config.chain.timeout(),
        )?;
        let verifier = PaymentVerifier::new(
            Arc::new(chain),
            config.chain.receiving_address.clone(),
            config.bunker.clone(),
            config.chain.timeout(),
        );

        let github = GitHubContents::new(
            &config.vault.api_url,
            &config.vault.repo,
            config.vault.token.clone(),
        );
        let vault = VaultStore::new(
            Arc::new(github),
            config.vault.write_timeout(),
            config.vault.read_timeout(),
        );

        let bunkers = BunkerService::new(
            config.bunker.clone(),
            verifier,
            vault,
            Arc::new(SystemClock),
            config.chain.explorer_url.clone(),
        );

        Ok(Self { config, bunkers })
    }
}
