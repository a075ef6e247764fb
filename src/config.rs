use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::types::Tier;

pub const DEFAULT_RECEIVING_ADDRESS: &str = "B12jrAGAJD12sbLZSREKQbRXz64qDW6Lyj6nT9VdF969";
pub const DEFAULT_SOLANA_RPC_URL: &str = "https://api.mainnet-beta.solana.com";
pub const DEFAULT_EXPLORER_URL: &str = "https://solscan.io";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_VAULT_REPO: &str = "battlecards/neptune-bunker-vault";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub chain: ChainConfig,
    pub vault: VaultConfig,
    pub bunker: BunkerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub public_url: Option<String>,
    pub cors_allowed_origins: Vec<String>,
    /// Global request budget enforced before any handler runs
    pub requests_per_second: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub receiving_address: String,
    /// Commitment level requested from the RPC node ("finalized" or "confirmed")
    pub commitment: String,
    pub explorer_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VaultConfig {
    pub api_url: String,
    /// "owner/name" of the repository holding bunkered memories
    pub repo: String,
    pub token: Option<String>,
    pub write_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BunkerConfig {
    pub standard_price_lamports: u64,
    pub vault_price_lamports: u64,
    pub invoice_ttl_secs: i64,
    pub max_payload_bytes: usize,
    pub rate_limit_per_window: usize,
    pub rate_window_secs: i64,
    pub sweep_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            host: "0.0.0.0".to_string(),
            public_url: None,
            cors_allowed_origins: vec!["*".to_string()],
            requests_per_second: 50,
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_SOLANA_RPC_URL.to_string(),
            receiving_address: DEFAULT_RECEIVING_ADDRESS.to_string(),
            commitment: "finalized".to_string(),
            explorer_url: DEFAULT_EXPLORER_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_GITHUB_API_URL.to_string(),
            repo: DEFAULT_VAULT_REPO.to_string(),
            token: None,
            write_timeout_secs: 30,
            read_timeout_secs: 10,
        }
    }
}

impl Default for BunkerConfig {
    fn default() -> Self {
        Self {
            standard_price_lamports: 10_000_000,
            vault_price_lamports: 50_000_000,
            invoice_ttl_secs: 600,
            max_payload_bytes: 1_000_000,
            rate_limit_per_window: 10,
            rate_window_secs: 3600,
            sweep_interval_secs: 60,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            chain: ChainConfig::default(),
            vault: VaultConfig::default(),
            bunker: BunkerConfig::default(),
        }
    }
}

impl ChainConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl VaultConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

impl BunkerConfig {
    /// Required payment for a tier, in lamports
    pub fn price_lamports(&self, tier: Tier) -> u64 {
        match tier {
            Tier::Standard => self.standard_price_lamports,
            Tier::Vault => self.vault_price_lamports,
        }
    }
}

/// Parse an environment variable, falling back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_current_env()
    }

    /// Build from the process environment without reading a `.env` file
    pub fn from_current_env() -> Result<Self> {
        let defaults = Config::default();

        Ok(Self {
            server: ServerConfig {
                port: env_or("PORT", defaults.server.port)?,
                host: env::var("HOST").unwrap_or(defaults.server.host),
                public_url: env::var("PUBLIC_URL").ok(),
                cors_allowed_origins: env::var("ALLOWED_ORIGINS")
                    .map(|origins| {
                        origins
                            .split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .unwrap_or(defaults.server.cors_allowed_origins),
                requests_per_second: env_or(
                    "REQUESTS_PER_SECOND",
                    defaults.server.requests_per_second,
                )?,
            },
            chain: ChainConfig {
                rpc_url: env::var("SOLANA_RPC_URL").unwrap_or(defaults.chain.rpc_url),
                receiving_address: env::var("RECEIVING_ADDRESS")
                    .unwrap_or(defaults.chain.receiving_address),
                commitment: env::var("SOLANA_COMMITMENT").unwrap_or(defaults.chain.commitment),
                explorer_url: env::var("EXPLORER_URL").unwrap_or(defaults.chain.explorer_url),
                timeout_secs: env_or("CHAIN_TIMEOUT_SECS", defaults.chain.timeout_secs)?,
            },
            vault: VaultConfig {
                api_url: env::var("GITHUB_API_URL").unwrap_or(defaults.vault.api_url),
                repo: env::var("VAULT_REPO").unwrap_or(defaults.vault.repo),
                token: env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
                write_timeout_secs: env_or(
                    "VAULT_WRITE_TIMEOUT_SECS",
                    defaults.vault.write_timeout_secs,
                )?,
                read_timeout_secs: env_or(
                    "VAULT_READ_TIMEOUT_SECS",
                    defaults.vault.read_timeout_secs,
                )?,
            },
            bunker: BunkerConfig {
                standard_price_lamports: env_or(
                    "STANDARD_PRICE_LAMPORTS",
                    defaults.bunker.standard_price_lamports,
                )?,
                vault_price_lamports: env_or(
                    "VAULT_PRICE_LAMPORTS",
                    defaults.bunker.vault_price_lamports,
                )?,
                invoice_ttl_secs: env_or("INVOICE_TTL_SECS", defaults.bunker.invoice_ttl_secs)?,
                max_payload_bytes: env_or(
                    "MAX_PAYLOAD_BYTES",
                    defaults.bunker.max_payload_bytes,
                )?,
                rate_limit_per_window: env_or(
                    "RATE_LIMIT_PER_WINDOW",
                    defaults.bunker.rate_limit_per_window,
                )?,
                rate_window_secs: env_or("RATE_WINDOW_SECS", defaults.bunker.rate_window_secs)?,
                sweep_interval_secs: env_or(
                    "SWEEP_INTERVAL_SECS",
                    defaults.bunker.sweep_interval_secs,
                )?,
            },
        })
    }
}
