use async_trait::async_trait;

/// What the verifier needs to know about one on-chain transaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainTransaction {
    /// Execution failed, or the node returned no status metadata
    pub failed: bool,
    pub log_messages: Vec<String>,
    /// Static keys followed by any addresses loaded from lookup tables
    pub account_keys: Vec<String>,
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("RPC request failed: {0}")]
    Request(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Failed to parse RPC response: {0}")]
    Parse(String),
}

/// Read-only view of the ledger
#[async_trait]
pub trait ChainOracle: Send + Sync {
    /// `Ok(None)` when the node does not know the signature (yet)
    async fn get_transaction(&self, signature: &str)
        -> Result<Option<ChainTransaction>, OracleError>;
}
