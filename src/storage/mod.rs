//! Vault storage
//!
//! Fulfilled memories are committed to a path-addressed store (a GitHub
//! repository in production) at `{agent_id}/{YYYY-MM-DD_HHMMSS}.json`.
//! Payloads stay base64 encoded end to end.

pub mod github;

pub use github::GitHubContents;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::bunker::Invoice;
use crate::utils::sanitize_agent_id;

/// Timestamp layout used for vault file names (UTC)
pub const VAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H%M%S";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage request failed: {0}")]
    Request(String),

    #[error("Storage returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Object not found")]
    NotFound,

    #[error("Failed to parse storage response: {0}")]
    Parse(String),

    #[error("Invalid vault path: {0}")]
    InvalidPath(String),

    #[error("Storage call timed out after {0:?}")]
    Timeout(Duration),
}

/// Path-addressed object store with commit messages
#[async_trait]
pub trait StorageOracle: Send + Sync {
    async fn put(&self, path: &str, message: &str, content_b64: &str) -> Result<(), StorageError>;

    async fn get(&self, path: &str) -> Result<String, StorageError>;
}

/// Vault file name for an invoice created at `created_at`
pub fn vault_filename(created_at: i64) -> Option<String> {
    chrono::DateTime::from_timestamp(created_at, 0)
        .map(|ts| format!("{}.json", ts.format(VAULT_TIMESTAMP_FORMAT)))
}

/// Only plain file names are accepted on the read side.
fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.contains("..")
        && filename
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

pub struct VaultStore {
    oracle: Arc<dyn StorageOracle>,
    write_timeout: Duration,
    read_timeout: Duration,
}

impl VaultStore {
    pub fn new(oracle: Arc<dyn StorageOracle>, write_timeout: Duration, read_timeout: Duration) -> Self {
        Self {
            oracle,
            write_timeout,
            read_timeout,
        }
    }

    /// Write a paid-for payload. Returns the vault path.
    pub async fn commit(&self, invoice: &Invoice) -> Result<String, StorageError> {
        let filename = vault_filename(invoice.created_at).ok_or_else(|| {
            StorageError::InvalidPath(format!("timestamp {} out of range", invoice.created_at))
        })?;
        let path = format!("{}/{}", invoice.agent_id, filename);
        let message = format!("Bunker {}: {}", invoice.tier, invoice.agent_id);

        let write = self.oracle.put(&path, &message, &invoice.payload);
        match tokio::time::timeout(self.write_timeout, write).await {
            Ok(Ok(())) => {
                info!(path = %path, "Committed payload to vault");
                Ok(path)
            }
            Ok(Err(e)) => {
                warn!(path = %path, error = %e, "Vault commit failed");
                Err(e)
            }
            Err(_) => {
                warn!(path = %path, "Vault commit timed out");
                Err(StorageError::Timeout(self.write_timeout))
            }
        }
    }

    /// Read a payload back. `agent_id` is sanitized exactly as at creation.
    pub async fn read(&self, agent_id: &str, filename: &str) -> Result<String, StorageError> {
        let agent_id = sanitize_agent_id(agent_id);
        if agent_id.is_empty() || !is_safe_filename(filename) {
            return Err(StorageError::InvalidPath(format!("{}/{}", agent_id, filename)));
        }
        let path = format!("{}/{}", agent_id, filename);

        match tokio::time::timeout(self.read_timeout, self.oracle.get(&path)).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::Timeout(self.read_timeout)),
        }
    }
}
