//! Matches an on-chain transaction to a pending invoice.
//!
//! A payment is accepted when the transaction executed successfully, its logs
//! contain the invoice memo, and the receiving address gained at least the
//! tier price. The memo check is a substring search over all log lines joined
//! with spaces: a memo that happens to appear inside some other log text also
//! matches. Clients depend on this exact behaviour, so it is kept as is.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::oracle::{ChainOracle, ChainTransaction};
use crate::bunker::Invoice;
use crate::config::BunkerConfig;
use crate::types::lamports_to_sol;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VerificationError {
    #[error("Tx not found")]
    TxNotFound,

    #[error("Tx failed")]
    TxExecutionFailed,

    #[error("Memo mismatch")]
    MemoMismatch,

    #[error("Receiving address not in tx")]
    AddressNotInvolved,

    #[error("Malformed tx: {0}")]
    MalformedTransaction(String),

    #[error("Amount low: {} < {}", lamports_to_sol(*.delta), lamports_to_sol(*.required as i128))]
    InsufficientAmount { delta: i128, required: u64 },

    #[error("Chain query failed: {0}")]
    Oracle(String),

    #[error("Chain query timed out after {0:?}")]
    Timeout(Duration),
}

/// Proof that a transaction paid for an invoice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub signature: String,
    pub delta_lamports: i128,
    pub required_lamports: u64,
}

pub struct PaymentVerifier {
    oracle: Arc<dyn ChainOracle>,
    receiving_address: String,
    pricing: BunkerConfig,
    timeout: Duration,
}

impl PaymentVerifier {
    pub fn new(
        oracle: Arc<dyn ChainOracle>,
        receiving_address: impl Into<String>,
        pricing: BunkerConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            oracle,
            receiving_address: receiving_address.into(),
            pricing,
            timeout,
        }
    }

    pub fn receiving_address(&self) -> &str {
        &self.receiving_address
    }

    /// Query the chain for `signature` and check it against `invoice`.
    /// Read-only; never retries.
    pub async fn verify(
        &self,
        invoice: &Invoice,
        signature: &str,
    ) -> Result<PaymentReceipt, VerificationError> {
        let lookup = tokio::time::timeout(self.timeout, self.oracle.get_transaction(signature));

        let tx = match lookup.await {
            Err(_) => {
                warn!(signature, "Chain query timed out");
                return Err(VerificationError::Timeout(self.timeout));
            }
            Ok(Err(e)) => {
                warn!(signature, error = %e, "Chain query failed");
                return Err(VerificationError::Oracle(e.to_string()));
            }
            Ok(Ok(None)) => return Err(VerificationError::TxNotFound),
            Ok(Ok(Some(tx))) => tx,
        };

        let required = self.pricing.price_lamports(invoice.tier);
        let delta = check_transaction(&tx, &invoice.memo, &self.receiving_address, required)?;

        info!(
            memo = %invoice.memo,
            signature,
            paid_sol = lamports_to_sol(delta),
            "Payment verified"
        );

        Ok(PaymentReceipt {
            signature: signature.to_string(),
            delta_lamports: delta,
            required_lamports: required,
        })
    }
}

/// Validate a fetched transaction. Returns the lamport delta credited to
/// `receiving_address`.
pub fn check_transaction(
    tx: &ChainTransaction,
    memo: &str,
    receiving_address: &str,
    required_lamports: u64,
) -> Result<i128, VerificationError> {
    if tx.failed {
        return Err(VerificationError::TxExecutionFailed);
    }

    let logs = tx.log_messages.join(" ");
    if !logs.contains(memo) {
        return Err(VerificationError::MemoMismatch);
    }

    let index = tx
        .account_keys
        .iter()
        .position(|key| key == receiving_address)
        .ok_or(VerificationError::AddressNotInvolved)?;

    let (pre, post) = match (tx.pre_balances.get(index), tx.post_balances.get(index)) {
        (Some(pre), Some(post)) => (*pre, *post),
        _ => {
            return Err(VerificationError::MalformedTransaction(format!(
                "no balance entry for account index {}",
                index
            )))
        }
    };

    let delta = post as i128 - pre as i128;
    if delta < required_lamports as i128 {
        return Err(VerificationError::InsufficientAmount {
            delta,
            required: required_lamports,
        });
    }

    Ok(delta)
}
