//! Request orchestration
//!
//! Per memo the lifecycle is `PENDING -> FULFILLED` or `PENDING -> EXPIRED`.
//! A confirmation reaches FULFILLED only when, in order, the agent's rate
//! window admits it, the chain shows a valid payment, and the vault commit
//! succeeds. Any failure releases the claim and leaves the invoice pending so
//! the client can retry until it expires.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{AgentRateLimiter, Clock, Invoice, InvoiceStore};
use crate::config::BunkerConfig;
use crate::models::{BunkeredResponse, InvoiceResponse, RetrieveResponse};
use crate::payment::PaymentVerifier;
use crate::storage::VaultStore;
use crate::types::{lamports_to_sol, AppError, AppResult, Tier};
use crate::utils::sanitize_agent_id;

#[derive(Clone)]
pub struct BunkerService {
    invoices: InvoiceStore,
    rate_limiter: AgentRateLimiter,
    verifier: Arc<PaymentVerifier>,
    vault: Arc<VaultStore>,
    clock: Arc<dyn Clock>,
    settings: BunkerConfig,
    explorer_url: String,
}

impl BunkerService {
    pub fn new(
        settings: BunkerConfig,
        verifier: PaymentVerifier,
        vault: VaultStore,
        clock: Arc<dyn Clock>,
        explorer_url: impl Into<String>,
    ) -> Self {
        Self {
            invoices: InvoiceStore::new(settings.invoice_ttl_secs),
            rate_limiter: AgentRateLimiter::new(
                settings.rate_limit_per_window,
                settings.rate_window_secs,
            ),
            verifier: Arc::new(verifier),
            vault: Arc::new(vault),
            clock,
            settings,
            explorer_url: explorer_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn receiving_address(&self) -> &str {
        self.verifier.receiving_address()
    }

    pub fn invoices(&self) -> &InvoiceStore {
        &self.invoices
    }

    pub async fn pending_count(&self) -> usize {
        self.invoices.len().await
    }

    /// Drop expired invoices and idle rate windows
    pub async fn sweep(&self) -> usize {
        let now = self.clock.now();
        let idle = self.rate_limiter.prune_idle(now).await;
        if idle > 0 {
            debug!(idle, "Pruned idle rate windows");
        }
        self.invoices.sweep_expired(now).await
    }

    /// Run `sweep` on a fixed period for the life of the process
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let service = self.clone();
        let every = every.max(Duration::from_secs(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let removed = service.sweep().await;
                if removed > 0 {
                    info!(removed, "Expired invoices swept");
                }
            }
        })
    }

    /// Issue an invoice for storing `memory` on behalf of `agent_id`.
    pub async fn create_invoice(
        &self,
        agent_id: &str,
        tier: &str,
        memory: String,
    ) -> AppResult<InvoiceResponse> {
        let now = self.clock.now();
        self.invoices.sweep_expired(now).await;

        let agent_id = sanitize_agent_id(agent_id);
        if agent_id.is_empty() {
            return Err(AppError::Validation("Invalid agent_id".to_string()));
        }
        let tier = Tier::from_id(tier)
            .ok_or_else(|| AppError::Validation(format!("Invalid tier: {:?}", tier)))?;
        if !self.rate_limiter.admit(&agent_id, now).await {
            return Err(AppError::Validation("Rate limit exceeded".to_string()));
        }

        // Wrapped encoder output is accepted; the vault gets one unbroken line.
        let memory: String = memory
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let decoded_len = BASE64
            .decode(memory.as_bytes())
            .map_err(|_| AppError::Validation("Invalid base64 memory".to_string()))?
            .len();
        if decoded_len > self.settings.max_payload_bytes {
            return Err(AppError::Validation(format!(
                "Payload exceeds {} bytes",
                self.settings.max_payload_bytes
            )));
        }

        let invoice = self.invoices.create(&agent_id, tier, memory, now).await?;
        let amount = lamports_to_sol(self.settings.price_lamports(tier) as i128);

        Ok(InvoiceResponse {
            status: "invoice".to_string(),
            address: self.receiving_address().to_string(),
            amount,
            payment_url: format!(
                "{}/account/{}?amount={}&memo={}",
                self.explorer_url,
                self.receiving_address(),
                amount,
                invoice.memo
            ),
            confirm_path: format!("/confirm/{}", invoice.memo),
            memo: invoice.memo,
            expires_at: invoice.expires_at,
        })
    }

    /// Verify `tx_hash` against the invoice for `memo` and, if it paid,
    /// commit the payload to the vault.
    pub async fn confirm_payment(&self, memo: &str, tx_hash: &str) -> AppResult<BunkeredResponse> {
        let now = self.clock.now();
        self.invoices.sweep_expired(now).await;

        let invoice = self.invoices.claim(memo, now).await.map_err(|e| {
            debug!(memo, reason = %e, "Confirmation refused");
            AppError::from(e)
        })?;

        match self.fulfill(&invoice, tx_hash, now).await {
            Ok(path) => {
                self.invoices.remove(memo).await;
                info!(memo, path = %path, tx = tx_hash, "Bunkered");

                let filename = path.rsplit('/').next().unwrap_or_default();
                Ok(BunkeredResponse {
                    status: "bunkered".to_string(),
                    retrieve_path: format!("/retrieve/{}/{}", invoice.agent_id, filename),
                    path,
                    tx: tx_hash.to_string(),
                })
            }
            Err(e) => {
                self.invoices.release(memo).await;
                warn!(memo, tx = tx_hash, error = %e, "Confirmation failed; invoice still pending");
                Err(e)
            }
        }
    }

    async fn fulfill(&self, invoice: &Invoice, tx_hash: &str, now: i64) -> AppResult<String> {
        if !self.rate_limiter.admit(&invoice.agent_id, now).await {
            return Err(AppError::RateLimited);
        }

        self.verifier.verify(invoice, tx_hash).await?;

        self.vault
            .commit(invoice)
            .await
            .map_err(|e| AppError::StorageWrite(e.to_string()))
    }

    /// Fetch a bunkered payload. Every storage failure reads as not found.
    pub async fn retrieve(&self, agent_id: &str, filename: &str) -> AppResult<RetrieveResponse> {
        self.invoices.sweep_expired(self.clock.now()).await;

        match self.vault.read(agent_id, filename).await {
            Ok(memory) => Ok(RetrieveResponse { memory }),
            Err(e) => {
                warn!(agent_id, filename, error = %e, "Retrieve failed");
                Err(AppError::NotFound)
            }
        }
    }
}
