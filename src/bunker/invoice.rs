//! Pending invoice registry
//!
//! Every invoice is keyed by its memo and lives here until it is either
//! fulfilled (removed after the vault commit) or swept once `expires_at`
//! passes. Confirmation takes an exclusive claim on the memo first, so at
//! most one confirmation per invoice can be verifying or committing at any
//! time, and the sweeper leaves claimed invoices alone.
//!
//! The vault path is derived from the agent and the creation second only, so
//! the store issues at most one invoice per agent per second across tiers.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::types::{AppError, AppResult, Tier};

/// A pending payment request
#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    pub memo: String,
    pub agent_id: String,
    pub tier: Tier,
    /// Base64 payload as submitted, line breaks removed
    pub payload: Arc<str>,
    pub created_at: i64,
    pub expires_at: i64,
}

impl Invoice {
    pub fn memo_for(agent_id: &str, tier: Tier, created_at: i64) -> String {
        format!("{}:{}:{}", agent_id, tier, created_at)
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}

/// Why a confirmation could not take an invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ClaimError {
    #[error("invoice not found or expired")]
    NotFound,
    #[error("invoice is being confirmed")]
    Busy,
}

impl From<ClaimError> for AppError {
    fn from(err: ClaimError) -> Self {
        match err {
            ClaimError::NotFound => AppError::InvoiceNotFound,
            ClaimError::Busy => AppError::InvoiceBusy,
        }
    }
}

#[derive(Debug)]
struct Slot {
    invoice: Invoice,
    claimed: bool,
}

#[derive(Debug, Default)]
struct Registry {
    slots: HashMap<String, Slot>,
    /// Most recent creation second per agent
    last_issued: HashMap<String, i64>,
}

#[derive(Clone)]
pub struct InvoiceStore {
    inner: Arc<RwLock<Registry>>,
    ttl_secs: i64,
}

impl InvoiceStore {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Registry::default())),
            ttl_secs,
        }
    }

    /// Remove every unclaimed invoice with `expires_at <= now`.
    /// Returns how many were removed.
    pub async fn sweep_expired(&self, now: i64) -> usize {
        let mut guard = self.inner.write().await;
        let before = guard.slots.len();
        guard
            .slots
            .retain(|_, slot| slot.claimed || !slot.invoice.is_expired(now));
        guard.last_issued.retain(|_, issued| *issued >= now);
        let removed = before - guard.slots.len();
        if removed > 0 {
            debug!(removed, "Swept expired invoices");
        }
        removed
    }

    /// Register a new invoice created at `now`.
    ///
    /// Memo and vault path only have one-second resolution, so a second
    /// invoice for the same agent inside that second is rejected whatever its
    /// tier, pending or already fulfilled.
    pub async fn create(
        &self,
        agent_id: &str,
        tier: Tier,
        payload: String,
        now: i64,
    ) -> AppResult<Invoice> {
        let memo = Invoice::memo_for(agent_id, tier, now);
        let invoice = Invoice {
            memo: memo.clone(),
            agent_id: agent_id.to_string(),
            tier,
            payload: Arc::from(payload),
            created_at: now,
            expires_at: now + self.ttl_secs,
        };

        let mut guard = self.inner.write().await;
        if guard.last_issued.get(agent_id) == Some(&now) {
            return Err(AppError::Validation(
                "An invoice for this agent was issued this second; retry shortly".to_string(),
            ));
        }
        guard.last_issued.insert(agent_id.to_string(), now);
        guard.slots.insert(
            memo.clone(),
            Slot {
                invoice: invoice.clone(),
                claimed: false,
            },
        );

        info!(memo = %memo, tier = %tier, "Invoice issued");
        Ok(invoice)
    }

    /// Look up a live invoice. Expired entries are never returned, even if
    /// the sweeper has not removed them yet.
    pub async fn get(&self, memo: &str, now: i64) -> Option<Invoice> {
        let guard = self.inner.read().await;
        guard
            .slots
            .get(memo)
            .filter(|slot| !slot.invoice.is_expired(now))
            .map(|slot| slot.invoice.clone())
    }

    /// Take the exclusive confirmation claim on a live invoice.
    pub async fn claim(&self, memo: &str, now: i64) -> Result<Invoice, ClaimError> {
        let mut guard = self.inner.write().await;
        match guard.slots.get(memo) {
            None => return Err(ClaimError::NotFound),
            Some(slot) if slot.claimed => return Err(ClaimError::Busy),
            Some(slot) if slot.invoice.is_expired(now) => {
                guard.slots.remove(memo);
                return Err(ClaimError::NotFound);
            }
            Some(_) => {}
        }

        let slot = guard.slots.get_mut(memo).ok_or(ClaimError::NotFound)?;
        slot.claimed = true;
        Ok(slot.invoice.clone())
    }

    /// Give the claim back after a failed confirmation; the invoice stays
    /// pending until it expires.
    pub async fn release(&self, memo: &str) {
        let mut guard = self.inner.write().await;
        if let Some(slot) = guard.slots.get_mut(memo) {
            slot.claimed = false;
        }
    }

    /// Delete a fulfilled invoice
    pub async fn remove(&self, memo: &str) -> Option<Invoice> {
        let mut guard = self.inner.write().await;
        guard.slots.remove(memo).map(|slot| slot.invoice)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.slots.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.slots.is_empty()
    }
}
