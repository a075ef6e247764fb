// In-process chain and vault doubles shared by the service and route tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{BunkerService, ManualClock};
use crate::config::BunkerConfig;
use crate::payment::{ChainOracle, ChainTransaction, OracleError, PaymentVerifier};
use crate::storage::{StorageError, StorageOracle, VaultStore};

pub const RECEIVER: &str = "B12jrAGAJD12sbLZSREKQbRXz64qDW6Lyj6nT9VdF969";
pub const T0: i64 = 1_700_000_000;

/// A successful transfer of `lamports` to `RECEIVER` carrying `memo`
pub fn payment_tx(memo: &str, lamports: u64) -> ChainTransaction {
    ChainTransaction {
        failed: false,
        log_messages: vec![
            "Program MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr invoke [1]".to_string(),
            format!("Program log: Memo (len {}): \"{}\"", memo.len(), memo),
        ],
        account_keys: vec!["PayerWallet".to_string(), RECEIVER.to_string()],
        pre_balances: vec![5_000_000_000, 1_000],
        post_balances: vec![5_000_000_000 - lamports - 5_000, 1_000 + lamports],
    }
}

#[derive(Default)]
pub struct ScriptedChain {
    transactions: Mutex<HashMap<String, ChainTransaction>>,
    delay: Duration,
    lookups: AtomicUsize,
}

impl ScriptedChain {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn insert(&self, signature: &str, tx: ChainTransaction) {
        self.transactions
            .lock()
            .unwrap()
            .insert(signature.to_string(), tx);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainOracle for ScriptedChain {
    async fn get_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<ChainTransaction>, OracleError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.transactions.lock().unwrap().get(signature).cloned())
    }
}

/// Vault keeping `(message, content)` per path in memory. Like the contents
/// API without a `sha`, a put never replaces an existing file.
#[derive(Default)]
pub struct MemoryVault {
    objects: Mutex<HashMap<String, (String, String)>>,
    commits: AtomicUsize,
    failing: AtomicBool,
    delay: Duration,
}

impl MemoryVault {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        let vault = Self::default();
        vault.set_failing(true);
        vault
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn object(&self, path: &str) -> Option<(String, String)> {
        self.objects.lock().unwrap().get(path).cloned()
    }
}

#[async_trait]
impl StorageOracle for MemoryVault {
    async fn put(&self, path: &str, message: &str, content_b64: &str) -> Result<(), StorageError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Status {
                status: 409,
                body: "is at 3a0f86f but expected 1b2c3d4".to_string(),
            });
        }

        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(path) {
            return Err(StorageError::Status {
                status: 422,
                body: "Invalid request. \"sha\" wasn't supplied.".to_string(),
            });
        }
        objects.insert(
            path.to_string(),
            (message.to_string(), content_b64.to_string()),
        );
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<String, StorageError> {
        self.objects
            .lock()
            .unwrap()
            .get(path)
            .map(|(_, content)| content.clone())
            .ok_or(StorageError::NotFound)
    }
}

pub struct Harness {
    pub service: BunkerService,
    pub chain: Arc<ScriptedChain>,
    pub vault: Arc<MemoryVault>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_chain(ScriptedChain::default(), Duration::from_secs(5))
    }

    pub fn with_chain(chain: ScriptedChain, chain_timeout: Duration) -> Self {
        Self::build(chain, chain_timeout, MemoryVault::default(), Duration::from_secs(5))
    }

    pub fn with_vault(vault: MemoryVault, write_timeout: Duration) -> Self {
        Self::build(ScriptedChain::default(), Duration::from_secs(5), vault, write_timeout)
    }

    fn build(
        chain: ScriptedChain,
        chain_timeout: Duration,
        vault: MemoryVault,
        write_timeout: Duration,
    ) -> Self {
        let chain = Arc::new(chain);
        let vault = Arc::new(vault);
        let clock = Arc::new(ManualClock::new(T0));
        let settings = BunkerConfig::default();

        let verifier =
            PaymentVerifier::new(chain.clone(), RECEIVER, settings.clone(), chain_timeout);
        let store = VaultStore::new(vault.clone(), write_timeout, Duration::from_secs(5));
        let service = BunkerService::new(
            settings,
            verifier,
            store,
            clock.clone(),
            "https://solscan.io",
        );

        Self {
            service,
            chain,
            vault,
            clock,
        }
    }
}
