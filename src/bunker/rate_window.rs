// Per-agent sliding-window admission

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Soft cap on how many invoice and confirmation calls one agent may make
/// inside a rolling window. Not persisted; resets with the process.
#[derive(Clone)]
pub struct AgentRateLimiter {
    inner: Arc<RwLock<HashMap<String, Vec<i64>>>>,
    max_calls: usize,
    window_secs: i64,
}

impl AgentRateLimiter {
    pub fn new(max_calls: usize, window_secs: i64) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            max_calls,
            window_secs,
        }
    }

    /// Prune timestamps that fell out of the window, then admit and record
    /// `now` if fewer than `max_calls` remain. A denied call is not recorded.
    pub async fn admit(&self, agent_id: &str, now: i64) -> bool {
        let mut guard = self.inner.write().await;
        let window = guard.entry(agent_id.to_string()).or_default();
        window.retain(|t| now - *t < self.window_secs);

        if window.len() >= self.max_calls {
            debug!(agent_id, calls = window.len(), "Agent rate window exhausted");
            return false;
        }

        window.push(now);
        true
    }

    /// Drop agents whose window is empty at `now`
    pub async fn prune_idle(&self, now: i64) -> usize {
        let mut guard = self.inner.write().await;
        let before = guard.len();
        guard.retain(|_, window| window.iter().any(|t| now - *t < self.window_secs));
        before - guard.len()
    }
}
