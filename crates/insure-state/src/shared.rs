//! The Shared State module (§3/§5): exclusive owner of `UnifiedPool`, the
//! `BridgeHealth` list, and the latest `RiskSnapshot`. Each field has
//! exactly one writer — the monitoring loop (or purchase/claims path) that
//! produces it — and many concurrent readers.

use insure_core::{BridgeHealth, RiskSnapshot, UnifiedPool};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::StateResult;

/// The process-wide shared state handle. Cheap to clone: every field is an
/// `Arc<RwLock<_>>`, so clones share the same underlying storage.
#[derive(Clone)]
pub struct SharedState {
    pool: Arc<RwLock<UnifiedPool>>,
    bridges: Arc<RwLock<HashMap<String, BridgeHealth>>>,
    risk_snapshot: Arc<RwLock<Option<RiskSnapshot>>>,
}

impl SharedState {
    pub fn new(pool: UnifiedPool) -> Self {
        Self {
            pool: Arc::new(RwLock::new(pool)),
            bridges: Arc::new(RwLock::new(HashMap::new())),
            risk_snapshot: Arc::new(RwLock::new(None)),
        }
    }

    /// Takes a consistent read-only snapshot of the pool for readers
    /// (monitoring loops, hedge orchestrator) that must not observe a
    /// partial write.
    pub async fn pool_snapshot(&self) -> UnifiedPool {
        self.pool.read().await.clone()
    }

    /// Runs `f` against the pool under exclusive access, checking
    /// invariants on exit. This is the only way callers mutate the pool —
    /// the claims monitor during payouts, and the (out-of-scope) purchase
    /// path when policies are added.
    pub async fn mutate_pool<F, T>(&self, f: F) -> StateResult<T>
    where
        F: FnOnce(&mut UnifiedPool) -> StateResult<T>,
    {
        let mut pool = self.pool.write().await;
        let result = f(&mut pool)?;
        pool.check_invariants()?;
        Ok(result)
    }

    /// Replaces the stored health record for one bridge. Single writer:
    /// the bridge-health monitoring loop.
    pub async fn set_bridge_health(&self, bridge: BridgeHealth) {
        self.bridges.write().await.insert(bridge.bridge_id.clone(), bridge);
    }

    pub async fn bridge_health(&self, bridge_id: &str) -> Option<BridgeHealth> {
        self.bridges.read().await.get(bridge_id).cloned()
    }

    pub async fn all_bridge_health(&self) -> Vec<BridgeHealth> {
        self.bridges.read().await.values().cloned().collect()
    }

    /// A copy of the previous-state map, handed to the bridge-monitor
    /// collaborator as `previous_state_map` (§4.3).
    pub async fn bridge_state_map(&self) -> HashMap<String, BridgeHealth> {
        self.bridges.read().await.clone()
    }

    /// Single writer: the risk-snapshot monitoring loop.
    pub async fn set_risk_snapshot(&self, snapshot: RiskSnapshot) {
        *self.risk_snapshot.write().await = Some(snapshot);
    }

    pub async fn risk_snapshot(&self) -> Option<RiskSnapshot> {
        self.risk_snapshot.read().await.clone()
    }
}
