//! Abstract contracts for the external collaborators the core consumes
//! (§6). Concrete implementations (oracle feeds, bridge scanners, venue
//! APIs) live outside this workspace's scope; `insure-monitor` and
//! `insure-hedge` hold the adapters that implement these traits.

use async_trait::async_trait;
use insure_core::{BridgeHealth, RiskSnapshot, UnifiedPool};
use std::collections::HashMap;

use crate::error::StateResult;

/// `fetch_prices(assets) → map<asset, float>`; timeout ≤ 10s; may return
/// partials (a missing key means that asset's price was unavailable this
/// call, not an error).
#[async_trait]
pub trait OracleAdapter: Send + Sync {
    async fn fetch_prices(&self, assets: &[String]) -> StateResult<HashMap<String, f64>>;
}

/// `monitor_all(previous_state_map) → list<BridgeHealth>`.
#[async_trait]
pub trait BridgeMonitor: Send + Sync {
    async fn monitor_all(&self, previous: &HashMap<String, BridgeHealth>) -> StateResult<Vec<BridgeHealth>>;
}

/// `calculate_snapshot(pool_view) → RiskSnapshot`.
#[async_trait]
pub trait RiskMonitor: Send + Sync {
    async fn calculate_snapshot(&self, pool: &UnifiedPool) -> StateResult<RiskSnapshot>;
}

/// One tranche's utilization and yield, as returned by
/// `get_all_utilizations()`.
#[derive(Debug, Clone)]
pub struct TrancheUtilization {
    pub tranche_id: String,
    pub apy: f64,
    pub utilization: f64,
    pub total_capital: insure_core::Cents,
    pub coverage_sold: insure_core::Cents,
    pub last_updated: i64,
}

#[async_trait]
pub trait UtilizationTracker: Send + Sync {
    async fn get_all_utilizations(&self) -> StateResult<Vec<TrancheUtilization>>;
    async fn get_available_capacity(&self, tranche_id: &str) -> StateResult<insure_core::Cents>;
}

/// `get_pool() → UnifiedPool`, plus mutators for capital/coverage that
/// enforce §3 invariants atomically. `insure-state::SharedState` is the
/// in-process implementation of this contract; a persistence-backed
/// implementation could swap in without changing callers.
#[async_trait]
pub trait PoolRepository: Send + Sync {
    async fn get_pool(&self) -> StateResult<UnifiedPool>;
    async fn reserve_payout(&self, policy_id: u64, payout: insure_core::Cents, now: i64) -> StateResult<()>;
    async fn expire_policy(&self, policy_id: u64) -> StateResult<()>;
}

#[async_trait]
impl PoolRepository for crate::shared::SharedState {
    async fn get_pool(&self) -> StateResult<UnifiedPool> {
        Ok(self.pool_snapshot().await)
    }

    async fn reserve_payout(&self, policy_id: u64, payout: insure_core::Cents, now: i64) -> StateResult<()> {
        self.mutate_pool(|pool| pool.reserve_payout(policy_id, payout, now).map_err(Into::into))
            .await
    }

    async fn expire_policy(&self, policy_id: u64) -> StateResult<()> {
        self.mutate_pool(|pool| pool.expire_policy(policy_id).map_err(Into::into)).await
    }
}
