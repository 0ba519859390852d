//! The claims monitor (§4.4): one cycle per `sample_interval_seconds`.
//!
//! Per-policy `TriggerState` lives in a `DashMap` for synchronous lookups
//! from the cycle loop, mirroring the dual-state shape the original
//! position tracker used a handle/actor split for — here there is only one
//! writer (the cycle itself), so a single concurrent map is enough without
//! a separate actor task.

use dashmap::DashMap;
use insure_core::{Cents, Policy, Price, TriggerState};
use insure_persistence::{PayoutRecord, PayoutWriter};
use insure_state::{OracleAdapter, PoolRepository};
use insure_telemetry::Metrics;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::ClaimsResult;

/// Configuration for one claims-monitor instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimsMonitorConfig {
    pub sample_interval_seconds: u64,
    /// §9: preserved even though the default of 1 makes the accumulator a
    /// no-op today, so the threshold can be raised later without a schema
    /// change.
    pub confirmation_samples_required: u32,
}

impl Default for ClaimsMonitorConfig {
    fn default() -> Self {
        Self {
            sample_interval_seconds: 60,
            confirmation_samples_required: 1,
        }
    }
}

/// Computes the piecewise-linear interpolated payout for one policy
/// (§4.4 step 5). Returns `(payout, interpolation_factor)`.
pub fn interpolate_payout(coverage_amount: Cents, trigger: Price, floor: Price, current: Price) -> (Cents, Decimal) {
    let trigger = trigger.inner();
    let floor = floor.inner();
    let current = current.inner();

    if current >= trigger {
        return (Cents::ZERO, Decimal::ZERO);
    }
    if current <= floor {
        return (coverage_amount, Decimal::ONE);
    }
    let factor = (trigger - current) / (trigger - floor);
    (coverage_amount.scale(factor), factor)
}

/// Runs the sample-trigger-payout cycle against a pool repository,
/// oracle adapter, and payout writer.
pub struct ClaimsMonitor<R, O> {
    repository: R,
    oracle: O,
    config: ClaimsMonitorConfig,
    trigger_states: DashMap<u64, TriggerState>,
    writer: Mutex<PayoutWriter>,
}

impl<R, O> ClaimsMonitor<R, O>
where
    R: PoolRepository,
    O: OracleAdapter,
{
    pub fn new(repository: R, oracle: O, config: ClaimsMonitorConfig, writer: PayoutWriter) -> Self {
        Self {
            repository,
            oracle,
            config,
            trigger_states: DashMap::new(),
            writer: Mutex::new(writer),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    fn asset_key(policy: &Policy) -> String {
        format!("{:?}", policy.product.stablecoin)
    }

    /// Runs one cycle. Payouts are processed sequentially (§4.4 ordering:
    /// "payouts within one cycle are processed sequentially so that
    /// capital reservation sees a serialized view of the pool").
    pub async fn run_cycle(&self, now: i64) -> ClaimsResult<Vec<PayoutRecord>> {
        let pool = self.repository.get_pool().await?;
        Metrics::pool_snapshot(pool.total_capital_usd.0, pool.total_coverage_sold.0);
        let all_active: Vec<Policy> = pool.active_policies.iter().filter(|p| p.is_active()).cloned().collect();
        if all_active.is_empty() {
            return Ok(Vec::new());
        }

        // §4.4 step 4: a lapsed policy is expired independently of whether
        // it ever triggered, freeing its coverage without a payout.
        let mut active = Vec::with_capacity(all_active.len());
        for policy in all_active {
            if policy.expiry_time > now {
                active.push(policy);
                continue;
            }
            match self.repository.expire_policy(policy.id).await {
                Ok(()) => {
                    info!(policy_id = policy.id, "policy lapsed, coverage released");
                    Metrics::policy_expired(&format!("{:?}", policy.product.coverage_kind));
                }
                Err(e) => error!(policy_id = policy.id, error = %e, "failed to expire lapsed policy"),
            }
        }
        if active.is_empty() {
            return Ok(Vec::new());
        }

        let assets: Vec<String> = {
            let mut set: Vec<String> = active.iter().map(Self::asset_key).collect();
            set.sort();
            set.dedup();
            set
        };
        let prices = self.oracle.fetch_prices(&assets).await?;

        let mut records = Vec::new();
        for policy in &active {
            let asset = Self::asset_key(policy);
            let Some(&current_price_f64) = prices.get(&asset) else {
                warn!(policy_id = policy.id, asset = %asset, "oracle price unavailable this cycle, skipping");
                continue;
            };
            let current_price = Price::from(Decimal::from_f64_retain(current_price_f64).unwrap_or(Decimal::ZERO));

            let sub_trigger = current_price.inner() < policy.trigger_price.inner();
            let eligible = {
                let mut state = self.trigger_states.entry(policy.id).or_default();
                state.observe(sub_trigger, now);
                state.samples_below >= self.config.confirmation_samples_required
            };

            if !eligible {
                continue;
            }

            let (payout, factor) =
                interpolate_payout(policy.coverage_amount, policy.trigger_price, policy.floor_price, current_price);
            if payout.is_zero() {
                continue;
            }

            match self.repository.reserve_payout(policy.id, payout, now).await {
                Ok(()) => {
                    let beneficiary = policy.beneficiary.clone().unwrap_or_else(|| policy.holder.clone());
                    let record = PayoutRecord {
                        policy_id: policy.id,
                        payout_cents: payout.0,
                        beneficiary,
                        trigger_price: policy.trigger_price.inner().to_f64().unwrap_or(0.0),
                        floor_price: policy.floor_price.inner().to_f64().unwrap_or(0.0),
                        current_price: current_price.inner().to_f64().unwrap_or(0.0),
                        interpolation_factor: factor.to_f64().unwrap_or(0.0),
                        timestamp_ms: now * 1000,
                    };
                    info!(policy_id = policy.id, payout_cents = payout.0, "payout dispatched");
                    let mut writer = self.writer.lock().await;
                    if let Err(e) = writer.add_record(record.clone()) {
                        error!(?e, policy_id = policy.id, "failed to persist payout record");
                    }
                    let coverage_kind = format!("{:?}", policy.product.coverage_kind);
                    Metrics::claim_payout(&coverage_kind, payout.0);
                    records.push(record);
                }
                Err(e) => {
                    // §4.4 step 6 / §7: capital reservation failures are
                    // logged and the policy stays Active for next cycle.
                    error!(policy_id = policy.id, payout_cents = payout.0, error = %e, "insufficient capital, payout skipped");
                    Metrics::claim_insufficient_capital(&format!("{:?}", policy.product.coverage_kind));
                }
            }
        }

        debug!(payouts = records.len(), cycle_policies = active.len(), "claims monitor cycle complete");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use insure_core::{Chain, CoverageKind, PolicyStatus, ProductKey, Stablecoin, UnifiedPool};
    use insure_state::StateResult;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;

    struct MockOracle(HashMap<String, f64>);

    #[async_trait]
    impl OracleAdapter for MockOracle {
        async fn fetch_prices(&self, assets: &[String]) -> StateResult<HashMap<String, f64>> {
            Ok(assets.iter().filter_map(|a| self.0.get(a).map(|p| (a.clone(), *p))).collect())
        }
    }

    struct MockRepo(StdMutex<UnifiedPool>);

    #[async_trait]
    impl PoolRepository for MockRepo {
        async fn get_pool(&self) -> StateResult<UnifiedPool> {
            Ok(self.0.lock().unwrap().clone())
        }
        async fn reserve_payout(&self, policy_id: u64, payout: Cents, now: i64) -> StateResult<()> {
            self.0
                .lock()
                .unwrap()
                .reserve_payout(policy_id, payout, now)
                .map_err(Into::into)
        }
        async fn expire_policy(&self, policy_id: u64) -> StateResult<()> {
            self.0.lock().unwrap().expire_policy(policy_id).map_err(Into::into)
        }
    }

    fn depeg_policy(id: u64) -> Policy {
        Policy {
            id,
            holder: "0xholder".into(),
            beneficiary: None,
            product: ProductKey::new(CoverageKind::Depeg, Chain::Ethereum, Stablecoin::Usdc),
            coverage_amount: Cents::new(1_000_000),
            premium_paid: Cents::new(1973),
            trigger_price: Price::new(dec!(0.98)),
            floor_price: Price::new(dec!(0.90)),
            start_time: 0,
            expiry_time: 1_000_000,
            status: PolicyStatus::Active,
            payout_amount: None,
            payout_time: None,
        }
    }

    #[test]
    fn interpolation_matches_scenario_2() {
        let (payout, factor) =
            interpolate_payout(Cents::new(1_000_000), Price::new(dec!(0.98)), Price::new(dec!(0.90)), Price::new(dec!(0.94)));
        assert_eq!(payout, Cents::new(500_000));
        assert_eq!(factor, dec!(0.5));
    }

    #[test]
    fn interpolation_boundary_at_trigger_is_zero() {
        let (payout, _) =
            interpolate_payout(Cents::new(1_000_000), Price::new(dec!(0.98)), Price::new(dec!(0.90)), Price::new(dec!(0.98)));
        assert_eq!(payout, Cents::ZERO);
    }

    #[test]
    fn interpolation_boundary_at_floor_is_full_coverage() {
        let (payout, factor) =
            interpolate_payout(Cents::new(1_000_000), Price::new(dec!(0.98)), Price::new(dec!(0.90)), Price::new(dec!(0.90)));
        assert_eq!(payout, Cents::new(1_000_000));
        assert_eq!(factor, dec!(1));
    }

    #[tokio::test]
    async fn cycle_pays_out_and_reserves_capital() {
        let mut pool = UnifiedPool::new(Cents::new(2_000_000));
        pool.active_policies.push(depeg_policy(1));
        pool.total_coverage_sold = Cents::new(1_000_000);

        let repo = MockRepo(StdMutex::new(pool));
        let oracle = MockOracle(HashMap::from([("Usdc".to_string(), 0.94)]));
        let temp_dir = TempDir::new().unwrap();
        let writer = PayoutWriter::new(temp_dir.path().to_str().unwrap(), 100);

        let monitor = ClaimsMonitor::new(repo, oracle, ClaimsMonitorConfig::default(), writer);
        let records = monitor.run_cycle(1_700_000_000).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].payout_cents, 500_000);

        let pool_after = monitor.repository().get_pool().await.unwrap();
        assert_eq!(pool_after.total_capital_usd, Cents::new(1_500_000));
        assert!(pool_after.active_policies.is_empty());
    }

    #[tokio::test]
    async fn cycle_skips_payout_when_capital_insufficient() {
        let mut pool = UnifiedPool::new(Cents::new(400_000));
        pool.active_policies.push(depeg_policy(1));
        pool.total_coverage_sold = Cents::new(1_000_000);

        let repo = MockRepo(StdMutex::new(pool));
        let oracle = MockOracle(HashMap::from([("Usdc".to_string(), 0.94)]));
        let temp_dir = TempDir::new().unwrap();
        let writer = PayoutWriter::new(temp_dir.path().to_str().unwrap(), 100);

        let monitor = ClaimsMonitor::new(repo, oracle, ClaimsMonitorConfig::default(), writer);
        let records = monitor.run_cycle(1_700_000_000).await.unwrap();
        assert!(records.is_empty());

        let pool_after = monitor.repository().get_pool().await.unwrap();
        assert_eq!(pool_after.total_capital_usd, Cents::new(400_000));
        assert_eq!(pool_after.active_policies.len(), 1);
    }

    #[tokio::test]
    async fn cycle_expires_lapsed_policy_without_paying_out() {
        let mut policy = depeg_policy(1);
        policy.expiry_time = 1_000;
        let mut pool = UnifiedPool::new(Cents::new(2_000_000));
        pool.active_policies.push(policy);
        pool.total_coverage_sold = Cents::new(1_000_000);

        let repo = MockRepo(StdMutex::new(pool));
        let oracle = MockOracle(HashMap::from([("Usdc".to_string(), 0.94)]));
        let temp_dir = TempDir::new().unwrap();
        let writer = PayoutWriter::new(temp_dir.path().to_str().unwrap(), 100);

        let monitor = ClaimsMonitor::new(repo, oracle, ClaimsMonitorConfig::default(), writer);
        let records = monitor.run_cycle(1_700_000_000).await.unwrap();
        assert!(records.is_empty());

        let pool_after = monitor.repository().get_pool().await.unwrap();
        assert_eq!(pool_after.total_capital_usd, Cents::new(2_000_000));
        assert_eq!(pool_after.total_coverage_sold, Cents::ZERO);
        assert!(pool_after.active_policies.is_empty());
    }
}
