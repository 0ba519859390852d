//! The hedge orchestrator (§4.5): one cycle per `check_interval_seconds`.
//!
//! Exposure aggregation happens per product, but `HedgePosition` is keyed
//! by `policy_id` in the data model (§3), so each venue's product-level
//! slice is pro-rated across that product's active policies by coverage
//! share before positions are opened. This keeps the close path (triggered
//! per-policy, on claim payout) exact: every position this orchestrator
//! opens already belongs to one policy.

use dashmap::DashMap;
use futures_util::future::join_all;
use insure_core::{Cents, HedgeAllocation, HedgePosition, HedgePositionStatus, Policy, ProductExposure, UnifiedPool, Venue};
use insure_persistence::{HedgeEventRecord, HedgeEventWriter};
use insure_state::PoolRepository;
use insure_telemetry::Metrics;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::HedgeConfig;
use crate::cost::HedgeCostFetcher;
use crate::error::HedgeResult;
use crate::exposure::aggregate_exposures;
use crate::allocation::split_by_weights;
use crate::venues::VenueAdapter;

pub struct HedgeOrchestrator<R, V, C> {
    repository: R,
    adapter: V,
    cost_fetcher: C,
    config: HedgeConfig,
    positions: DashMap<u64, Vec<HedgePosition>>,
    writer: Mutex<HedgeEventWriter>,
}

impl<R, V, C> HedgeOrchestrator<R, V, C>
where
    R: PoolRepository,
    V: VenueAdapter,
    C: HedgeCostFetcher,
{
    pub fn new(repository: R, adapter: V, cost_fetcher: C, config: HedgeConfig, writer: HedgeEventWriter) -> Self {
        Self {
            repository,
            adapter,
            cost_fetcher,
            config,
            positions: DashMap::new(),
            writer: Mutex::new(writer),
        }
    }

    fn policies_for_product(pool: &UnifiedPool, exposure: &ProductExposure) -> Vec<&Policy> {
        pool.active_policies
            .iter()
            .filter(|p| p.is_active() && p.product == exposure.product)
            .collect()
    }

    async fn open_one(&self, policy_id: u64, venue: Venue, product: &insure_core::ProductKey, amount: Cents, now: i64) {
        if amount.is_zero() {
            return;
        }
        let position = match self.adapter.open(venue, product, amount).await {
            Ok(fill) => HedgePosition {
                position_id: Uuid::new_v4(),
                policy_id,
                product: *product,
                venue,
                external_order_id: Some(fill.external_order_id),
                hedge_amount_cents: amount,
                entry_price: fill.entry_price,
                entry_time: now,
                status: HedgePositionStatus::Open,
                realized_pnl_cents: None,
                close_time: None,
            },
            Err(e) => {
                warn!(?venue, policy_id, error = %e, "hedge venue open failed, recording closed sentinel");
                Metrics::hedge_execution_failure(&format!("{venue:?}"));
                HedgePosition {
                    position_id: Uuid::new_v4(),
                    policy_id,
                    product: *product,
                    venue,
                    external_order_id: None,
                    hedge_amount_cents: amount,
                    entry_price: None,
                    entry_time: now,
                    status: HedgePositionStatus::Closed,
                    realized_pnl_cents: None,
                    close_time: Some(now),
                }
            }
        };

        let event = HedgeEventRecord {
            position_id: position.position_id.to_string(),
            policy_id,
            venue: format!("{venue:?}"),
            event: "open".to_string(),
            hedge_amount_cents: amount.0,
            realized_pnl_cents: position.realized_pnl_cents,
            timestamp_ms: now * 1000,
        };
        {
            let mut writer = self.writer.lock().await;
            if let Err(e) = writer.add_record(event) {
                error!(?e, "failed to persist hedge open event");
            }
        }
        self.positions.entry(policy_id).or_default().push(position);
    }

    async fn allocate_and_execute(&self, exposure: ProductExposure, pool: &UnifiedPool, now: i64) -> HedgeResult<HedgeAllocation> {
        let mut allocation = split_by_weights(&exposure, &self.config);
        let cost = self.cost_fetcher.fetch_cost(&exposure, now).await?;
        allocation.total_cost_cents = cost.total_hedge_cost;

        let policies = Self::policies_for_product(pool, &exposure);
        if policies.is_empty() {
            return Ok(allocation);
        }
        let total_coverage = exposure.total_coverage.as_decimal();

        let slices = [
            (Venue::Polymarket, allocation.polymarket_cents),
            (Venue::BinanceFutures, allocation.perpetuals_cents),
            (Venue::DefiPerps, allocation.defi_perps_cents),
            (Venue::AllianzParametric, allocation.allianz_cents),
        ];

        let mut opens = Vec::new();
        for policy in &policies {
            let share = if total_coverage.is_zero() {
                rust_decimal::Decimal::ZERO
            } else {
                policy.coverage_amount.as_decimal() / total_coverage
            };
            for (venue, slice) in slices {
                let amount = slice.scale(share);
                opens.push(self.open_one(policy.id, venue, &exposure.product, amount, now));
            }
        }
        join_all(opens).await;

        Ok(allocation)
    }

    /// Runs one exposure-aggregation-to-execution cycle (Steps A-E).
    /// Cycles do not overlap; callers are responsible for serializing
    /// calls to this method.
    pub async fn run_cycle(&self, now: i64) -> HedgeResult<Vec<HedgeAllocation>> {
        let pool = self.repository.get_pool().await?;
        let exposures = aggregate_exposures(&pool, &self.config);
        if exposures.is_empty() {
            return Ok(Vec::new());
        }

        // Distinct allocations run in parallel (§5); each one may in turn
        // open several venues concurrently.
        let futures = exposures.into_iter().map(|exposure| self.allocate_and_execute(exposure, &pool, now));
        let results = join_all(futures).await;

        let mut allocations = Vec::new();
        for result in results {
            match result {
                Ok(allocation) => allocations.push(allocation),
                Err(e) => error!(error = %e, "hedge allocation failed for product, skipping"),
            }
        }

        let total_cost: i64 = allocations.iter().map(|a| a.total_cost_cents.0).sum();
        info!(products = allocations.len(), total_cost_cents = total_cost, "hedge cycle complete");

        Metrics::hedge_allocated("polymarket", allocations.iter().map(|a| a.polymarket_cents.0).sum());
        Metrics::hedge_allocated("binance_futures", allocations.iter().map(|a| a.perpetuals_cents.0).sum());
        Metrics::hedge_allocated("defi_perps", allocations.iter().map(|a| a.defi_perps_cents.0).sum());
        Metrics::hedge_allocated("allianz_parametric", allocations.iter().map(|a| a.allianz_cents.0).sum());
        for venue in [Venue::Polymarket, Venue::BinanceFutures, Venue::DefiPerps, Venue::AllianzParametric] {
            let open = self
                .positions
                .iter()
                .flat_map(|e| e.value().clone())
                .filter(|p| p.venue == venue && p.status == HedgePositionStatus::Open)
                .count();
            Metrics::hedge_positions_open(&format!("{venue:?}"), open as i64);
        }

        Ok(allocations)
    }

    /// Close path (§4.5): closes every Open position for `policy_id` in
    /// parallel across venues. Idempotent — a position already Closed is
    /// skipped. Returns the total realized PnL across closed positions.
    pub async fn close_policy(&self, policy_id: u64, now: i64) -> HedgeResult<i64> {
        let Some(mut entry) = self.positions.get_mut(&policy_id) else {
            return Ok(0);
        };
        let open_indices: Vec<usize> = entry
            .iter()
            .enumerate()
            .filter(|(_, p)| p.status == HedgePositionStatus::Open)
            .map(|(i, _)| i)
            .collect();
        if open_indices.is_empty() {
            return Ok(0);
        }

        let closes = join_all(open_indices.iter().map(|&i| self.adapter.close(&entry[i]))).await;

        let mut total_pnl = 0i64;
        for (&i, close_result) in open_indices.iter().zip(closes) {
            match close_result {
                Ok(close) => {
                    entry[i].close(close.realized_pnl_cents, now);
                    total_pnl += close.realized_pnl_cents;
                    let event = HedgeEventRecord {
                        position_id: entry[i].position_id.to_string(),
                        policy_id,
                        venue: format!("{:?}", entry[i].venue),
                        event: "close".to_string(),
                        hedge_amount_cents: entry[i].hedge_amount_cents.0,
                        realized_pnl_cents: entry[i].realized_pnl_cents,
                        timestamp_ms: now * 1000,
                    };
                    let mut writer = self.writer.lock().await;
                    if let Err(e) = writer.add_record(event) {
                        error!(?e, policy_id, "failed to persist hedge close event");
                    }
                }
                Err(e) => {
                    error!(policy_id, venue = ?entry[i].venue, error = %e, "hedge close failed, position stays open");
                    Metrics::hedge_execution_failure(&format!("{:?}", entry[i].venue));
                }
            }
        }

        debug!(policy_id, total_pnl, "hedge close path complete");
        Ok(total_pnl)
    }

    pub fn positions_for(&self, policy_id: u64) -> Vec<HedgePosition> {
        self.positions.get(&policy_id).map(|v| v.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use insure_core::{Chain, CoverageKind, Policy, PolicyStatus, Price, ProductKey, Stablecoin};
    use insure_state::StateResult;
    use rust_decimal_macros::dec;
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;

    struct MockRepo(StdMutex<UnifiedPool>);

    #[async_trait]
    impl PoolRepository for MockRepo {
        async fn get_pool(&self) -> StateResult<UnifiedPool> {
            Ok(self.0.lock().unwrap().clone())
        }
        async fn reserve_payout(&self, policy_id: u64, payout: Cents, now: i64) -> StateResult<()> {
            self.0.lock().unwrap().reserve_payout(policy_id, payout, now).map_err(Into::into)
        }
        async fn expire_policy(&self, policy_id: u64) -> StateResult<()> {
            self.0.lock().unwrap().expire_policy(policy_id).map_err(Into::into)
        }
    }

    struct MockAdapter;

    #[async_trait]
    impl VenueAdapter for MockAdapter {
        async fn open(&self, _venue: Venue, _product: &ProductKey, _amount: Cents) -> HedgeResult<crate::venues::VenueFill> {
            Ok(crate::venues::VenueFill {
                external_order_id: "order-1".to_string(),
                entry_price: Some(Price::new(dec!(1.0))),
            })
        }

        async fn close(&self, position: &HedgePosition) -> HedgeResult<crate::venues::VenueClose> {
            Ok(crate::venues::VenueClose {
                realized_pnl_cents: position.hedge_amount_cents.0 / 10,
            })
        }

        async fn quote(&self, _venue: Venue, _product: &ProductKey, amount: Cents) -> HedgeResult<Cents> {
            Ok(Cents::new(amount.0 / 100))
        }

        async fn polymarket_markets(&self, _product: &ProductKey) -> HedgeResult<Vec<crate::venues::PolymarketMarket>> {
            Ok(Vec::new())
        }

        async fn funding_rate_hourly(&self, _venue: Venue, _product: &ProductKey) -> HedgeResult<f64> {
            Ok(0.0)
        }
    }

    struct MockCostFetcher;

    #[async_trait]
    impl HedgeCostFetcher for MockCostFetcher {
        async fn fetch_cost(&self, exposure: &ProductExposure, now: i64) -> HedgeResult<crate::cost::HedgeCostBreakdown> {
            Ok(crate::cost::summarize(
                Some(Cents::new(100)),
                Some(Cents::new(100)),
                Some(Cents::new(100)),
                Some(Cents::new(100)),
                exposure.total_coverage,
                0.20,
                now,
            ))
        }
    }

    fn bridge_policy(id: u64, coverage: Cents) -> Policy {
        Policy {
            id,
            holder: "0xholder".into(),
            beneficiary: None,
            product: ProductKey::new(CoverageKind::Bridge, Chain::Ethereum, Stablecoin::Usdc),
            coverage_amount: coverage,
            premium_paid: Cents::ZERO,
            trigger_price: Price::new(dec!(0.98)),
            floor_price: Price::new(dec!(0.90)),
            start_time: 0,
            expiry_time: 1_000_000,
            status: PolicyStatus::Active,
            payout_amount: None,
            payout_time: None,
        }
    }

    #[tokio::test]
    async fn run_cycle_opens_positions_for_active_policies() {
        let mut pool = UnifiedPool::new(Cents::new(10_000_000_000));
        pool.active_policies.push(bridge_policy(1, Cents::new(100_000_000)));
        pool.total_coverage_sold = Cents::new(100_000_000);

        let repo = MockRepo(StdMutex::new(pool));
        let temp_dir = TempDir::new().unwrap();
        let writer = HedgeEventWriter::new(temp_dir.path().to_str().unwrap(), 100);
        let orchestrator = HedgeOrchestrator::new(repo, MockAdapter, MockCostFetcher, HedgeConfig::default(), writer);

        let allocations = orchestrator.run_cycle(1_700_000_000).await.unwrap();
        assert_eq!(allocations.len(), 1);
        assert_eq!(allocations[0].total_allocated(), Cents::new(1_920_000));

        let positions = orchestrator.positions_for(1);
        assert_eq!(positions.len(), 4);
        assert!(positions.iter().all(|p| p.status == HedgePositionStatus::Open));
    }

    #[tokio::test]
    async fn close_policy_is_idempotent() {
        let mut pool = UnifiedPool::new(Cents::new(10_000_000_000));
        pool.active_policies.push(bridge_policy(1, Cents::new(100_000_000)));
        pool.total_coverage_sold = Cents::new(100_000_000);

        let repo = MockRepo(StdMutex::new(pool));
        let temp_dir = TempDir::new().unwrap();
        let writer = HedgeEventWriter::new(temp_dir.path().to_str().unwrap(), 100);
        let orchestrator = HedgeOrchestrator::new(repo, MockAdapter, MockCostFetcher, HedgeConfig::default(), writer);

        orchestrator.run_cycle(1_700_000_000).await.unwrap();
        let pnl_first = orchestrator.close_policy(1, 1_700_000_100).await.unwrap();
        assert!(pnl_first > 0);

        let pnl_second = orchestrator.close_policy(1, 1_700_000_200).await.unwrap();
        assert_eq!(pnl_second, 0);

        let positions = orchestrator.positions_for(1);
        assert!(positions.iter().all(|p| p.status == HedgePositionStatus::Closed));
    }
}
