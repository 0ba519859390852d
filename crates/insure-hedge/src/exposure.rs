//! Exposure aggregation (§4.5 Step A): groups active policies by product
//! and derives each product's expected payout and external hedge
//! requirement.

use insure_core::{Cents, ProductExposure, ProductKey, UnifiedPool};
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::config::HedgeConfig;

/// Enumerates every `ProductKey` with at least one active policy, computing
/// `expected_payout` and `hedge_required` per product. Products whose
/// `hedge_required` falls below `min_hedge_amount_cents` are dropped.
pub fn aggregate_exposures(pool: &UnifiedPool, config: &HedgeConfig) -> Vec<ProductExposure> {
    let mut by_product: HashMap<ProductKey, ProductExposure> = HashMap::new();

    for policy in pool.active_policies.iter().filter(|p| p.is_active()) {
        let entry = by_product.entry(policy.product).or_insert_with(|| ProductExposure {
            product: policy.product,
            active_policies: 0,
            total_coverage: Cents::ZERO,
            total_premium: Cents::ZERO,
            expected_payout: Cents::ZERO,
            hedge_required: Cents::ZERO,
        });
        entry.active_policies += 1;
        entry.total_coverage += policy.coverage_amount;
        entry.total_premium += policy.premium_paid;
    }

    let ratio = Decimal::from_f64_or_zero(config.total_hedge_ratio);
    let min_hedge = Cents::new(config.min_hedge_amount_cents);

    let mut exposures: Vec<ProductExposure> = by_product
        .into_values()
        .map(|mut exposure| {
            let (trigger_rate, severity_pct) = exposure.product.coverage_kind.hedge_rates();
            exposure.expected_payout = exposure.total_coverage.scale(trigger_rate * severity_pct);
            exposure.hedge_required = exposure.expected_payout.scale(ratio);
            exposure
        })
        .filter(|exposure| exposure.hedge_required.0 >= min_hedge.0)
        .collect();

    // Deterministic order for logging and for tests that compare snapshots.
    exposures.sort_by(|a, b| format!("{:?}", a.product).cmp(&format!("{:?}", b.product)));
    exposures
}

trait DecimalFromF64OrZero {
    fn from_f64_or_zero(value: f64) -> Self;
}

impl DecimalFromF64OrZero for Decimal {
    fn from_f64_or_zero(value: f64) -> Decimal {
        Decimal::from_f64_retain(value).unwrap_or(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insure_core::{Chain, CoverageKind, Policy, PolicyStatus, Price, Stablecoin};
    use rust_decimal_macros::dec;

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

    #[test]
    fn scenario_5_bridge_exposure_matches_literal_values() {
        let mut pool = UnifiedPool::new(Cents::new(10_000_000_000));
        pool.active_policies.push(bridge_policy(1, Cents::new(100_000_000)));
        pool.total_coverage_sold = Cents::new(100_000_000);

        let exposures = aggregate_exposures(&pool, &HedgeConfig::default());
        assert_eq!(exposures.len(), 1);
        let exposure = &exposures[0];
        // expected_payout = 1_000_000 * 0.12 * 0.80 = 96_000 (cents: 100_000_000 * 0.096)
        assert_eq!(exposure.expected_payout, Cents::new(9_600_000));
        // hedge_required = 0.20 * 96_000 = 19_200 (cents: 1_920_000)
        assert_eq!(exposure.hedge_required, Cents::new(1_920_000));
    }

    #[test]
    fn below_minimum_hedge_amount_is_dropped() {
        let mut pool = UnifiedPool::new(Cents::new(1_000_000));
        pool.active_policies.push(bridge_policy(1, Cents::new(1_000)));
        pool.total_coverage_sold = Cents::new(1_000);

        let exposures = aggregate_exposures(&pool, &HedgeConfig::default());
        assert!(exposures.is_empty());
    }
}
