//! Venue allocation (§4.5 Step B): splits one product's hedge requirement
//! into per-venue slices using configurable weights.

use insure_core::{Cents, HedgeAllocation, ProductExposure};
use rust_decimal::Decimal;

use crate::config::HedgeConfig;

fn decimal_weight(value: f64) -> Decimal {
    Decimal::from_f64_retain(value).unwrap_or(Decimal::ZERO)
}

/// Splits `exposure.hedge_required` into the four venue slices. The
/// `total_cost_cents` field is left at zero; callers fill it in once the
/// Hedge-Cost Fetcher (§4.6) has priced each slice.
pub fn split_by_weights(exposure: &ProductExposure, config: &HedgeConfig) -> HedgeAllocation {
    let required = exposure.hedge_required;
    HedgeAllocation {
        product: exposure.product,
        polymarket_cents: required.scale(decimal_weight(config.polymarket_weight)),
        perpetuals_cents: required.scale(decimal_weight(config.perpetuals_weight)),
        defi_perps_cents: required.scale(decimal_weight(config.defi_perps_weight)),
        allianz_cents: required.scale(decimal_weight(config.allianz_weight)),
        total_cost_cents: Cents::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insure_core::{Chain, CoverageKind, ProductKey};

    #[test]
    fn scenario_5_split_matches_literal_values() {
        let exposure = ProductExposure {
            product: ProductKey::new(CoverageKind::Bridge, Chain::Ethereum, insure_core::Stablecoin::Usdc),
            active_policies: 1,
            total_coverage: Cents::new(100_000_000),
            total_premium: Cents::ZERO,
            expected_payout: Cents::new(9_600_000),
            hedge_required: Cents::new(1_920_000),
        };
        let allocation = split_by_weights(&exposure, &HedgeConfig::default());
        assert_eq!(allocation.polymarket_cents, Cents::new(576_000));
        assert_eq!(allocation.perpetuals_cents, Cents::new(576_000));
        assert_eq!(allocation.defi_perps_cents, Cents::new(576_000));
        assert_eq!(allocation.allianz_cents, Cents::new(192_000));
        assert_eq!(allocation.total_allocated(), allocation.polymarket_cents + allocation.perpetuals_cents + allocation.defi_perps_cents + allocation.allianz_cents);
    }
}
