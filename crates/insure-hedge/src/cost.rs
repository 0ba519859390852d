//! Hedge-Cost Fetcher (§4.6): a thin read-side component giving the
//! estimated cost of hedging one product's exposure, broken down by venue.

use async_trait::async_trait;
use insure_core::{Cents, ProductExposure, Venue};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::HedgeConfig;
use crate::error::HedgeResult;
use crate::venues::VenueAdapter;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HedgeCostBreakdown {
    pub polymarket_cost: Option<Cents>,
    pub hyperliquid_cost: Option<Cents>,
    pub binance_cost: Option<Cents>,
    pub allianz_cost: Option<Cents>,
    pub total_hedge_cost: Cents,
    pub hedge_ratio: f64,
    pub effective_premium_addition: f64,
    pub timestamp: i64,
}

#[async_trait]
pub trait HedgeCostFetcher: Send + Sync {
    async fn fetch_cost(&self, exposure: &ProductExposure, now: i64) -> HedgeResult<HedgeCostBreakdown>;
}

/// Combines the per-venue costs already quoted for an allocation into the
/// aggregate breakdown §4.6 describes (missing venues contribute 0).
pub fn summarize(
    polymarket_cost: Option<Cents>,
    hyperliquid_cost: Option<Cents>,
    binance_cost: Option<Cents>,
    allianz_cost: Option<Cents>,
    coverage_amount: Cents,
    hedge_ratio: f64,
    now: i64,
) -> HedgeCostBreakdown {
    let total = polymarket_cost.unwrap_or(Cents::ZERO)
        + hyperliquid_cost.unwrap_or(Cents::ZERO)
        + binance_cost.unwrap_or(Cents::ZERO)
        + allianz_cost.unwrap_or(Cents::ZERO);
    let effective_premium_addition = if coverage_amount.0 == 0 {
        0.0
    } else {
        total.0 as f64 / coverage_amount.0 as f64
    };
    HedgeCostBreakdown {
        polymarket_cost,
        hyperliquid_cost,
        binance_cost,
        allianz_cost,
        total_hedge_cost: total,
        hedge_ratio,
        effective_premium_addition,
        timestamp: now,
    }
}

fn decimal_weight(value: f64) -> Decimal {
    Decimal::from_f64_retain(value).unwrap_or(Decimal::ZERO)
}

/// Perpetual hedge's assumed holding period absent a specific policy
/// expiry on the (per-product, not per-policy) exposure record.
const PERPETUALS_DEFAULT_DURATION_DAYS: i64 = 30;
const PERPETUALS_SLIPPAGE_BPS: f64 = 0.0008;

/// Per-coverage-kind fallback premium rate used for Allianz when the venue
/// is unreachable, annualized the same way `CoverageKind::base_rate_apr`
/// prices policies in the first place.
fn allianz_fallback_rate(kind: insure_core::CoverageKind) -> Decimal {
    kind.base_rate_apr()
}

/// §4.6's concrete cost fetcher: prices each venue slice of one product's
/// `hedge_required` through the venue adapter's market data, falling back
/// to a conservative estimate wherever a venue is unavailable.
pub struct DefaultCostFetcher<V> {
    adapter: V,
    config: HedgeConfig,
}

impl<V: VenueAdapter> DefaultCostFetcher<V> {
    pub fn new(adapter: V, config: HedgeConfig) -> Self {
        Self { adapter, config }
    }

    fn venue_slice(&self, exposure: &ProductExposure, weight: f64) -> Cents {
        exposure.hedge_required.scale(decimal_weight(weight))
    }

    /// §4.6 Polymarket: the cheapest (lowest `yes_price`) open market with
    /// liquidity at least 10% of the slice being hedged and an expiry at or
    /// beyond the cycle's hedge horizon. `None` if no market passes.
    async fn polymarket_cost(&self, exposure: &ProductExposure, now: i64) -> Option<Cents> {
        let slice = self.venue_slice(exposure, self.config.polymarket_weight);
        if slice.is_zero() {
            return None;
        }
        let markets = self.adapter.polymarket_markets(&exposure.product).await.ok()?;
        let min_liquidity = slice.0 as f64 * 0.10;
        let horizon = now + PERPETUALS_DEFAULT_DURATION_DAYS * 86_400;
        let best = markets
            .into_iter()
            .filter(|m| m.liquidity.0 as f64 >= min_liquidity && m.expiry >= horizon)
            .min_by(|a, b| a.yes_price.total_cmp(&b.yes_price))?;
        Some(slice.scale(Decimal::from_f64_retain(best.yes_price).unwrap_or(Decimal::ZERO)))
    }

    /// §4.6 Perpetuals (CEX or DeFi): `hedged * (funding_rate_hourly *
    /// duration_hours + slippage_bps)`.
    async fn perpetual_cost(&self, exposure: &ProductExposure, venue: Venue, weight: f64) -> Option<Cents> {
        let hedged = self.venue_slice(exposure, weight);
        if hedged.is_zero() {
            return None;
        }
        let funding_rate_hourly = self.adapter.funding_rate_hourly(venue, &exposure.product).await.ok()?;
        let duration_hours = (PERPETUALS_DEFAULT_DURATION_DAYS * 24) as f64;
        let rate = funding_rate_hourly * duration_hours + PERPETUALS_SLIPPAGE_BPS;
        Some(hedged.scale(Decimal::from_f64_retain(rate).unwrap_or(Decimal::ZERO)))
    }

    /// §4.6 Allianz: a live quote if reachable, otherwise the per-kind
    /// fallback rate applied to the slice over the default hedge horizon.
    async fn allianz_cost(&self, exposure: &ProductExposure) -> Option<Cents> {
        let slice = self.venue_slice(exposure, self.config.allianz_weight);
        if slice.is_zero() {
            return None;
        }
        match self.adapter.quote(Venue::AllianzParametric, &exposure.product, slice).await {
            Ok(quoted) => Some(quoted),
            Err(_) => {
                let rate = allianz_fallback_rate(exposure.product.coverage_kind)
                    * Decimal::from(PERPETUALS_DEFAULT_DURATION_DAYS)
                    / Decimal::from(365);
                Some(slice.scale(rate))
            }
        }
    }
}

#[async_trait]
impl<V: VenueAdapter> HedgeCostFetcher for DefaultCostFetcher<V> {
    async fn fetch_cost(&self, exposure: &ProductExposure, now: i64) -> HedgeResult<HedgeCostBreakdown> {
        let (polymarket_cost, binance_cost, hyperliquid_cost, allianz_cost) = tokio::join!(
            self.polymarket_cost(exposure, now),
            self.perpetual_cost(exposure, Venue::BinanceFutures, self.config.perpetuals_weight),
            self.perpetual_cost(exposure, Venue::DefiPerps, self.config.defi_perps_weight),
            self.allianz_cost(exposure),
        );

        Ok(summarize(
            polymarket_cost,
            hyperliquid_cost,
            binance_cost,
            allianz_cost,
            exposure.total_coverage,
            self.config.total_hedge_ratio,
            now,
        ))
    }
}
