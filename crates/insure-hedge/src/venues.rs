//! Venue routing (§4.5 Step C) and the adapter contract each concrete
//! venue integration (Polymarket, CEX perpetuals, DeFi perpetuals, Allianz
//! parametric) implements.

use async_trait::async_trait;
use insure_core::{Chain, CoverageKind, HedgePosition, Price, ProductKey, Venue};
use serde::{Deserialize, Serialize};

use crate::error::HedgeResult;

/// Polymarket binary-market id for a product, per §4.5 Step C.
pub fn polymarket_market_id(product: &ProductKey) -> String {
    let asset = format!("{:?}", product.stablecoin).to_lowercase();
    let chain = format!("{:?}", product.chain).to_lowercase();
    match product.coverage_kind {
        CoverageKind::Depeg => format!("{asset}-depeg-q?-{year}", year = "2026"),
        CoverageKind::SmartContract => format!("{chain}-smart-contract-exploit-q?-{year}", year = "2026"),
        CoverageKind::Bridge => format!("{chain}-bridge-exploit-q?-{year}", year = "2026"),
        CoverageKind::Oracle => format!("{chain}-oracle-failure-q?-{year}", year = "2026"),
        CoverageKind::CexLiquidation => format!("{asset}-cex-liquidation-q?-{year}", year = "2026"),
    }
}

fn chain_native_symbol(chain: Chain) -> &'static str {
    match chain {
        Chain::Ethereum | Chain::Base => "ETH",
        Chain::Bitcoin | Chain::Lightning => "BTC",
        Chain::Arbitrum => "ARB",
        Chain::Optimism => "OP",
        Chain::Polygon => "MATIC",
        Chain::Solana => "SOL",
        Chain::Ton => "TON",
    }
}

/// CEX/DeFi perpetual symbol for a product, per §4.5 Step C. `Depeg/USDT`
/// cannot be shorted directly so it falls back to `BTCUSDT`; everything
/// else not explicitly named in the spec routes through the chain's
/// native-token perpetual, the same rule it gives for `SmartContract`.
pub fn perp_symbol(product: &ProductKey) -> String {
    use insure_core::Stablecoin;
    match (product.coverage_kind, product.stablecoin) {
        (CoverageKind::Depeg, Stablecoin::Usdc) => "USDCUSDT".to_string(),
        (CoverageKind::Depeg, Stablecoin::Usdt) => "BTCUSDT".to_string(),
        (CoverageKind::Oracle, _) => "LINKUSDT".to_string(),
        (CoverageKind::CexLiquidation, _) => "BTCUSDT".to_string(),
        _ => format!("{}USDT", chain_native_symbol(product.chain)),
    }
}

/// Result of successfully opening a hedge at a venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueFill {
    pub external_order_id: String,
    pub entry_price: Option<Price>,
}

/// Result of successfully closing a hedge at a venue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VenueClose {
    pub realized_pnl_cents: i64,
}

/// One open Polymarket binary market for a product, as needed by the
/// Hedge-Cost Fetcher's best-market selection (§4.6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PolymarketMarket {
    pub yes_price: f64,
    pub liquidity: insure_core::Cents,
    pub expiry: i64,
}

/// One adapter handles all four venues; concrete implementations dispatch
/// on `Venue` internally (HTTP clients, signing, etc. all live outside this
/// workspace's scope per §6 — this trait is the seam).
#[async_trait]
pub trait VenueAdapter: Send + Sync {
    async fn open(&self, venue: Venue, product: &ProductKey, amount: insure_core::Cents) -> HedgeResult<VenueFill>;

    async fn close(&self, position: &HedgePosition) -> HedgeResult<VenueClose>;

    /// `quote(product, amount) -> cost` (§6 collaborator interface): the
    /// venue's current price to hedge `amount` of `product` right now.
    async fn quote(&self, venue: Venue, product: &ProductKey, amount: insure_core::Cents) -> HedgeResult<insure_core::Cents>;

    /// Open Polymarket binary markets for `product`, used by the cost
    /// fetcher to pick the cheapest market passing the liquidity/expiry
    /// filters (§4.6).
    async fn polymarket_markets(&self, product: &ProductKey) -> HedgeResult<Vec<PolymarketMarket>>;

    /// Hourly funding rate for `product`'s perpetual at `venue` (§4.6).
    async fn funding_rate_hourly(&self, venue: Venue, product: &ProductKey) -> HedgeResult<f64>;
}
