//! Placeholder implementations of the out-of-scope collaborator interfaces
//! (spec.md §6): oracle feeds, bridge scanners, utilization trackers,
//! bridge-transaction polling, and hedge venues. Real integrations live
//! outside this workspace; these stand-ins let the binary wire up and run
//! the full request/monitoring/hedging pipeline end to end without one.

use async_trait::async_trait;
use insure_core::{BridgeHealth, Cents, ProductKey, Venue};
use insure_hedge::{HedgeError, HedgeResult, VenueAdapter, VenueClose, VenueFill};
use insure_monitor::collaborators::{BridgeTransaction, BridgeTransactionMonitor};
use insure_state::collaborators::{BridgeMonitor, OracleAdapter, TrancheUtilization, UtilizationTracker};
use insure_state::StateResult;
use std::collections::HashMap;

/// Returns no prices. A real oracle adapter would call out to a price feed;
/// an empty result here just means the claims monitor observes no policy
/// below trigger this cycle, which is the safe default.
pub struct UnconfiguredOracleAdapter;

#[async_trait]
impl OracleAdapter for UnconfiguredOracleAdapter {
    async fn fetch_prices(&self, _assets: &[String]) -> StateResult<HashMap<String, f64>> {
        Ok(HashMap::new())
    }
}

/// Reports no bridges. The bridge-health loop simply has nothing to diff
/// against until a real scanner is wired in.
pub struct UnconfiguredBridgeMonitor;

#[async_trait]
impl BridgeMonitor for UnconfiguredBridgeMonitor {
    async fn monitor_all(&self, _previous: &HashMap<String, BridgeHealth>) -> StateResult<Vec<BridgeHealth>> {
        Ok(Vec::new())
    }
}

/// Reports no tranches.
pub struct UnconfiguredUtilizationTracker;

#[async_trait]
impl UtilizationTracker for UnconfiguredUtilizationTracker {
    async fn get_all_utilizations(&self) -> StateResult<Vec<TrancheUtilization>> {
        Ok(Vec::new())
    }

    async fn get_available_capacity(&self, _tranche_id: &str) -> StateResult<Cents> {
        Ok(Cents::ZERO)
    }
}

/// Reports no pending bridge transactions.
pub struct UnconfiguredBridgeTransactionMonitor;

#[async_trait]
impl BridgeTransactionMonitor for UnconfiguredBridgeTransactionMonitor {
    async fn pending_transactions(&self) -> insure_monitor::MonitorResult<Vec<BridgeTransaction>> {
        Ok(Vec::new())
    }
}

/// A venue adapter that always refuses to open or close a position. Wiring
/// the hedge orchestrator against this surfaces every venue as unavailable
/// rather than silently fabricating fills, which is the conservative
/// default until a real venue client is configured.
pub struct UnconfiguredVenueAdapter;

#[async_trait]
impl VenueAdapter for UnconfiguredVenueAdapter {
    async fn open(&self, venue: Venue, _product: &ProductKey, _amount: Cents) -> HedgeResult<VenueFill> {
        Err(HedgeError::VenueUnavailable(venue, "no venue adapter configured".into()))
    }

    async fn close(&self, position: &insure_core::HedgePosition) -> HedgeResult<VenueClose> {
        Err(HedgeError::VenueUnavailable(position.venue, "no venue adapter configured".into()))
    }

    async fn quote(&self, venue: Venue, _product: &ProductKey, _amount: Cents) -> HedgeResult<Cents> {
        Err(HedgeError::VenueUnavailable(venue, "no venue adapter configured".into()))
    }

    async fn polymarket_markets(&self, _product: &ProductKey) -> HedgeResult<Vec<insure_hedge::venues::PolymarketMarket>> {
        Err(HedgeError::VenueUnavailable(Venue::Polymarket, "no venue adapter configured".into()))
    }

    async fn funding_rate_hourly(&self, venue: Venue, _product: &ProductKey) -> HedgeResult<f64> {
        Err(HedgeError::VenueUnavailable(venue, "no venue adapter configured".into()))
    }
}
