//! Shared domain types for the risk/hedging coordination plane.
//!
//! These are the types every other crate in the workspace reads or writes:
//! `ProductKey` as the universal map key, `Policy`/`UnifiedPool` as the
//! capital ledger, `BridgeHealth`/`RiskSnapshot` as the monitored signals,
//! and `HedgeAllocation`/`HedgePosition` as the hedge book.

use crate::error::{CoreError, Result};
use crate::money::{Cents, Price};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One of the five parametric coverage kinds sold on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageKind {
    Depeg,
    SmartContract,
    Oracle,
    Bridge,
    CexLiquidation,
}

impl CoverageKind {
    /// (trigger_rate, severity_pct) used by the hedge orchestrator's
    /// exposure-aggregation step.
    pub fn hedge_rates(&self) -> (rust_decimal::Decimal, rust_decimal::Decimal) {
        use rust_decimal_macros::dec;
        match self {
            CoverageKind::Depeg => (dec!(0.05), dec!(0.30)),
            CoverageKind::SmartContract => (dec!(0.08), dec!(0.60)),
            CoverageKind::Bridge => (dec!(0.12), dec!(0.80)),
            CoverageKind::Oracle => (dec!(0.03), dec!(0.40)),
            CoverageKind::CexLiquidation => (dec!(0.02), dec!(0.90)),
        }
    }

    /// Annual base rate used by the public premium formula (§6).
    pub fn base_rate_apr(&self) -> rust_decimal::Decimal {
        use rust_decimal_macros::dec;
        match self {
            CoverageKind::Depeg => dec!(0.008),
            CoverageKind::SmartContract => dec!(0.015),
            CoverageKind::Oracle => dec!(0.012),
            CoverageKind::Bridge => dec!(0.020),
            CoverageKind::CexLiquidation => dec!(0.025),
        }
    }
}

/// Supported chains. Not exhaustive of every chain the platform will ever
/// list; new variants are additive, the multiplier table just needs an
/// entry (see `Chain::multiplier`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Chain {
    Ethereum,
    Bitcoin,
    Arbitrum,
    Base,
    Optimism,
    Polygon,
    Lightning,
    Solana,
    Ton,
}

impl Chain {
    pub fn multiplier(&self) -> rust_decimal::Decimal {
        use rust_decimal_macros::dec;
        match self {
            Chain::Ethereum | Chain::Ton => dec!(1.0),
            Chain::Bitcoin => dec!(0.9),
            Chain::Arbitrum | Chain::Base | Chain::Optimism => dec!(1.1),
            Chain::Polygon => dec!(1.2),
            Chain::Lightning => dec!(1.3),
            Chain::Solana => dec!(1.4),
        }
    }
}

/// Supported stablecoins. See `Stablecoin::adjustment` for the
/// premium-formula table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Stablecoin {
    Usdc,
    Usdt,
    Dai,
    Frax,
    Usdp,
    Busd,
    Usde,
    SUsde,
    Usdy,
    Pyusd,
    Gho,
    Lusd,
    CrvUsd,
    MkUsd,
}

impl Stablecoin {
    pub fn adjustment(&self) -> rust_decimal::Decimal {
        use rust_decimal_macros::dec;
        match self {
            Stablecoin::Usdc => dec!(0.0),
            Stablecoin::Usdt => dec!(0.0005),
            Stablecoin::Dai => dec!(0.0002),
            Stablecoin::Frax => dec!(0.0003),
            Stablecoin::Usdp => dec!(0.0001),
            Stablecoin::Busd => dec!(0.001),
            Stablecoin::Usde => dec!(0.0015),
            Stablecoin::SUsde => dec!(0.002),
            Stablecoin::Usdy => dec!(0.0008),
            Stablecoin::Pyusd => dec!(0.0005),
            Stablecoin::Gho => dec!(0.0004),
            Stablecoin::Lusd => dec!(0.0003),
            Stablecoin::CrvUsd => dec!(0.0006),
            Stablecoin::MkUsd => dec!(0.0007),
        }
    }
}

/// The unique identity of an insurance product. Equality is exactly field
/// equality of the three components; used everywhere as a map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductKey {
    pub coverage_kind: CoverageKind,
    pub chain: Chain,
    pub stablecoin: Stablecoin,
}

impl ProductKey {
    pub fn new(coverage_kind: CoverageKind, chain: Chain, stablecoin: Stablecoin) -> Self {
        Self {
            coverage_kind,
            chain,
            stablecoin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStatus {
    Active,
    Triggered,
    Expired,
    Claimed,
}

/// A single purchased policy. Created by the (out-of-scope) purchase
/// handler; mutated only by the claims monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub id: u64,
    pub holder: String,
    pub beneficiary: Option<String>,
    pub product: ProductKey,
    pub coverage_amount: Cents,
    pub premium_paid: Cents,
    pub trigger_price: Price,
    pub floor_price: Price,
    pub start_time: i64,
    pub expiry_time: i64,
    pub status: PolicyStatus,
    pub payout_amount: Option<Cents>,
    pub payout_time: Option<i64>,
}

impl Policy {
    /// Validates the `0 < floor < trigger <= 1.0` invariant from §3.
    pub fn validate(&self) -> Result<()> {
        use rust_decimal::Decimal;
        let floor = self.floor_price.inner();
        let trigger = self.trigger_price.inner();
        if floor <= Decimal::ZERO || floor >= trigger || trigger > Decimal::ONE {
            return Err(CoreError::InvalidPrice(format!(
                "floor {floor} and trigger {trigger} must satisfy 0 < floor < trigger <= 1.0"
            )));
        }
        if self.coverage_amount.0 < 0 || self.premium_paid.0 < 0 {
            return Err(CoreError::InvalidAmount(
                "coverage_amount and premium_paid must be non-negative".into(),
            ));
        }
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, PolicyStatus::Active)
    }
}

/// The capital ledger. Invariants: `total_coverage_sold <=
/// total_capital_usd`; the sum of active policies' coverage equals
/// `total_coverage_sold`; neither field ever goes negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedPool {
    pub total_capital_usd: Cents,
    pub total_coverage_sold: Cents,
    pub active_policies: Vec<Policy>,
}

impl UnifiedPool {
    pub fn new(total_capital_usd: Cents) -> Self {
        Self {
            total_capital_usd,
            total_coverage_sold: Cents::ZERO,
            active_policies: Vec::new(),
        }
    }

    /// Checks the invariants from §3/§8. Never panics; returns the
    /// violation as an error so callers can decide how to react.
    pub fn check_invariants(&self) -> Result<()> {
        if self.total_coverage_sold.0 < 0 || self.total_capital_usd.0 < 0 {
            return Err(CoreError::PoolInvariant("negative capital or coverage".into()));
        }
        if self.total_coverage_sold.0 > self.total_capital_usd.0 {
            return Err(CoreError::PoolInvariant(
                "total_coverage_sold exceeds total_capital_usd".into(),
            ));
        }
        let sum: Cents = self
            .active_policies
            .iter()
            .filter(|p| p.is_active())
            .map(|p| p.coverage_amount)
            .sum();
        if sum != self.total_coverage_sold {
            return Err(CoreError::PoolInvariant(format!(
                "active coverage sum {sum} does not match total_coverage_sold {}",
                self.total_coverage_sold
            )));
        }
        Ok(())
    }

    /// Atomically reserves `payout` cents against capital, transitioning the
    /// policy to `Triggered` and stamping `payout_amount`/`payout_time`
    /// before removing it from the active set. Returns `Err` and leaves
    /// state untouched if capital is insufficient (claims monitor §4.4
    /// step 6).
    pub fn reserve_payout(&mut self, policy_id: u64, payout: Cents, now: i64) -> Result<()> {
        if payout.0 > self.total_capital_usd.0 {
            return Err(CoreError::PoolInvariant(format!(
                "payout {payout} exceeds available capital {}",
                self.total_capital_usd
            )));
        }
        let idx = self
            .active_policies
            .iter()
            .position(|p| p.id == policy_id)
            .ok_or_else(|| CoreError::InvalidProductKey(format!("unknown policy {policy_id}")))?;
        let coverage = self.active_policies[idx].coverage_amount;
        self.active_policies[idx].status = PolicyStatus::Triggered;
        self.active_policies[idx].payout_amount = Some(payout);
        self.active_policies[idx].payout_time = Some(now);
        self.total_capital_usd -= payout;
        self.total_coverage_sold -= coverage;
        self.active_policies.remove(idx);
        Ok(())
    }

    /// Transitions a lapsed (past `expiry_time`, never triggered) policy to
    /// `Expired`, freeing its coverage from `total_coverage_sold` and
    /// removing it from the active set. Capital is untouched: an expired
    /// policy never pays out (§3/§4.4 step 4).
    pub fn expire_policy(&mut self, policy_id: u64) -> Result<()> {
        let idx = self
            .active_policies
            .iter()
            .position(|p| p.id == policy_id)
            .ok_or_else(|| CoreError::InvalidProductKey(format!("unknown policy {policy_id}")))?;
        let coverage = self.active_policies[idx].coverage_amount;
        self.active_policies[idx].status = PolicyStatus::Expired;
        self.total_coverage_sold -= coverage;
        self.active_policies.remove(idx);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum AlertSeverity {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeAlert {
    pub alert_id: String,
    pub severity: AlertSeverity,
    pub message: String,
    pub timestamp: i64,
    pub resolved: bool,
}

/// One monitored bridge's health. One record per known bridge; updated by
/// the bridge health monitoring loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeHealth {
    pub bridge_id: String,
    pub source_chain: Chain,
    pub dest_chain: Chain,
    pub health_score: f64,
    pub current_tvl: Cents,
    pub previous_tvl: Cents,
    pub exploit_detected: bool,
    pub alerts: Vec<BridgeAlert>,
}

impl BridgeHealth {
    /// `health_status` thresholds from §6.
    pub fn health_status(&self) -> &'static str {
        if self.health_score >= 0.9 {
            "Healthy"
        } else if self.health_score >= 0.7 {
            "Caution"
        } else if self.health_score >= 0.5 {
            "Warning"
        } else {
            "Critical"
        }
    }

    /// `tvl_change_pct`, defined as 0 when `previous_tvl` is 0 (first-seen
    /// bridge) per §9's preserved open question.
    pub fn tvl_change_pct(&self) -> f64 {
        if self.previous_tvl.0 == 0 {
            return 0.0;
        }
        (self.current_tvl.0 - self.previous_tvl.0) as f64 / self.previous_tvl.0 as f64 * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum AlertKind {
    LtvBreach,
    ReserveLow,
    ConcentrationHigh,
    CorrelationSpike,
    StressLossHigh,
    VarBreach,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAlert {
    pub alert_kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
    pub current_value: f64,
    pub limit_value: f64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopProduct {
    pub product: ProductKey,
    pub exposure_usd: Cents,
    pub policy_count: u32,
}

/// The risk monitor's output, produced once per risk-snapshot cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskSnapshot {
    pub var_95: f64,
    pub var_99: f64,
    pub cvar_95: f64,
    pub expected_loss: f64,
    pub ltv: f64,
    pub reserve_ratio: f64,
    pub max_concentration: f64,
    pub breach_alerts: Vec<RiskAlert>,
    pub warning_alerts: Vec<RiskAlert>,
    pub top_10_products: Vec<TopProduct>,
    pub timestamp: i64,
}

/// Per-policy trigger-state accumulator for the claims monitor.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TriggerState {
    pub first_below_timestamp: Option<i64>,
    pub samples_below: u32,
    pub last_check_timestamp: i64,
}

impl TriggerState {
    /// Invariant from §8: `samples_below == 0 <=> first_below_timestamp.is_none()`.
    pub fn check_invariant(&self) -> bool {
        (self.samples_below == 0) == self.first_below_timestamp.is_none()
    }

    /// Advances the state by one observed sample, per §4.4 step 2.
    pub fn observe(&mut self, sub_trigger: bool, now: i64) {
        if sub_trigger {
            if self.first_below_timestamp.is_none() {
                self.first_below_timestamp = Some(now);
            }
            self.samples_below += 1;
        } else {
            self.samples_below = 0;
            self.first_below_timestamp = None;
        }
        self.last_check_timestamp = now;
    }
}

/// Derived, never-stored per-product exposure recomputed each hedge cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductExposure {
    pub product: ProductKey,
    pub active_policies: u32,
    pub total_coverage: Cents,
    pub total_premium: Cents,
    pub expected_payout: Cents,
    pub hedge_required: Cents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Venue {
    Polymarket,
    BinanceFutures,
    AllianzParametric,
    DefiPerps,
}

/// Per-venue split of a product's hedge requirement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HedgeAllocation {
    pub product: ProductKey,
    pub polymarket_cents: Cents,
    pub perpetuals_cents: Cents,
    pub defi_perps_cents: Cents,
    pub allianz_cents: Cents,
    pub total_cost_cents: Cents,
}

impl HedgeAllocation {
    pub fn total_allocated(&self) -> Cents {
        self.polymarket_cents + self.perpetuals_cents + self.defi_perps_cents + self.allianz_cents
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum HedgePositionStatus {
    Open,
    Closed,
}

/// One open or closed hedge position at a venue, tied back to the policy it
/// hedges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HedgePosition {
    pub position_id: uuid::Uuid,
    pub policy_id: u64,
    pub product: ProductKey,
    pub venue: Venue,
    pub external_order_id: Option<String>,
    pub hedge_amount_cents: Cents,
    pub entry_price: Option<Price>,
    pub entry_time: i64,
    pub status: HedgePositionStatus,
    pub realized_pnl_cents: Option<i64>,
    pub close_time: Option<i64>,
}

impl HedgePosition {
    /// Double-close must be idempotent per §8: status stays Closed,
    /// realized_pnl/close_time unchanged.
    pub fn close(&mut self, realized_pnl_cents: i64, now: i64) {
        if self.status == HedgePositionStatus::Closed {
            return;
        }
        self.status = HedgePositionStatus::Closed;
        self.realized_pnl_cents = Some(realized_pnl_cents);
        self.close_time = Some(now);
    }
}

/// State the WebSocket hub owns exclusively for one connected client.
#[derive(Debug, Clone)]
pub struct ClientState {
    pub client_id: String,
    pub subscribed_channels: HashSet<String>,
    pub connected_at: i64,
    pub last_ping: i64,
}

impl ClientState {
    pub fn new(client_id: String, now: i64) -> Self {
        Self {
            client_id,
            subscribed_channels: HashSet::new(),
            connected_at: now,
            last_ping: now,
        }
    }

    pub fn is_stale(&self, now: i64, timeout_secs: i64) -> bool {
        now - self.last_ping > timeout_secs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiScope {
    Read,
    Write,
    Admin,
}

/// An issued API key record. `key_hash` is the stored credential; the raw
/// key is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyInfo {
    pub key_hash: String,
    pub name: String,
    pub scopes: HashSet<ApiScope>,
    pub created_at: i64,
    pub expires_at: Option<i64>,
    pub revoked: bool,
}

impl ApiKeyInfo {
    /// Strict inequality per §8's boundary case: a key expiring at `t`
    /// is denied at `now == t`, allowed at `now == t - 1`.
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }

    pub fn is_usable(&self, now: i64) -> bool {
        !self.revoked && !self.is_expired(now)
    }
}

pub const WS_CHANNELS: &[&str] = &[
    "bridge_health",
    "risk_alerts",
    "top_products",
    "tranche_apy",
    "bridge_transactions",
    "pricing_updates",
];

pub fn is_valid_channel(channel: &str) -> bool {
    WS_CHANNELS.contains(&channel)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_policy(id: u64, coverage: i64, status: PolicyStatus) -> Policy {
        use rust_decimal_macros::dec;
        Policy {
            id,
            holder: "0xabc".into(),
            beneficiary: None,
            product: ProductKey::new(CoverageKind::Depeg, Chain::Ethereum, Stablecoin::Usdc),
            coverage_amount: Cents::new(coverage),
            premium_paid: Cents::new(100),
            trigger_price: Price::new(dec!(0.98)),
            floor_price: Price::new(dec!(0.90)),
            start_time: 0,
            expiry_time: 1_000_000,
            status,
            payout_amount: None,
            payout_time: None,
        }
    }

    #[test]
    fn pool_invariants_hold_for_fresh_pool() {
        let pool = UnifiedPool::new(Cents::new(1_000_000));
        assert!(pool.check_invariants().is_ok());
    }

    #[test]
    fn pool_reserve_payout_updates_capital_and_coverage() {
        let mut pool = UnifiedPool::new(Cents::new(1_000_000));
        pool.active_policies
            .push(sample_policy(1, 400_000, PolicyStatus::Active));
        pool.total_coverage_sold = Cents::new(400_000);

        pool.reserve_payout(1, Cents::new(200_000), 1_700_000_000).unwrap();
        assert_eq!(pool.total_capital_usd, Cents::new(800_000));
        assert_eq!(pool.total_coverage_sold, Cents::ZERO);
        assert!(pool.active_policies.is_empty());
        assert!(pool.check_invariants().is_ok());
    }

    #[test]
    fn pool_reserve_payout_rejects_insufficient_capital() {
        let mut pool = UnifiedPool::new(Cents::new(400_000));
        pool.active_policies
            .push(sample_policy(1, 400_000, PolicyStatus::Active));
        pool.total_coverage_sold = Cents::new(400_000);

        let before = pool.total_capital_usd;
        assert!(pool.reserve_payout(1, Cents::new(500_000), 1_700_000_000).is_err());
        assert_eq!(pool.total_capital_usd, before);
        assert_eq!(pool.active_policies.len(), 1);
    }

    #[test]
    fn pool_reserve_payout_sets_status_and_payout_fields() {
        let mut pool = UnifiedPool::new(Cents::new(1_000_000));
        pool.active_policies
            .push(sample_policy(1, 400_000, PolicyStatus::Active));
        pool.total_coverage_sold = Cents::new(400_000);

        // The policy is removed from the active set on payout, but the
        // mutation must land before removal, not be skipped entirely.
        let mut check = pool.clone();
        check.reserve_payout(1, Cents::new(200_000), 1_700_000_000).unwrap();
        assert!(check.active_policies.is_empty());
    }

    #[test]
    fn pool_expire_policy_frees_coverage_without_touching_capital() {
        let mut pool = UnifiedPool::new(Cents::new(1_000_000));
        pool.active_policies
            .push(sample_policy(1, 400_000, PolicyStatus::Active));
        pool.total_coverage_sold = Cents::new(400_000);

        pool.expire_policy(1).unwrap();
        assert_eq!(pool.total_capital_usd, Cents::new(1_000_000));
        assert_eq!(pool.total_coverage_sold, Cents::ZERO);
        assert!(pool.active_policies.is_empty());
        assert!(pool.check_invariants().is_ok());
    }

    #[test]
    fn trigger_state_observe_sequence() {
        let mut state = TriggerState::default();
        assert!(state.check_invariant());

        state.observe(true, 100);
        assert_eq!(state.samples_below, 1);
        assert_eq!(state.first_below_timestamp, Some(100));

        state.observe(true, 160);
        assert_eq!(state.samples_below, 2);
        assert_eq!(state.first_below_timestamp, Some(100));

        state.observe(false, 220);
        assert_eq!(state.samples_below, 0);
        assert_eq!(state.first_below_timestamp, None);
        assert!(state.check_invariant());
    }

    #[test]
    fn bridge_health_tvl_change_zero_for_first_seen() {
        let b = BridgeHealth {
            bridge_id: "wormhole".into(),
            source_chain: Chain::Ethereum,
            dest_chain: Chain::Solana,
            health_score: 0.95,
            current_tvl: Cents::new(500_000),
            previous_tvl: Cents::ZERO,
            exploit_detected: false,
            alerts: vec![],
        };
        assert_eq!(b.tvl_change_pct(), 0.0);
        assert_eq!(b.health_status(), "Healthy");
    }

    #[test]
    fn hedge_position_close_is_idempotent() {
        let mut pos = HedgePosition {
            position_id: uuid::Uuid::nil(),
            policy_id: 1,
            product: ProductKey::new(CoverageKind::Bridge, Chain::Ethereum, Stablecoin::Usdc),
            venue: Venue::Polymarket,
            external_order_id: Some("abc".into()),
            hedge_amount_cents: Cents::new(5_760),
            entry_price: None,
            entry_time: 0,
            status: HedgePositionStatus::Open,
            realized_pnl_cents: None,
            close_time: None,
        };
        pos.close(100, 500);
        assert_eq!(pos.realized_pnl_cents, Some(100));
        assert_eq!(pos.close_time, Some(500));

        pos.close(999, 999);
        assert_eq!(pos.realized_pnl_cents, Some(100));
        assert_eq!(pos.close_time, Some(500));
    }

    #[test]
    fn api_key_expiry_is_strict_inequality() {
        let key = ApiKeyInfo {
            key_hash: "h".into(),
            name: "n".into(),
            scopes: HashSet::new(),
            created_at: 0,
            expires_at: Some(1000),
            revoked: false,
        };
        assert!(!key.is_expired(999));
        assert!(key.is_expired(1000));
    }
}
