//! Core domain types for the insurance risk/hedging coordination plane.
//!
//! This crate provides the fundamental types shared by every other crate in
//! the workspace: the `ProductKey` map key, `Policy`/`UnifiedPool` capital
//! ledger, `BridgeHealth`/`RiskSnapshot` monitored signals, the
//! `TriggerState` claims accumulator, and the `HedgeAllocation`/`HedgePosition`
//! hedge book. Money is always [`money::Cents`]; prices, ratios, and rates
//! are always [`money::Price`].

pub mod error;
pub mod money;
pub mod types;

pub use error::{CoreError, Result};
pub use money::{Cents, Price};
pub use types::{
    AlertKind, AlertSeverity, ApiKeyInfo, ApiScope, BridgeAlert, BridgeHealth, Chain, ClientState,
    CoverageKind, HedgeAllocation, HedgePosition, HedgePositionStatus, Policy, PolicyStatus,
    ProductExposure, ProductKey, RiskAlert, RiskSnapshot, Stablecoin, TopProduct, TriggerState,
    Venue, WS_CHANNELS, is_valid_channel,
};
