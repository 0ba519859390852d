//! Shared state and collaborator contracts for the risk/hedging
//! coordination plane.
//!
//! `SharedState` is the single owner of the capital ledger, the bridge
//! health map, and the latest risk snapshot (§3/§5: single writer per
//! field, many concurrent readers). `collaborators` defines the abstract
//! interfaces the core consumes for everything deliberately out of scope
//! (oracle feeds, bridge scanners, venue quotes) per §6.

pub mod collaborators;
pub mod error;
pub mod shared;

pub use collaborators::{
    BridgeMonitor, OracleAdapter, PoolRepository, RiskMonitor, TrancheUtilization, UtilizationTracker,
};
pub use error::{StateError, StateResult};
pub use shared::SharedState;
