//! Claims monitor for the risk/hedging coordination plane (§4.4).
//!
//! Samples oracle prices against each active policy's trigger and floor,
//! computes the interpolated payout once a policy has been below trigger
//! for the configured number of samples, reserves the payout against pool
//! capital, and persists a record of every payout dispatched.

pub mod error;
pub mod monitor;

pub use error::{ClaimsError, ClaimsResult};
pub use monitor::{interpolate_payout, ClaimsMonitor, ClaimsMonitorConfig};
