//! The five background monitoring loops for the risk/hedging coordination
//! plane (§4.3). Each loop owns its own cadence and is crash-safe: a tick
//! that errors is logged and the loop resumes on its normal schedule, never
//! tearing down its peers.

pub mod bridge_health;
pub mod bridge_transactions;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod risk_snapshot;
pub mod tranche_apy;
pub mod top_products;

pub use collaborators::{BridgeTransaction, BridgeTransactionMonitor, BridgeTransactionStatus};
pub use config::MonitorConfig;
pub use error::{MonitorError, MonitorResult};
