//! Cadences for the five background monitoring loops (§4.3).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub bridge_health_interval_secs: u64,
    pub risk_snapshot_interval_secs: u64,
    pub top_products_interval_secs: u64,
    pub tranche_apy_interval_secs: u64,
    pub bridge_transactions_interval_secs: u64,
    /// A bridge's health_change event fires when the score moves by more
    /// than this in one tick.
    pub health_change_threshold: f64,
    /// A breach alert counts as "the same one" across snapshots when its
    /// message matches and its timestamp is within this many seconds.
    pub alert_dedup_window_secs: i64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            bridge_health_interval_secs: 60,
            risk_snapshot_interval_secs: 60,
            top_products_interval_secs: 120,
            tranche_apy_interval_secs: 60,
            bridge_transactions_interval_secs: 5,
            health_change_threshold: 0.05,
            alert_dedup_window_secs: 10,
        }
    }
}
