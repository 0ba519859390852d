//! WebSocket hub configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub port: u16,
    /// Cadence of the heartbeat reaper (§4.2).
    pub heartbeat_interval_secs: u64,
    /// A client is reaped once `now - last_ping` exceeds this.
    pub client_timeout_secs: i64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            heartbeat_interval_secs: 30,
            client_timeout_secs: 300,
        }
    }
}
