//! Configurable thresholds the risk monitor checks each cycle.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskLimits {
    pub max_ltv: f64,
    pub min_reserve_ratio: f64,
    pub max_concentration: f64,
    pub max_var_95: f64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_ltv: 0.85,
            min_reserve_ratio: 0.15,
            max_concentration: 0.25,
            max_var_95: 0.20,
        }
    }
}
