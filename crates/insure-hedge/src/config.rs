//! Tunable knobs for the hedge orchestrator (§4.5/§9).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HedgeConfig {
    pub polymarket_weight: f64,
    pub perpetuals_weight: f64,
    pub defi_perps_weight: f64,
    pub allianz_weight: f64,
    /// External-hedge ratio applied to expected_payout to get hedge_required.
    pub total_hedge_ratio: f64,
    pub min_hedge_amount_cents: i64,
    pub rebalance_threshold: f64,
    pub check_interval_seconds: u64,
}

impl Default for HedgeConfig {
    fn default() -> Self {
        Self {
            polymarket_weight: 0.30,
            perpetuals_weight: 0.30,
            defi_perps_weight: 0.30,
            allianz_weight: 0.10,
            total_hedge_ratio: 0.20,
            min_hedge_amount_cents: 10_000,
            rebalance_threshold: 0.10,
            check_interval_seconds: 300,
        }
    }
}

impl HedgeConfig {
    /// §4.5 Step B requires the four venue weights to sum to 1.0.
    pub fn validate(&self) -> Result<(), String> {
        let sum = self.polymarket_weight + self.perpetuals_weight + self.defi_perps_weight + self.allianz_weight;
        if (sum - 1.0).abs() > 1e-9 {
            return Err(format!("venue weights must sum to 1.0, got {sum}"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_sum_to_one() {
        assert!(HedgeConfig::default().validate().is_ok());
    }

    #[test]
    fn unbalanced_weights_rejected() {
        let mut config = HedgeConfig::default();
        config.allianz_weight = 0.5;
        assert!(config.validate().is_err());
    }
}
