//! Tranche APY monitoring loop (§4.3, default 60s cadence). Publishes
//! unconditionally every tick; there is no previous-value diff.

use std::sync::Arc;
use std::time::Duration;

use insure_hub::Hub;
use insure_state::collaborators::UtilizationTracker;
use insure_telemetry::Metrics;
use serde_json::json;
use tracing::error;

const LOOP_NAME: &str = "tranche_apy";

pub async fn run(tracker: Arc<dyn UtilizationTracker>, hub: Arc<Hub>, interval_secs: u64) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    loop {
        ticker.tick().await;
        Metrics::monitoring_tick(LOOP_NAME);
        if let Err(e) = tick(&tracker, &hub).await {
            Metrics::monitoring_tick_error(LOOP_NAME);
            error!(error = %e, "tranche apy loop tick failed");
        }
    }
}

async fn tick(tracker: &Arc<dyn UtilizationTracker>, hub: &Hub) -> crate::error::MonitorResult<()> {
    let tranches = tracker.get_all_utilizations().await?;
    let now = chrono::Utc::now().timestamp();

    let payload: Vec<_> = tranches
        .iter()
        .map(|t| {
            json!({
                "tranche_id": t.tranche_id,
                "apy": t.apy,
                "utilization": t.utilization,
                "last_updated": t.last_updated,
            })
        })
        .collect();

    hub.broadcast(
        "tranche_apy",
        json!({
            "channel": "tranche_apy",
            "type": "apy_update",
            "tranches": payload,
            "timestamp": now,
        }),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use insure_core::Cents;
    use insure_state::collaborators::TrancheUtilization;
    use insure_state::StateResult;

    struct MockTracker;

    #[async_trait]
    impl UtilizationTracker for MockTracker {
        async fn get_all_utilizations(&self) -> StateResult<Vec<TrancheUtilization>> {
            Ok(vec![TrancheUtilization {
                tranche_id: "senior".into(),
                apy: 0.08,
                utilization: 0.6,
                total_capital: Cents::new(1_000_000),
                coverage_sold: Cents::new(600_000),
                last_updated: 100,
            }])
        }

        async fn get_available_capacity(&self, _tranche_id: &str) -> StateResult<Cents> {
            Ok(Cents::new(400_000))
        }
    }

    #[tokio::test]
    async fn publishes_unconditionally() {
        let tracker: Arc<dyn UtilizationTracker> = Arc::new(MockTracker);
        let hub = Arc::new(Hub::new());
        tick(&tracker, &hub).await.unwrap();
    }
}
