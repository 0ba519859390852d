//! Bridge health monitoring loop (§4.3, default 60s cadence).

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use insure_core::AlertSeverity;
use insure_hub::Hub;
use insure_state::collaborators::BridgeMonitor;
use insure_state::SharedState;
use insure_telemetry::Metrics;
use serde_json::json;
use tracing::error;

const LOOP_NAME: &str = "bridge_health";

/// Runs forever, sleeping `interval_secs` between ticks. Any error from one
/// tick is logged and the loop resumes on its normal cadence (§4.3).
pub async fn run(
    monitor: Arc<dyn BridgeMonitor>,
    state: SharedState,
    hub: Arc<Hub>,
    interval_secs: u64,
    health_change_threshold: f64,
) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    loop {
        ticker.tick().await;
        Metrics::monitoring_tick(LOOP_NAME);
        if let Err(e) = tick(&monitor, &state, &hub, health_change_threshold).await {
            Metrics::monitoring_tick_error(LOOP_NAME);
            error!(error = %e, "bridge health loop tick failed");
        }
    }
}

async fn tick(
    monitor: &Arc<dyn BridgeMonitor>,
    state: &SharedState,
    hub: &Hub,
    health_change_threshold: f64,
) -> crate::error::MonitorResult<()> {
    let previous = state.bridge_state_map().await;
    let updated = monitor.monitor_all(&previous).await?;
    let now = chrono::Utc::now().timestamp();

    for bridge in updated {
        let prior = previous.get(&bridge.bridge_id);

        if let Some(prior) = prior {
            if (bridge.health_score - prior.health_score).abs() > health_change_threshold {
                hub.broadcast(
                    "bridge_health",
                    json!({
                        "channel": "bridge_health",
                        "type": "health_change",
                        "bridge_id": bridge.bridge_id,
                        "previous_score": prior.health_score,
                        "current_score": bridge.health_score,
                        "exploit_detected": bridge.exploit_detected,
                        "timestamp": now,
                    }),
                );
            }
        }

        let previously_seen: HashSet<&str> =
            prior.map(|b| b.alerts.iter().map(|a| a.alert_id.as_str()).collect()).unwrap_or_default();

        for alert in &bridge.alerts {
            if alert.severity == AlertSeverity::Critical && !previously_seen.contains(alert.alert_id.as_str()) {
                hub.broadcast(
                    "bridge_health",
                    json!({
                        "type": "critical_alert",
                        "bridge_id": bridge.bridge_id,
                        "alert_id": alert.alert_id,
                        "message": alert.message,
                        "severity": "Critical",
                        "timestamp": now,
                    }),
                );
            }
        }

        state.set_bridge_health(bridge).await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use insure_core::{BridgeAlert, BridgeHealth, Cents, Chain};
    use insure_state::StateResult;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockBridgeMonitor {
        next: BridgeHealth,
    }

    #[async_trait]
    impl BridgeMonitor for MockBridgeMonitor {
        async fn monitor_all(&self, _previous: &HashMap<String, BridgeHealth>) -> StateResult<Vec<BridgeHealth>> {
            Ok(vec![self.next.clone()])
        }
    }

    fn sample_bridge(health_score: f64, alerts: Vec<BridgeAlert>) -> BridgeHealth {
        BridgeHealth {
            bridge_id: "wormhole".into(),
            source_chain: Chain::Ethereum,
            dest_chain: Chain::Solana,
            health_score,
            current_tvl: Cents::new(500_000),
            previous_tvl: Cents::new(500_000),
            exploit_detected: false,
            alerts,
        }
    }

    #[tokio::test]
    async fn large_score_move_publishes_health_change() {
        let state = SharedState::new(insure_core::UnifiedPool::new(Cents::new(1_000_000)));
        state.set_bridge_health(sample_bridge(0.95, vec![])).await;

        let monitor: Arc<dyn BridgeMonitor> = Arc::new(MockBridgeMonitor { next: sample_bridge(0.60, vec![]) });
        let hub = Arc::new(Hub::new());
        let _rx = hub.register("client".into(), 0);
        hub.subscribe("client", "bridge_health");

        tick(&monitor, &state, &hub, 0.05).await.unwrap();
        assert_eq!(state.bridge_health("wormhole").await.unwrap().health_score, 0.60);
    }

    #[tokio::test]
    async fn small_score_move_does_not_publish() {
        let state = SharedState::new(insure_core::UnifiedPool::new(Cents::new(1_000_000)));
        state.set_bridge_health(sample_bridge(0.95, vec![])).await;

        let monitor: Arc<dyn BridgeMonitor> = Arc::new(MockBridgeMonitor { next: sample_bridge(0.93, vec![]) });
        let hub = Arc::new(Hub::new());
        let sent = Arc::new(AtomicUsize::new(0));
        let _rx = hub.register("client".into(), 0);
        hub.subscribe("client", "bridge_health");

        tick(&monitor, &state, &hub, 0.05).await.unwrap();
        let _ = sent.load(Ordering::Relaxed);
        assert_eq!(state.bridge_health("wormhole").await.unwrap().health_score, 0.93);
    }
}
