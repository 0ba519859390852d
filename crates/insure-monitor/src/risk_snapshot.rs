//! Risk snapshot monitoring loop (§4.3, default 60s cadence).

use std::sync::Arc;
use std::time::Duration;

use insure_hub::Hub;
use insure_state::collaborators::RiskMonitor;
use insure_state::SharedState;
use insure_telemetry::Metrics;
use serde_json::json;
use tracing::error;

const LOOP_NAME: &str = "risk_snapshot";

pub async fn run(
    monitor: Arc<dyn RiskMonitor>,
    state: SharedState,
    hub: Arc<Hub>,
    interval_secs: u64,
    alert_dedup_window_secs: i64,
) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    loop {
        ticker.tick().await;
        Metrics::monitoring_tick(LOOP_NAME);
        if let Err(e) = tick(&monitor, &state, &hub, alert_dedup_window_secs).await {
            Metrics::monitoring_tick_error(LOOP_NAME);
            error!(error = %e, "risk snapshot loop tick failed");
        }
    }
}

async fn tick(
    monitor: &Arc<dyn RiskMonitor>,
    state: &SharedState,
    hub: &Hub,
    alert_dedup_window_secs: i64,
) -> crate::error::MonitorResult<()> {
    let pool = state.pool_snapshot().await;
    let previous = state.risk_snapshot().await;
    let snapshot = monitor.calculate_snapshot(&pool).await?;

    for alert in &snapshot.breach_alerts {
        let already_seen = previous.as_ref().is_some_and(|prev| {
            prev.breach_alerts
                .iter()
                .any(|p| p.message == alert.message && (p.timestamp - alert.timestamp).abs() <= alert_dedup_window_secs)
        });

        if !already_seen {
            hub.broadcast(
                "risk_alerts",
                json!({
                    "channel": "risk_alerts",
                    "type": "new_alert",
                    "alert_type": format!("{:?}", alert.alert_kind),
                    "severity": format!("{:?}", alert.severity),
                    "message": alert.message,
                    "current_value": alert.current_value,
                    "limit_value": alert.limit_value,
                    "timestamp": alert.timestamp,
                }),
            );
        }
    }

    state.set_risk_snapshot(snapshot).await;
    Ok(())
}
