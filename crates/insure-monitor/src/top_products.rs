//! Top products monitoring loop (§4.3, default 120s cadence).
//!
//! Rides on the RiskSnapshot the risk-snapshot loop already publishes; this
//! loop owns only the "last published ranking" it diffs against, since
//! ranking history isn't part of Shared State's owned fields.

use std::sync::Arc;
use std::time::Duration;

use insure_core::ProductKey;
use insure_hub::Hub;
use insure_state::SharedState;
use insure_telemetry::Metrics;
use serde_json::json;

const LOOP_NAME: &str = "top_products";

pub async fn run(state: SharedState, hub: Arc<Hub>, interval_secs: u64) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    let mut last_ranking: Option<Vec<ProductKey>> = None;
    loop {
        ticker.tick().await;
        Metrics::monitoring_tick(LOOP_NAME);
        tick(&state, &hub, &mut last_ranking).await;
    }
}

async fn tick(state: &SharedState, hub: &Hub, last_ranking: &mut Option<Vec<ProductKey>>) {
    let Some(snapshot) = state.risk_snapshot().await else {
        return;
    };

    let ranking: Vec<ProductKey> = snapshot.top_10_products.iter().map(|p| p.product).collect();
    if last_ranking.as_ref() == Some(&ranking) {
        return;
    }

    let now = chrono::Utc::now().timestamp();
    let products: Vec<_> = snapshot
        .top_10_products
        .iter()
        .map(|p| {
            json!({
                "coverage_type": format!("{:?}", p.product.coverage_kind),
                "chain": format!("{:?}", p.product.chain),
                "stablecoin": format!("{:?}", p.product.stablecoin),
                "exposure_usd": p.exposure_usd,
                "policy_count": p.policy_count,
            })
        })
        .collect();

    hub.broadcast(
        "top_products",
        json!({
            "channel": "top_products",
            "type": "ranking_update",
            "products": products,
            "timestamp": now,
        }),
    );
    *last_ranking = Some(ranking);
}
