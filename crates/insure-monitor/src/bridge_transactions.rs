//! Bridge transactions monitoring loop (§4.3, default 5s cadence).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use insure_hub::Hub;
use insure_telemetry::Metrics;
use serde_json::json;
use tracing::error;

use crate::collaborators::BridgeTransactionMonitor;
use crate::collaborators::BridgeTransactionStatus;

const LOOP_NAME: &str = "bridge_transactions";

pub async fn run(monitor: Arc<dyn BridgeTransactionMonitor>, hub: Arc<Hub>, interval_secs: u64) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    let mut last_status: HashMap<String, BridgeTransactionStatus> = HashMap::new();
    loop {
        ticker.tick().await;
        Metrics::monitoring_tick(LOOP_NAME);
        if let Err(e) = tick(&monitor, &hub, &mut last_status).await {
            Metrics::monitoring_tick_error(LOOP_NAME);
            error!(error = %e, "bridge transactions loop tick failed");
        }
    }
}

async fn tick(
    monitor: &Arc<dyn BridgeTransactionMonitor>,
    hub: &Hub,
    last_status: &mut HashMap<String, BridgeTransactionStatus>,
) -> crate::error::MonitorResult<()> {
    let pending = monitor.pending_transactions().await?;

    for tx in pending {
        let changed = last_status.get(&tx.tx_id).map_or(true, |prior| *prior != tx.status);
        if changed {
            hub.broadcast(
                "bridge_transactions",
                json!({
                    "channel": "bridge_transactions",
                    "type": "status_update",
                    "tx_id": tx.tx_id,
                    "bridge_id": tx.bridge_id,
                    "status": tx.status,
                    "amount_cents": tx.amount_cents,
                    "timestamp": tx.timestamp,
                }),
            );
        }
        last_status.insert(tx.tx_id.clone(), tx.status);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::BridgeTransaction;
    use async_trait::async_trait;
    use insure_core::Cents;

    struct MockTxMonitor {
        txs: Vec<BridgeTransaction>,
    }

    #[async_trait]
    impl BridgeTransactionMonitor for MockTxMonitor {
        async fn pending_transactions(&self) -> crate::error::MonitorResult<Vec<BridgeTransaction>> {
            Ok(self.txs.clone())
        }
    }

    fn tx(tx_id: &str, status: BridgeTransactionStatus) -> BridgeTransaction {
        BridgeTransaction {
            tx_id: tx_id.into(),
            bridge_id: "wormhole".into(),
            status,
            amount_cents: Cents::new(10_000),
            timestamp: 0,
        }
    }

    #[tokio::test]
    async fn new_transaction_is_published_and_tracked() {
        let monitor: Arc<dyn BridgeTransactionMonitor> =
            Arc::new(MockTxMonitor { txs: vec![tx("abc", BridgeTransactionStatus::Pending)] });
        let hub = Arc::new(Hub::new());
        let mut last_status = HashMap::new();

        tick(&monitor, &hub, &mut last_status).await.unwrap();
        assert_eq!(last_status.get("abc"), Some(&BridgeTransactionStatus::Pending));
    }

    #[tokio::test]
    async fn unchanged_status_is_not_republished_but_stays_tracked() {
        let monitor: Arc<dyn BridgeTransactionMonitor> =
            Arc::new(MockTxMonitor { txs: vec![tx("abc", BridgeTransactionStatus::Confirmed)] });
        let hub = Arc::new(Hub::new());
        let mut last_status = HashMap::new();
        last_status.insert("abc".to_string(), BridgeTransactionStatus::Confirmed);

        tick(&monitor, &hub, &mut last_status).await.unwrap();
        assert_eq!(last_status.len(), 1);
    }
}
