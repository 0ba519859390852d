//! The one collaborator contract that isn't shared across crates: pending
//! bridge-transaction polling, used only by the bridge-transactions loop.

use async_trait::async_trait;
use insure_core::Cents;
use serde::{Deserialize, Serialize};

use crate::error::MonitorResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeTransactionStatus {
    Pending,
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeTransaction {
    pub tx_id: String,
    pub bridge_id: String,
    pub status: BridgeTransactionStatus,
    pub amount_cents: Cents,
    pub timestamp: i64,
}

#[async_trait]
pub trait BridgeTransactionMonitor: Send + Sync {
    async fn pending_transactions(&self) -> MonitorResult<Vec<BridgeTransaction>>;
}
