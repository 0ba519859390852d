//! Claims-monitor error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClaimsError {
    #[error("policy not found: {0}")]
    NotFound(u64),

    #[error("policy not active: {0}")]
    NotActive(u64),

    #[error("insufficient capital for payout: policy {policy_id}, payout {payout_cents} cents")]
    InsufficientCapital { policy_id: u64, payout_cents: i64 },

    #[error("oracle error: {0}")]
    Oracle(#[from] insure_state::StateError),

    #[error("persistence error: {0}")]
    Persistence(#[from] insure_persistence::PersistenceError),
}

pub type ClaimsResult<T> = Result<T, ClaimsError>;
