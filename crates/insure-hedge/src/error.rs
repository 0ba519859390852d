//! Hedge orchestrator error types.

use insure_core::Venue;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HedgeError {
    #[error("state error: {0}")]
    State(#[from] insure_state::StateError),

    #[error("persistence error: {0}")]
    Persistence(#[from] insure_persistence::PersistenceError),

    #[error("venue {0:?} unavailable: {1}")]
    VenueUnavailable(Venue, String),

    #[error("invalid hedge configuration: {0}")]
    ConfigInvalid(String),
}

pub type HedgeResult<T> = Result<T, HedgeError>;
