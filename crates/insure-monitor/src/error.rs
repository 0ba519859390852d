//! Monitoring loop error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("state error: {0}")]
    State(#[from] insure_state::StateError),
}

pub type MonitorResult<T> = Result<T, MonitorError>;
