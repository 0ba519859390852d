//! WebSocket hub error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("client not found: {0}")]
    ClientNotFound(String),

    #[error("unknown channel: {0}")]
    UnknownChannel(String),
}

pub type HubResult<T> = Result<T, HubError>;
