//! Shared-state and collaborator-interface error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("bridge not found: {0}")]
    BridgeNotFound(String),

    #[error("pool invariant violated: {0}")]
    PoolInvariant(#[from] insure_core::CoreError),

    #[error("collaborator network error: {0}")]
    Network(String),

    #[error("collaborator returned malformed data: {0}")]
    Malformed(String),
}

pub type StateResult<T> = Result<T, StateError>;
