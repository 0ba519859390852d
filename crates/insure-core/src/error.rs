//! Error types for insure-core.

use thiserror::Error;

/// Core domain error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid price: {0}")]
    InvalidPrice(String),

    #[error("invalid coverage amount: {0}")]
    InvalidAmount(String),

    #[error("invalid product key: {0}")]
    InvalidProductKey(String),

    #[error("decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("pool invariant violated: {0}")]
    PoolInvariant(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
