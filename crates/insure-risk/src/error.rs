//! Risk-monitor error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RiskError {
    #[error("risk limit config error: {0}")]
    ConfigError(String),

    #[error("data unavailable: {0}")]
    DataUnavailable(String),
}

pub type RiskResult<T> = Result<T, RiskError>;
