//! Aggregated application error type (§7/§11).
//!
//! Every subsystem crate defines its own error; `AppError` collects them
//! with `#[from]` conversions and is the only error type a handler returns,
//! mapping the spec's error taxonomy onto concrete HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("core error: {0}")]
    Core(#[from] insure_core::CoreError),

    #[error("state error: {0}")]
    State(#[from] insure_state::StateError),

    #[error("risk error: {0}")]
    Risk(#[from] insure_risk::RiskError),

    #[error("claims error: {0}")]
    Claims(#[from] insure_claims::ClaimsError),

    #[error("hedge error: {0}")]
    Hedge(#[from] insure_hedge::HedgeError),

    #[error("persistence error: {0}")]
    Persistence(#[from] insure_persistence::PersistenceError),

    #[error("security error: {0}")]
    Security(#[from] insure_security::SecurityError),

    #[error("hub error: {0}")]
    Hub(#[from] insure_hub::HubError),

    #[error("monitor error: {0}")]
    Monitor(#[from] insure_monitor::MonitorError),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("policy state error: {0}")]
    PolicyState(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Security(inner) = self {
            return inner.into_response();
        }

        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PolicyState(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
