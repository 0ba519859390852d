//! Security-edge error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("missing or malformed authorization header")]
    MissingAuth,

    #[error("unknown api key")]
    UnknownKey,

    #[error("api key expired")]
    KeyExpired,

    #[error("api key lacks required scope: {0}")]
    ScopeDenied(String),

    #[error("request body exceeds size cap of {0} bytes")]
    BodyTooLarge(usize),

    #[error("origin not allowed: {0}")]
    OriginDenied(String),

    #[error("rate limit exceeded, retry after the current window")]
    RateLimited,
}

/// Seconds a rate-limited caller is told to wait before retrying (§4.1/§7:
/// a flat 60s, matching the sliding window's width).
pub const RATE_LIMIT_RETRY_AFTER_SECS: u64 = 60;

impl IntoResponse for SecurityError {
    fn into_response(self) -> Response {
        match self {
            SecurityError::BodyTooLarge(max_bytes) => {
                let max_size_mb = max_bytes as f64 / (1024.0 * 1024.0);
                let body = json!({ "error": "Request body too large", "max_size_mb": max_size_mb });
                (StatusCode::PAYLOAD_TOO_LARGE, axum::Json(body)).into_response()
            }
            SecurityError::RateLimited => {
                let body = json!({ "error": self.to_string(), "retry_after_seconds": RATE_LIMIT_RETRY_AFTER_SECS });
                let mut response = (StatusCode::TOO_MANY_REQUESTS, axum::Json(body)).into_response();
                response.headers_mut().insert(
                    axum::http::header::RETRY_AFTER,
                    axum::http::HeaderValue::from_str(&RATE_LIMIT_RETRY_AFTER_SECS.to_string())
                        .expect("digit string is always a valid header value"),
                );
                response
            }
            SecurityError::MissingAuth | SecurityError::UnknownKey | SecurityError::KeyExpired => {
                let body = json!({ "error": self.to_string() });
                (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
            }
            SecurityError::ScopeDenied(_) | SecurityError::OriginDenied(_) => {
                let body = json!({ "error": self.to_string() });
                (StatusCode::FORBIDDEN, axum::Json(body)).into_response()
            }
        }
    }
}

pub type SecurityResult<T> = Result<T, SecurityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn body_too_large_reports_megabytes_not_bytes() {
        let response = SecurityError::BodyTooLarge(10 * 1024 * 1024).into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Request body too large");
        assert_eq!(body["max_size_mb"], 10.0);
    }

    #[tokio::test]
    async fn rate_limited_sets_retry_after_header_and_field() {
        let response = SecurityError::RateLimited.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(axum::http::header::RETRY_AFTER).unwrap(), "60");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["retry_after_seconds"], 60);
    }
}
