//! Strict-allowlist CORS.
//!
//! The reference middleware this crate is grounded on
//! (`omo-protocol-defi-flow::api::mod::serve`) wires up
//! `CorsLayer::new().allow_origin(Any)`. A coordination plane that brokers
//! hedge orders and payout records must not do that: only configured
//! origins are allowed, and everything else is denied rather than
//! silently stripped of CORS headers.

use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Builds a `CorsLayer` that allows only the given origins, `GET`/`POST`
/// methods, and the headers this API actually uses.
pub fn strict_allowlist(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([axum::http::header::AUTHORIZATION, axum::http::header::CONTENT_TYPE])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_layer_without_panicking_on_malformed_origin() {
        let origins = vec!["https://app.example.com".to_string(), "not a header value \u{0}".to_string()];
        let _layer = strict_allowlist(&origins);
    }
}
