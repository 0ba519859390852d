//! The security-edge middleware chain.
//!
//! Applied in order: request logging, body-size cap, bearer auth (gated by
//! the declared [`crate::auth::ProtectedRoute`] list), rate limiting, then
//! CORS (a `tower_http` layer, see [`crate::cors`]). Each stage can
//! short-circuit with its own [`SecurityError`] response before the request
//! reaches a handler.

use axum::body::Body;
use axum::extract::{ConnectInfo, Extension};
use axum::http::{HeaderName, HeaderValue, Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

use insure_core::ApiScope;
use insure_telemetry::Metrics;

use crate::auth::{ApiKeyStore, ProtectedRoute};
use crate::backend::{RateLimitBackend, RateLimitConfig, WINDOW_SECS};
use crate::error::SecurityError;

fn bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Logs one line per request with a generated request id and the caller's
/// address, inside a span so downstream `tracing` calls inherit both.
pub async fn request_logging(req: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let client_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let span = tracing::info_span!("request", %request_id, %client_ip, %method, %path);
    let _enter = span.enter();

    let start = Instant::now();
    let response = next.run(req).await;
    let elapsed_ms = start.elapsed().as_millis();

    info!(status = response.status().as_u16(), elapsed_ms, "request completed");
    response
}

/// Rejects requests whose declared `Content-Length` exceeds `max_bytes`.
/// Bodies that lie about their length are still bounded by axum's own
/// body-limit layer configured at the router level; this middleware is the
/// fast, header-only rejection path.
pub async fn size_cap(
    Extension(max_bytes): Extension<usize>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, SecurityError> {
    if let Some(len) = req
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
    {
        if len > max_bytes {
            return Err(SecurityError::BodyTooLarge(max_bytes));
        }
    }
    Ok(next.run(req).await)
}

/// Bearer-token auth, gated by the caller-declared [`ProtectedRoute`] list
/// (§4.1). A request matching no rule passes through unauthenticated;
/// `/api/v2/admin/*` always requires `Admin` regardless of the list.
pub async fn auth(
    Extension(store): Extension<ApiKeyStore>,
    Extension(protected): Extension<Arc<Vec<ProtectedRoute>>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, SecurityError> {
    let path = req.uri().path().to_string();
    let method = req.method().clone();

    let required_scopes: Option<Vec<ApiScope>> = if path.starts_with("/api/v2/admin/") {
        Some(vec![ApiScope::Admin])
    } else {
        protected
            .iter()
            .find(|route| path.starts_with(route.prefix.as_str()) && route.methods.contains(&method))
            .map(|route| route.scopes.clone())
    };

    let Some(required_scopes) = required_scopes else {
        return Ok(next.run(req).await);
    };

    let token = bearer_token(&req).ok_or(SecurityError::MissingAuth)?;
    let now = chrono::Utc::now().timestamp();
    store.authorize_any(token, &required_scopes, now).await?;
    Ok(next.run(req).await)
}

/// Sliding-window rate limit, keyed by API key when the caller presented
/// one and falling back to client IP otherwise (§4.1). Sets
/// `X-RateLimit-Limit`/`X-RateLimit-Remaining`/`X-RateLimit-Reset` on every
/// response, allowed or denied.
pub async fn rate_limit(
    Extension(backend): Extension<Arc<dyn RateLimitBackend>>,
    Extension(config): Extension<Arc<RateLimitConfig>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();

    let (identifier, source, authenticated) = match bearer_token(&req) {
        Some(token) => (format!("key:{}", crate::auth::hash_key(token)), "key", true),
        None => {
            let ip = req
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0.ip().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            (format!("ip:{ip}"), "ip", false)
        }
    };
    let limit = config.limit_for(&path, authenticated);

    let decision = backend.check(&identifier, limit).await;
    let mut response = if decision.allowed {
        Metrics::rate_limit_allowed(source);
        next.run(req).await
    } else {
        Metrics::rate_limit_blocked(source);
        SecurityError::RateLimited.into_response()
    };

    let headers = response.headers_mut();
    headers.insert(HeaderName::from_static("x-ratelimit-limit"), HeaderValue::from(decision.limit));
    headers.insert(HeaderName::from_static("x-ratelimit-remaining"), HeaderValue::from(decision.remaining));
    headers.insert(HeaderName::from_static("x-ratelimit-reset"), HeaderValue::from(WINDOW_SECS));
    response
}
