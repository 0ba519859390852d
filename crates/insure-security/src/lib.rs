//! HTTP security edge for the risk/hedging coordination plane.
//!
//! Every inbound request passes through, in order: request logging,
//! body-size cap, bearer-token auth, rate limiting, and CORS. None of
//! these are optional per route; `insure-api` wires the whole chain once
//! at router construction.

pub mod auth;
pub mod backend;
pub mod cors;
pub mod error;
pub mod middleware;

pub use auth::{ApiKeyStore, AuthenticatedKey, ProtectedRoute, hash_key};
pub use backend::{InMemoryBackend, RateLimitBackend, RateLimitConfig, RateLimitDecision, RedisBackend, select_backend};
pub use error::{SecurityError, SecurityResult};
