//! Bearer API-key authentication and scope checks.
//!
//! Keys are presented as `Authorization: Bearer <raw-key>`. Only the
//! SHA-256 hash of the raw key is ever stored or compared, mirroring the
//! "never persist the raw secret" discipline of password/token handling
//! elsewhere in the corpus.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use insure_core::{ApiKeyInfo, ApiScope};
use insure_telemetry::Metrics;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::SecurityError;

/// Hashes a raw bearer token the same way keys are hashed at issuance time.
pub fn hash_key(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// In-memory store of issued API keys, keyed by `key_hash`.
#[derive(Clone, Default)]
pub struct ApiKeyStore {
    keys: Arc<RwLock<HashMap<String, ApiKeyInfo>>>,
}

impl ApiKeyStore {
    pub fn new(keys: HashMap<String, ApiKeyInfo>) -> Self {
        Self {
            keys: Arc::new(RwLock::new(keys)),
        }
    }

    pub async fn insert(&self, info: ApiKeyInfo) {
        self.keys.write().await.insert(info.key_hash.clone(), info);
    }

    /// Validates a raw bearer token against a required scope.
    pub async fn authorize(&self, raw_key: &str, required: ApiScope, now: i64) -> Result<ApiKeyInfo, SecurityError> {
        self.authorize_any(raw_key, &[required], now).await
    }

    /// Validates a raw bearer token against a set of scopes, any one of
    /// which satisfies the check (§4.1: a protected route rejects only if
    /// the key lacks *both* `write` and `admin`).
    pub async fn authorize_any(&self, raw_key: &str, required: &[ApiScope], now: i64) -> Result<ApiKeyInfo, SecurityError> {
        let hash = hash_key(raw_key);
        let keys = self.keys.read().await;
        let info = keys.get(&hash).cloned().ok_or(SecurityError::UnknownKey)?;

        if !info.is_usable(now) {
            return Err(SecurityError::KeyExpired);
        }
        if !required.iter().any(|s| info.scopes.contains(s)) {
            return Err(SecurityError::ScopeDenied(format!("{required:?}")));
        }
        Ok(info)
    }
}

/// A (path-prefix, methods, required-scopes) rule declared by the caller
/// (§4.1): a request matching none of these passes through unauthenticated.
/// The `/api/v2/admin/*` prefix always requires `Admin` regardless of this
/// list — see [`crate::middleware::auth`].
#[derive(Debug, Clone)]
pub struct ProtectedRoute {
    pub prefix: String,
    pub methods: Vec<axum::http::Method>,
    pub scopes: Vec<ApiScope>,
}

impl ProtectedRoute {
    pub fn new(prefix: impl Into<String>, methods: Vec<axum::http::Method>, scopes: Vec<ApiScope>) -> Self {
        Self {
            prefix: prefix.into(),
            methods,
            scopes,
        }
    }
}

/// Extractor that authenticates a request's bearer token against the
/// `Read` scope. Handlers requiring `Write`/`Admin` call
/// [`ApiKeyStore::authorize`] directly with the stronger scope once they
/// have the `ApiKeyStore` from app state.
pub struct AuthenticatedKey(pub ApiKeyInfo);

fn bearer_token(parts: &Parts) -> Result<&str, SecurityError> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(SecurityError::MissingAuth)
}

impl<S> FromRequestParts<S> for AuthenticatedKey
where
    S: Send + Sync,
    ApiKeyStore: axum::extract::FromRef<S>,
{
    type Rejection = SecurityError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let store = ApiKeyStore::from_ref(state);
        let token = match bearer_token(parts) {
            Ok(token) => token,
            Err(e) => {
                Metrics::auth_rejected("missing_auth");
                return Err(e);
            }
        };
        let now = chrono::Utc::now().timestamp();
        match store.authorize(token, ApiScope::Read, now).await {
            Ok(info) => Ok(AuthenticatedKey(info)),
            Err(e) => {
                Metrics::auth_rejected(match &e {
                    SecurityError::UnknownKey => "unknown_key",
                    SecurityError::KeyExpired => "key_expired",
                    SecurityError::ScopeDenied(_) => "scope_denied",
                    _ => "other",
                });
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn key(scopes: &[ApiScope], expires_at: Option<i64>, revoked: bool) -> ApiKeyInfo {
        ApiKeyInfo {
            key_hash: hash_key("raw-secret"),
            name: "test".into(),
            scopes: scopes.iter().cloned().collect::<HashSet<_>>(),
            created_at: 0,
            expires_at,
            revoked,
        }
    }

    #[tokio::test]
    async fn unknown_key_rejected() {
        let store = ApiKeyStore::default();
        let err = store.authorize("nope", ApiScope::Read, 0).await.unwrap_err();
        assert!(matches!(err, SecurityError::UnknownKey));
    }

    #[tokio::test]
    async fn scope_denied_when_missing() {
        let store = ApiKeyStore::default();
        store.insert(key(&[ApiScope::Read], None, false)).await;
        let err = store.authorize("raw-secret", ApiScope::Admin, 0).await.unwrap_err();
        assert!(matches!(err, SecurityError::ScopeDenied(_)));
    }

    #[tokio::test]
    async fn expired_key_rejected() {
        let store = ApiKeyStore::default();
        store.insert(key(&[ApiScope::Admin], Some(100), false)).await;
        let err = store.authorize("raw-secret", ApiScope::Admin, 100).await.unwrap_err();
        assert!(matches!(err, SecurityError::KeyExpired));
    }

    #[tokio::test]
    async fn valid_key_with_scope_succeeds() {
        let store = ApiKeyStore::default();
        store.insert(key(&[ApiScope::Admin], None, false)).await;
        let info = store.authorize("raw-secret", ApiScope::Admin, 0).await.unwrap();
        assert_eq!(info.name, "test");
    }
}
