//! Application orchestration: router assembly and background-loop wiring.
//!
//! Mirrors the teacher's `Application` entry point — one place that owns
//! every long-running task and the HTTP router, built from one shared
//! `insure_state::SharedState` instance.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::Extension;
use axum::middleware::from_fn;
use axum::routing::{get, options, post};
use axum::Router;
use tracing::{error, info};

use insure_claims::ClaimsMonitor;
use insure_core::{ApiKeyInfo, UnifiedPool};
use insure_hedge::HedgeOrchestrator;
use insure_persistence::{HedgeEventWriter, PayoutWriter};
use insure_security::middleware::{auth, rate_limit, request_logging, size_cap};
use insure_security::{ApiKeyStore, ProtectedRoute, RateLimitBackend};
use insure_state::SharedState;

use crate::adapters::{
    UnconfiguredBridgeMonitor, UnconfiguredBridgeTransactionMonitor, UnconfiguredOracleAdapter,
    UnconfiguredUtilizationTracker, UnconfiguredVenueAdapter,
};
use crate::config::AppConfig;
use crate::handlers;
use crate::state::ApiState;

/// Routes the declared auth middleware gates before it reaches the rest of
/// the chain (§4.1). Empty: this workspace implements no `write`/`admin`
/// REST surface of its own (the admin config CRUD is out of scope, §1), but
/// the `/api/v2/admin/*` prefix is still enforced unconditionally inside
/// `insure_security::middleware::auth`. Kept as a named, extensible list so
/// a future protected route is one entry, not a new layer.
fn protected_routes() -> Vec<ProtectedRoute> {
    Vec::new()
}

/// Builds the axum router. `.layer()` calls are applied bottom-to-top, so
/// the *last* call here is the *outermost* layer and runs first on the
/// request path. Reading bottom-up gives the declared order (§4.1):
/// logging → size-cap → auth → rate-limit → CORS, CORS innermost and
/// closest to the handler. Each `Extension` is layered strictly outside the
/// `from_fn` middleware that consumes it, so the extension is already in
/// the request by the time that middleware runs.
pub fn build_router(config: &AppConfig, state: ApiState, rate_limit_backend: Arc<dyn RateLimitBackend>) -> Router {
    let api_keys = state.api_keys.clone();
    let protected = Arc::new(protected_routes());
    let rate_limit_config = Arc::new(config.rate_limit.clone());

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v2/quote/multi-dimensional", post(handlers::quote_multi_dimensional))
        .route("/api/v2/risk/exposure", get(handlers::risk_exposure))
        .route("/api/v2/bridge-health/{bridge_id}", get(handlers::bridge_health))
        .route("/api/v2/risk/alerts", get(handlers::risk_alerts))
        .route("/api/v2/tranches/apy", get(handlers::tranche_apy))
        .route("/", options(handlers::cors_preflight))
        .route("/{*rest}", options(handlers::cors_preflight))
        // innermost: CORS
        .layer(insure_security::cors::strict_allowlist(&config.cors_allowed_origins))
        // rate limit
        .layer(from_fn(rate_limit))
        .layer(Extension(rate_limit_backend))
        .layer(Extension(rate_limit_config))
        // auth
        .layer(from_fn(auth))
        .layer(Extension(protected))
        .layer(Extension(api_keys))
        // size cap
        .layer(from_fn(size_cap))
        .layer(Extension(config.max_body_bytes))
        // outermost: request logging
        .layer(from_fn(request_logging))
        .with_state(state)
}

/// Spawns every background task: the five `insure-monitor` loops, the
/// claims-monitor cycle, and the hedge-orchestrator cycle. All share one
/// `SharedState`. Placeholder collaborators (`insure_api::adapters`) stand
/// in for oracle/bridge/venue integrations that are genuinely out of this
/// workspace's scope (spec.md §6).
pub fn spawn_background_tasks(config: &AppConfig, shared: SharedState, hub: Arc<insure_hub::Hub>) {
    let risk_monitor: Arc<dyn insure_state::collaborators::RiskMonitor> =
        Arc::new(insure_risk::DefaultRiskMonitor::new(config.risk_limits.clone()));
    let bridge_monitor: Arc<dyn insure_state::collaborators::BridgeMonitor> = Arc::new(UnconfiguredBridgeMonitor);
    let utilization: Arc<dyn insure_state::collaborators::UtilizationTracker> =
        Arc::new(UnconfiguredUtilizationTracker);
    let tx_monitor: Arc<dyn insure_monitor::BridgeTransactionMonitor> = Arc::new(UnconfiguredBridgeTransactionMonitor);

    tokio::spawn(insure_monitor::bridge_health::run(
        bridge_monitor,
        shared.clone(),
        hub.clone(),
        config.monitor.bridge_health_interval_secs,
        config.monitor.health_change_threshold,
    ));
    tokio::spawn(insure_monitor::risk_snapshot::run(
        risk_monitor,
        shared.clone(),
        hub.clone(),
        config.monitor.risk_snapshot_interval_secs,
        config.monitor.alert_dedup_window_secs,
    ));
    tokio::spawn(insure_monitor::top_products::run(
        shared.clone(),
        hub.clone(),
        config.monitor.top_products_interval_secs,
    ));
    tokio::spawn(insure_monitor::tranche_apy::run(
        utilization,
        hub.clone(),
        config.monitor.tranche_apy_interval_secs,
    ));
    tokio::spawn(insure_monitor::bridge_transactions::run(
        tx_monitor,
        hub.clone(),
        config.monitor.bridge_transactions_interval_secs,
    ));

    let claims_writer = PayoutWriter::new(&config.persistence_base_dir, 256);
    let claims_monitor = Arc::new(ClaimsMonitor::new(
        shared.clone(),
        UnconfiguredOracleAdapter,
        config.claims.clone(),
        claims_writer,
    ));

    let hedge_writer = HedgeEventWriter::new(&config.persistence_base_dir, 256);
    let cost_fetcher = insure_hedge::DefaultCostFetcher::new(UnconfiguredVenueAdapter, config.hedge.clone());
    let hedge_orchestrator = Arc::new(HedgeOrchestrator::new(
        shared.clone(),
        UnconfiguredVenueAdapter,
        cost_fetcher,
        config.hedge.clone(),
        hedge_writer,
    ));

    let claims_interval = Duration::from_secs(config.claims.sample_interval_seconds);
    let claims_loop_hedge = hedge_orchestrator.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(claims_interval);
        loop {
            ticker.tick().await;
            let now = chrono::Utc::now().timestamp();
            match claims_monitor.run_cycle(now).await {
                Ok(records) => {
                    // §4.5 close path: every payout closes its policy's open
                    // hedge positions.
                    for record in records {
                        if let Err(e) = claims_loop_hedge.close_policy(record.policy_id, now).await {
                            error!(policy_id = record.policy_id, error = %e, "failed to close hedge positions after payout");
                        }
                    }
                }
                Err(e) => error!(error = %e, "claims monitor cycle failed"),
            }
        }
    });

    let hedge_interval = Duration::from_secs(config.hedge.check_interval_seconds);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(hedge_interval);
        loop {
            ticker.tick().await;
            let now = chrono::Utc::now().timestamp();
            if let Err(e) = hedge_orchestrator.run_cycle(now).await {
                error!(error = %e, "hedge orchestrator cycle failed");
            }
        }
    });

    info!("background monitoring, claims, and hedge loops started");
}

/// Builds the initial `SharedState` for an empty pool with the configured
/// starting capital.
pub fn initial_shared_state(config: &AppConfig) -> SharedState {
    SharedState::new(UnifiedPool::new(insure_core::Cents::new(config.initial_capital_cents)))
}

/// Builds the initial `ApiState`, seeding the `ApiKeyStore` from
/// `config.api_keys` (§4.1/§6). Each configured raw key is hashed once here
/// and only the hash is ever kept in memory afterward.
pub async fn initial_api_state(config: &AppConfig, shared: SharedState) -> ApiState {
    let api_keys = ApiKeyStore::default();
    let now = chrono::Utc::now().timestamp();
    for key in &config.api_keys {
        api_keys
            .insert(ApiKeyInfo {
                key_hash: insure_security::hash_key(&key.raw_key),
                name: key.name.clone(),
                scopes: key.scopes.clone(),
                created_at: now,
                expires_at: key.expires_at,
                revoked: false,
            })
            .await;
    }

    ApiState {
        shared,
        utilization: Arc::new(UnconfiguredUtilizationTracker),
        api_keys,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn initial_shared_state_seeds_configured_capital() {
        let config = AppConfig {
            initial_capital_cents: 42_000,
            ..AppConfig::default()
        };
        let shared = initial_shared_state(&config);
        let pool = shared.pool_snapshot().await;
        assert_eq!(pool.total_capital_usd, insure_core::Cents::new(42_000));
    }

    #[tokio::test]
    async fn build_router_assembles_without_panicking() {
        let config = AppConfig::default();
        let shared = initial_shared_state(&config);
        let state = initial_api_state(&config, shared).await;
        let backend = insure_security::select_backend(None).await;
        let _router = build_router(&config, state, backend);
    }

    #[tokio::test]
    async fn initial_api_state_seeds_configured_keys() {
        let config = AppConfig {
            api_keys: vec![crate::config::ApiKeyConfig {
                raw_key: "test-raw-key".to_string(),
                name: "ci".to_string(),
                scopes: [insure_core::ApiScope::Read].into_iter().collect(),
                expires_at: None,
            }],
            ..AppConfig::default()
        };
        let shared = initial_shared_state(&config);
        let state = initial_api_state(&config, shared).await;
        let info = state.api_keys.authorize("test-raw-key", insure_core::ApiScope::Read, 0).await.unwrap();
        assert_eq!(info.name, "ci");
    }
}
