//! HTTP handlers for the public API surface (spec.md §6).

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::error::{AppError, AppResult};
use crate::state::ApiState;

/// `OPTIONS **` (§4.1): the CORS layer (innermost, wrapping this route same
/// as every other) stamps the preflight headers on the way out; this
/// handler just needs to return 200 with an empty body.
pub async fn cors_preflight() -> axum::http::StatusCode {
    axum::http::StatusCode::OK
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "insure-api",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().timestamp(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub coverage_kind: insure_core::CoverageKind,
    pub chain: insure_core::Chain,
    pub stablecoin: insure_core::Stablecoin,
    pub coverage_amount_cents: i64,
    pub duration_days: i64,
}

#[derive(Debug, Serialize)]
pub struct QuoteBreakdown {
    pub base_rate: String,
    pub chain_multiplier: String,
    pub stablecoin_adjustment: String,
    pub total_rate: String,
    pub coverage_amount: i64,
    pub duration_days: i64,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub premium: i64,
    pub breakdown: QuoteBreakdown,
    pub product_hash: String,
    pub timestamp: i64,
}

/// Deterministic identity hash of a product, used by clients to dedupe
/// quotes for the same (coverage_kind, chain, stablecoin) triple.
fn product_hash(product: &insure_core::ProductKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{:?}:{:?}:{:?}", product.coverage_kind, product.chain, product.stablecoin).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// `POST /api/v2/quote/multi-dimensional` (§6): the public premium formula,
/// `total_rate = base_rate * chain_multiplier + stablecoin_adjustment`,
/// `premium = coverage_amount * total_rate * duration_days / 365`.
pub async fn quote_multi_dimensional(Json(req): Json<QuoteRequest>) -> AppResult<Json<QuoteResponse>> {
    use rust_decimal::Decimal;

    if req.coverage_amount_cents <= 0 {
        return Err(AppError::Validation("coverage_amount_cents must be positive".into()));
    }
    if req.duration_days <= 0 {
        return Err(AppError::Validation("duration_days must be positive".into()));
    }

    let base_rate = req.coverage_kind.base_rate_apr();
    let chain_multiplier = req.chain.multiplier();
    let stablecoin_adjustment = req.stablecoin.adjustment();
    let total_rate = base_rate * chain_multiplier + stablecoin_adjustment;
    let premium = Decimal::from(req.coverage_amount_cents) * total_rate * Decimal::from(req.duration_days)
        / Decimal::from(365);

    let product = insure_core::ProductKey::new(req.coverage_kind, req.chain, req.stablecoin);

    Ok(Json(QuoteResponse {
        premium: premium.round().try_into().unwrap_or(i64::MAX),
        breakdown: QuoteBreakdown {
            base_rate: base_rate.to_string(),
            chain_multiplier: chain_multiplier.to_string(),
            stablecoin_adjustment: stablecoin_adjustment.to_string(),
            total_rate: total_rate.to_string(),
            coverage_amount: req.coverage_amount_cents,
            duration_days: req.duration_days,
        },
        product_hash: product_hash(&product),
        timestamp: chrono::Utc::now().timestamp(),
    }))
}

/// `GET /api/v2/risk/exposure` (§6): the latest risk snapshot's top products
/// plus a live by-dimension breakdown of the active book, or a 404 if the
/// risk-snapshot loop has not produced a snapshot yet.
pub async fn risk_exposure(State(state): State<ApiState>) -> AppResult<Json<serde_json::Value>> {
    let snapshot = state
        .shared
        .risk_snapshot()
        .await
        .ok_or_else(|| AppError::NotFound("no risk snapshot available yet".into()))?;
    let pool = state.shared.pool_snapshot().await;

    #[derive(Default)]
    struct Bucket {
        exposure_usd: i64,
        policy_count: u32,
    }

    let mut by_coverage_type: HashMap<insure_core::CoverageKind, Bucket> = HashMap::new();
    let mut by_chain: HashMap<insure_core::Chain, Bucket> = HashMap::new();
    let mut by_stablecoin: HashMap<insure_core::Stablecoin, Bucket> = HashMap::new();

    for policy in pool.active_policies.iter().filter(|p| p.is_active()) {
        let coverage_type = by_coverage_type.entry(policy.product.coverage_kind).or_default();
        coverage_type.exposure_usd += policy.coverage_amount.0;
        coverage_type.policy_count += 1;

        let chain = by_chain.entry(policy.product.chain).or_default();
        chain.exposure_usd += policy.coverage_amount.0;
        chain.policy_count += 1;

        let stablecoin = by_stablecoin.entry(policy.product.stablecoin).or_default();
        stablecoin.exposure_usd += policy.coverage_amount.0;
        stablecoin.policy_count += 1;
    }

    fn to_json<K: Serialize>(buckets: HashMap<K, Bucket>, label: &str) -> Vec<serde_json::Value> {
        buckets
            .into_iter()
            .map(|(key, bucket)| {
                json!({ (label): key, "exposure_usd": bucket.exposure_usd, "policy_count": bucket.policy_count })
            })
            .collect()
    }

    Ok(Json(json!({
        "by_coverage_type": to_json(by_coverage_type, "coverage_type"),
        "by_chain": to_json(by_chain, "chain"),
        "by_stablecoin": to_json(by_stablecoin, "stablecoin"),
        "top_10_products": snapshot.top_10_products,
        "total_policies": pool.active_policies.len(),
        "timestamp": snapshot.timestamp,
    })))
}

/// `GET /api/v2/bridge-health/:bridge_id` (§6).
pub async fn bridge_health(
    State(state): State<ApiState>,
    Path(bridge_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let health = state
        .shared
        .bridge_health(&bridge_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("bridge '{bridge_id}' not found")))?;

    Ok(Json(json!({
        "bridge_id": health.bridge_id,
        "source_chain": health.source_chain,
        "dest_chain": health.dest_chain,
        "health_score": health.health_score,
        "health_status": health.health_status(),
        "tvl_usd": health.current_tvl,
        "tvl_change_pct": health.tvl_change_pct(),
        "exploit_detected": health.exploit_detected,
        "active_alerts": health.alerts,
        "last_updated": chrono::Utc::now().timestamp(),
        "timestamp": chrono::Utc::now().timestamp(),
    })))
}

#[derive(Debug, Deserialize, Default)]
pub struct AlertsQuery {
    pub severity: Option<insure_core::AlertSeverity>,
    pub alert_type: Option<insure_core::AlertKind>,
}

/// `GET /api/v2/risk/alerts` (§6), filterable by `severity?`/`alert_type?`.
pub async fn risk_alerts(
    State(state): State<ApiState>,
    Query(query): Query<AlertsQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let snapshot = state
        .shared
        .risk_snapshot()
        .await
        .ok_or_else(|| AppError::NotFound("no risk snapshot available yet".into()))?;

    let alerts: Vec<insure_core::RiskAlert> = snapshot
        .breach_alerts
        .into_iter()
        .chain(snapshot.warning_alerts)
        .filter(|a| query.severity.map_or(true, |s| s == a.severity))
        .filter(|a| query.alert_type.map_or(true, |k| k == a.alert_kind))
        .collect();

    let critical_count = alerts
        .iter()
        .filter(|a| a.severity == insure_core::AlertSeverity::Critical)
        .count();

    Ok(Json(json!({
        "total_alerts": alerts.len(),
        "critical_count": critical_count,
        "alerts": alerts,
        "timestamp": snapshot.timestamp,
    })))
}

/// `GET /api/v2/tranches/apy` (§6): the utilization tracker's live figures,
/// with each tranche's remaining capacity pulled live rather than derived
/// from `total_capital - coverage_sold`.
pub async fn tranche_apy(State(state): State<ApiState>) -> AppResult<Json<serde_json::Value>> {
    let tranches = state.utilization.get_all_utilizations().await?;
    let mut body = Vec::with_capacity(tranches.len());
    for t in tranches {
        let available_capacity = state.utilization.get_available_capacity(&t.tranche_id).await?;
        body.push(json!({
            "tranche_id": t.tranche_id,
            "apy": t.apy,
            "utilization": t.utilization,
            "total_capital_ton": t.total_capital,
            "coverage_sold_ton": t.coverage_sold,
            "available_capacity_ton": available_capacity,
            "last_updated": t.last_updated,
        }));
    }
    Ok(Json(json!({ "tranches": body, "timestamp": chrono::Utc::now().timestamp() })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ApiState;
    use axum::extract::Query;
    use insure_core::{Cents, Chain, CoverageKind, Stablecoin, UnifiedPool};
    use insure_security::ApiKeyStore;
    use insure_state::SharedState;
    use std::sync::Arc;

    fn test_state() -> ApiState {
        ApiState {
            shared: SharedState::new(UnifiedPool::new(Cents::new(100_000_000_000))),
            utilization: Arc::new(crate::adapters::UnconfiguredUtilizationTracker),
            api_keys: ApiKeyStore::default(),
        }
    }

    #[tokio::test]
    async fn health_reports_healthy_with_service_and_version() {
        let body = health().await.0;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "insure-api");
        assert!(body["version"].is_string());
        assert!(body["timestamp"].is_i64());
    }

    #[tokio::test]
    async fn quote_applies_base_rate_chain_multiplier_and_stablecoin_adjustment() {
        // Depeg on Ethereum in USDC: multiplier 1.0, adjustment 0, so
        // total_rate is exactly the base rate and a full year cancels out
        // the duration_days/365 factor.
        let req = QuoteRequest {
            coverage_kind: CoverageKind::Depeg,
            chain: Chain::Ethereum,
            stablecoin: Stablecoin::Usdc,
            coverage_amount_cents: 100_000_000,
            duration_days: 365,
        };
        let resp = quote_multi_dimensional(Json(req)).await.unwrap().0;
        assert_eq!(resp.breakdown.total_rate, "0.008");
        assert_eq!(resp.premium, 800_000);
        assert_eq!(resp.breakdown.coverage_amount, 100_000_000);
        assert_eq!(resp.breakdown.duration_days, 365);
        assert!(!resp.product_hash.is_empty());
    }

    #[tokio::test]
    async fn quote_rejects_non_positive_coverage_amount() {
        let req = QuoteRequest {
            coverage_kind: CoverageKind::Oracle,
            chain: Chain::Base,
            stablecoin: Stablecoin::Usdt,
            coverage_amount_cents: 0,
            duration_days: 30,
        };
        let err = quote_multi_dimensional(Json(req)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn quote_rejects_non_positive_duration() {
        let req = QuoteRequest {
            coverage_kind: CoverageKind::Oracle,
            chain: Chain::Base,
            stablecoin: Stablecoin::Usdt,
            coverage_amount_cents: 1_000,
            duration_days: 0,
        };
        let err = quote_multi_dimensional(Json(req)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn quote_product_hash_is_stable_for_the_same_product() {
        let req = |amount, days| QuoteRequest {
            coverage_kind: CoverageKind::Oracle,
            chain: Chain::Base,
            stablecoin: Stablecoin::Usdt,
            coverage_amount_cents: amount,
            duration_days: days,
        };
        let first = quote_multi_dimensional(Json(req(1_000, 30))).await.unwrap().0;
        let second = quote_multi_dimensional(Json(req(2_000, 60))).await.unwrap().0;
        assert_eq!(first.product_hash, second.product_hash);
    }

    #[tokio::test]
    async fn risk_exposure_404s_before_any_snapshot_exists() {
        let state = test_state();
        let err = risk_exposure(State(state)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn bridge_health_404s_for_unknown_bridge() {
        let state = test_state();
        let err = bridge_health(State(state), Path("nonexistent".to_string())).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn risk_alerts_404s_before_any_snapshot_exists() {
        let state = test_state();
        let err = risk_alerts(State(state), Query(AlertsQuery::default())).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn tranche_apy_is_empty_with_unconfigured_tracker() {
        let state = test_state();
        let body = tranche_apy(State(state)).await.unwrap().0;
        assert!(body["tranches"].as_array().unwrap().is_empty());
    }
}
