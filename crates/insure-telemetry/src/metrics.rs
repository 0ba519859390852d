//! Prometheus metric definitions and a label-free facade over them.
//!
//! Metrics are registered once, at process start, into the default global
//! registry. Registration failures `unwrap()` deliberately: a metric with a
//! duplicate name or malformed label set is a programming error that should
//! fail the process at startup, not surface as a missing data point at
//! request time.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, register_histogram_vec,
    register_int_gauge, CounterVec, Gauge, GaugeVec, HistogramVec, IntGauge,
};

// --- Security edge ---

static RATE_LIMIT_BLOCKED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "insure_rate_limit_blocked_total",
        "Requests rejected by the rate limiter, by identifier kind",
        &["identifier_kind"]
    )
    .unwrap()
});

static RATE_LIMIT_ALLOWED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "insure_rate_limit_allowed_total",
        "Requests allowed by the rate limiter, by identifier kind",
        &["identifier_kind"]
    )
    .unwrap()
});

static AUTH_REJECTED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "insure_auth_rejected_total",
        "Requests rejected by the auth middleware, by reason",
        &["reason"]
    )
    .unwrap()
});

// --- WebSocket hub ---

static WS_CONNECTIONS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("insure_ws_connections", "Currently connected WebSocket clients").unwrap()
});

static WS_MESSAGES_BROADCAST: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "insure_ws_messages_broadcast_total",
        "Messages broadcast to subscribers, by channel",
        &["channel"]
    )
    .unwrap()
});

static WS_CLIENTS_REAPED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "insure_ws_clients_reaped_total",
        "Clients removed by the heartbeat reaper",
        &["reason"]
    )
    .unwrap()
});

// --- Monitoring loops ---

static MONITORING_TICK: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "insure_monitoring_tick_total",
        "Monitoring loop ticks completed, by loop name",
        &["loop_name"]
    )
    .unwrap()
});

static MONITORING_TICK_ERRORS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "insure_monitoring_tick_errors_total",
        "Monitoring loop ticks that caught and logged an error, by loop name",
        &["loop_name"]
    )
    .unwrap()
});

static MONITORING_TICK_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "insure_monitoring_tick_duration_seconds",
        "Monitoring loop tick duration, by loop name",
        &["loop_name"]
    )
    .unwrap()
});

// --- Claims monitor ---

pub(crate) static CLAIMS_PAYOUTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "insure_claims_payouts_total",
        "Payouts emitted, by coverage kind",
        &["coverage_kind"]
    )
    .unwrap()
});

pub(crate) static CLAIMS_PAYOUT_CENTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "insure_claims_payout_cents_total",
        "Cents paid out, by coverage kind",
        &["coverage_kind"]
    )
    .unwrap()
});

static CLAIMS_INSUFFICIENT_CAPITAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "insure_claims_insufficient_capital_total",
        "Payouts skipped for insufficient capital, by coverage kind",
        &["coverage_kind"]
    )
    .unwrap()
});

static CLAIMS_POLICIES_EXPIRED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "insure_claims_policies_expired_total",
        "Policies transitioned to Expired on lapse, by coverage kind",
        &["coverage_kind"]
    )
    .unwrap()
});

static POOL_CAPITAL_CENTS: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!("insure_pool_capital_cents", "Current pool total_capital_usd in cents")
        .unwrap()
});

static POOL_COVERAGE_SOLD_CENTS: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "insure_pool_coverage_sold_cents",
        "Current pool total_coverage_sold in cents"
    )
    .unwrap()
});

// --- Hedge orchestrator ---

pub(crate) static HEDGE_ALLOCATED_CENTS: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "insure_hedge_allocated_cents",
        "Cents allocated per venue in the most recent hedge cycle",
        &["venue"]
    )
    .unwrap()
});

static HEDGE_POSITIONS_OPEN: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "insure_hedge_positions_open",
        "Currently open hedge positions, by venue",
        &["venue"]
    )
    .unwrap()
});

static HEDGE_EXECUTION_FAILURES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "insure_hedge_execution_failures_total",
        "Venue adapter execution failures, by venue",
        &["venue"]
    )
    .unwrap()
});

/// Label-free facade. Callers never touch the `prometheus` statics directly.
pub struct Metrics;

impl Metrics {
    pub fn rate_limit_blocked(identifier_kind: &str) {
        RATE_LIMIT_BLOCKED.with_label_values(&[identifier_kind]).inc();
    }

    pub fn rate_limit_allowed(identifier_kind: &str) {
        RATE_LIMIT_ALLOWED.with_label_values(&[identifier_kind]).inc();
    }

    pub fn auth_rejected(reason: &str) {
        AUTH_REJECTED.with_label_values(&[reason]).inc();
    }

    pub fn ws_connected() {
        WS_CONNECTIONS.inc();
    }

    pub fn ws_disconnected() {
        WS_CONNECTIONS.dec();
    }

    pub fn ws_broadcast(channel: &str) {
        WS_MESSAGES_BROADCAST.with_label_values(&[channel]).inc();
    }

    pub fn ws_clients_reaped(reason: &str, count: usize) {
        WS_CLIENTS_REAPED
            .with_label_values(&[reason])
            .inc_by(count as f64);
    }

    pub fn monitoring_tick(loop_name: &str) {
        MONITORING_TICK.with_label_values(&[loop_name]).inc();
    }

    pub fn monitoring_tick_error(loop_name: &str) {
        MONITORING_TICK_ERRORS.with_label_values(&[loop_name]).inc();
    }

    pub fn monitoring_tick_duration(loop_name: &str, seconds: f64) {
        MONITORING_TICK_DURATION
            .with_label_values(&[loop_name])
            .observe(seconds);
    }

    pub fn claim_payout(coverage_kind: &str, cents: i64) {
        CLAIMS_PAYOUTS.with_label_values(&[coverage_kind]).inc();
        CLAIMS_PAYOUT_CENTS
            .with_label_values(&[coverage_kind])
            .inc_by(cents as f64);
    }

    pub fn claim_insufficient_capital(coverage_kind: &str) {
        CLAIMS_INSUFFICIENT_CAPITAL
            .with_label_values(&[coverage_kind])
            .inc();
    }

    pub fn policy_expired(coverage_kind: &str) {
        CLAIMS_POLICIES_EXPIRED.with_label_values(&[coverage_kind]).inc();
    }

    pub fn pool_snapshot(capital_cents: i64, coverage_sold_cents: i64) {
        POOL_CAPITAL_CENTS.set(capital_cents as f64);
        POOL_COVERAGE_SOLD_CENTS.set(coverage_sold_cents as f64);
    }

    pub fn hedge_allocated(venue: &str, cents: i64) {
        HEDGE_ALLOCATED_CENTS
            .with_label_values(&[venue])
            .set(cents as f64);
    }

    pub fn hedge_positions_open(venue: &str, count: i64) {
        HEDGE_POSITIONS_OPEN.with_label_values(&[venue]).set(count as f64);
    }

    pub fn hedge_execution_failure(venue: &str) {
        HEDGE_EXECUTION_FAILURES.with_label_values(&[venue]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_calls_do_not_panic() {
        Metrics::rate_limit_blocked("api_key");
        Metrics::ws_connected();
        Metrics::ws_disconnected();
        Metrics::monitoring_tick("bridge_health");
        Metrics::claim_payout("depeg", 500_000);
        Metrics::pool_snapshot(1_000_000, 400_000);
        Metrics::hedge_allocated("polymarket", 5_760);
    }
}
