//! Daily statistics summary, logged once per day by the API binary.
//!
//! Reads the accumulated counters straight out of the Prometheus registry
//! rather than keeping a parallel running total — the registry is already
//! the single source of truth, and this avoids the two ever drifting apart.

use chrono::{DateTime, Utc};
use prometheus::core::Collector;
use std::collections::HashMap;
use tracing::info;

use crate::metrics::{CLAIMS_PAYOUTS, CLAIMS_PAYOUT_CENTS, HEDGE_ALLOCATED_CENTS};

/// Per-coverage-kind rollup for one reporting period.
#[derive(Debug, Clone, Default)]
pub struct CoverageKindDailyStats {
    pub coverage_kind: String,
    pub payout_count: u64,
    pub payout_cents_total: u64,
}

/// Periodic (normally daily) summary reporter.
pub struct DailyStatsReporter {
    coverage_kinds: Vec<String>,
    start_time: DateTime<Utc>,
}

impl DailyStatsReporter {
    pub fn new(coverage_kinds: Vec<String>) -> Self {
        Self {
            coverage_kinds,
            start_time: Utc::now(),
        }
    }

    pub fn get_stats(&self) -> Vec<CoverageKindDailyStats> {
        self.coverage_kinds
            .iter()
            .map(|kind| CoverageKindDailyStats {
                coverage_kind: kind.clone(),
                payout_count: Self::counter_value(&CLAIMS_PAYOUTS, &[kind]),
                payout_cents_total: Self::counter_value(&CLAIMS_PAYOUT_CENTS, &[kind]),
            })
            .collect()
    }

    fn counter_value(counter: &prometheus::CounterVec, labels: &[&str]) -> u64 {
        counter.with_label_values(labels).get() as u64
    }

    fn hedge_allocated_by_venue() -> HashMap<String, f64> {
        let mut out = HashMap::new();
        for mf in HEDGE_ALLOCATED_CENTS.collect() {
            for m in mf.get_metric() {
                if let Some(pair) = m.get_label().first() {
                    out.insert(pair.get_value().to_string(), m.get_gauge().get_value());
                }
            }
        }
        out
    }

    pub fn output_daily_summary(&self) {
        let stats = self.get_stats();
        let duration = Utc::now() - self.start_time;

        info!("========== Daily Statistics Summary ==========");
        info!(
            "Period: {} ({}h{}m)",
            self.start_time.format("%Y-%m-%d %H:%M:%S UTC"),
            duration.num_hours(),
            duration.num_minutes() % 60
        );

        for s in &stats {
            info!(
                "  {}: {} payouts, {} cents total",
                s.coverage_kind, s.payout_count, s.payout_cents_total
            );
        }

        for (venue, cents) in Self::hedge_allocated_by_venue() {
            info!("  hedge[{venue}]: {cents} cents allocated");
        }

        info!("==============================================");
    }

    pub fn to_json(&self) -> HashMap<String, CoverageKindDailyStats> {
        self.get_stats()
            .into_iter()
            .map(|s| (s.coverage_kind.clone(), s))
            .collect()
    }
}
