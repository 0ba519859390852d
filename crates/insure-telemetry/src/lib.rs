//! Prometheus metrics and structured logging for the risk/hedging plane.
//!
//! Provides observability from day one: request-edge and WebSocket-hub
//! counters, monitoring-loop tick/duration histograms, claims and hedge
//! gauges, structured JSON-or-pretty logging, and a daily statistics
//! summary line.

pub mod daily_stats;
pub mod error;
pub mod logging;
pub mod metrics;

pub use daily_stats::{CoverageKindDailyStats, DailyStatsReporter};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
