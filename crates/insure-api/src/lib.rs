//! The risk/hedging coordination plane's HTTP surface and process entry
//! point (§6). Wires `insure-state`'s shared pool, `insure-monitor`'s five
//! background loops, `insure-claims`' claims monitor, `insure-hedge`'s
//! orchestrator, `insure-security`'s edge middleware, and `insure-hub`'s
//! WebSocket fan-out into one runnable binary.

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use state::ApiState;
