//! WebSocket fan-out hub for the risk/hedging coordination plane (§4.2).
//!
//! Clients connect at `/ws`, receive a `welcome` message listing the
//! available channels, and opt into any subset of them. Every other crate
//! in the workspace that produces a signal (bridge health, risk alerts,
//! top products, tranche APY, bridge transactions, pricing updates) calls
//! [`Hub::broadcast`] to fan it out to the subscribed clients.

pub mod config;
pub mod error;
pub mod hub;
pub mod server;

pub use config::HubConfig;
pub use error::{HubError, HubResult};
pub use hub::Hub;
pub use server::{create_router, run_server, AppState};
