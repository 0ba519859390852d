//! JSON Lines persistence for the risk/hedging coordination plane.
//!
//! Records claims payouts and hedge lifecycle events for post-hoc audit.
//! This is deliberately not a database layer (spec scope keeps SQL DDL and
//! full historical time series storage out) — just an append-only trail
//! alongside the in-memory latest-snapshot state everything else operates
//! on. JSON Lines format is more robust than a columnar format for
//! streaming writes: each line is a complete JSON object, so partial file
//! corruption only affects individual lines.

pub mod error;
pub mod writer;

pub use error::{PersistenceError, PersistenceResult};
pub use writer::{HedgeEventRecord, HedgeEventWriter, PayoutRecord, PayoutWriter};
