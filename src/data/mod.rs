//! Data sources other than CSV ingest.
//!
//! - `synthetic`: seeded logistic observations and simulated logger readings

pub mod synthetic;

pub use synthetic::*;
