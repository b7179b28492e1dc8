//! Input/output helpers.
//!
//! - CSV ingest + validation of logger readings (`ingest`)
//! - trial/observation/reading exports (CSV) (`export`)
//! - report JSON read/write (`curve`)

pub mod curve;
pub mod export;
pub mod ingest;

pub use curve::*;
pub use export::*;
pub use ingest::*;
