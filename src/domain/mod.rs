//! Domain model.
//!
//! Keep this module mostly "data-only" (types + small helpers), so that:
//! - parsing/normalization can live in `io` and `prep`
//! - fitting/math can live in `fit`/`models`/`math`
//! - reporting can live in `report`/`plot`

pub mod types;

pub use types::*;
