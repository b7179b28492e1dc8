//! Curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - fit the logistic curve by Gauss–Newton (`solver`)
//! - resample and refit in parallel (`bootstrap`)
//! - turn the bootstrap distribution into percentile intervals (`interval`)

pub mod bootstrap;
pub mod interval;
pub mod solver;

pub use bootstrap::*;
pub use interval::*;
pub use solver::*;
