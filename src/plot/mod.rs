//! Terminal plots.
//!
//! - observations + fitted curve (`ascii`)
//! - bootstrap parameter distributions (`histogram`)

pub mod ascii;
pub mod histogram;

pub use ascii::*;
pub use histogram::*;
