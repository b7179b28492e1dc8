//! Linear least squares for Gauss–Newton increments.
//!
//! Each Gauss–Newton iteration solves a small linear problem:
//!
//! ```text
//! minimize || J δ - r ||^2
//! ```
//!
//! where `J` is the `n x 3` Jacobian and `r` the residual vector.
//!
//! Implementation choices:
//! - We use SVD so tall systems (more rows than columns) solve robustly.
//!   (Nalgebra's `QR::solve` is intended for square systems.)
//! - The singular values double as a rank test: a rank-deficient Jacobian is
//!   reported to the caller rather than solved with a truncated pseudo-inverse.

use nalgebra::{DMatrix, DVector};

/// Solve `min ||x β - y||` using SVD.
///
/// Returns `None` if `x` is rank deficient, i.e. its smallest singular value is
/// at most `rank_tolerance` times its largest, or if the solution is not finite.
pub fn solve_least_squares(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    rank_tolerance: f64,
) -> Option<DVector<f64>> {
    if x.nrows() < x.ncols() {
        return None;
    }

    let svd = x.clone().svd(true, true);
    let s_max = svd.singular_values.max();
    let s_min = svd.singular_values.min();
    if !(s_max.is_finite() && s_max > 0.0) || s_min <= rank_tolerance * s_max {
        return None;
    }

    let beta = svd.solve(y, 0.0).ok()?;
    if beta.iter().all(|v| v.is_finite()) {
        Some(beta)
    } else {
        None
    }
}
