//! Logistic saturation curve.
//!
//! `Y(t) = limit / (1 + exp(-k (t - t_half)))`
//!
//! The fitter relies on two primitive operations:
//! - predict `Y(t)` given parameters (for residuals/plots)
//! - the gradient of `Y(t)` with respect to each parameter (for the Jacobian)
//!
//! Numerical notes:
//! - the sigmoid is evaluated in a sign-split form so `exp` never overflows
//! - gradient order matches `Parameters::to_array`: `[half_time, k, limit]`

use crate::domain::Parameters;

/// A three-parameter nonlinear model form the solver can fit.
pub trait ModelForm: Sync {
    /// Human-readable label for terminal output.
    fn name(&self) -> &'static str;

    fn predict(&self, t: f64, params: &Parameters) -> f64;

    /// Partial derivatives in `[half_time, k, limit]` order.
    fn gradient(&self, t: f64, params: &Parameters) -> [f64; 3];
}

/// The logistic BOD saturation curve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Logistic;

impl ModelForm for Logistic {
    fn name(&self) -> &'static str {
        "logistic"
    }

    fn predict(&self, t: f64, params: &Parameters) -> f64 {
        params.limit * sigmoid(params.k * (t - params.half_time))
    }

    fn gradient(&self, t: f64, params: &Parameters) -> [f64; 3] {
        let dt = t - params.half_time;
        let s = sigmoid(params.k * dt);
        let slope = params.limit * s * (1.0 - s);
        [-slope * params.k, slope * dt, s]
    }
}

/// `1 / (1 + exp(-x))` without overflow for large `|x|`.
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}
