//! Gauss–Newton nonlinear least squares with step halving.
//!
//! Given:
//! - times `t_i`
//! - observed BOD `y_i`
//! - a model form and an initial guess
//!
//! we iterate:
//! - build the Jacobian `J` at the current parameters
//! - solve `J δ ≈ r` for the increment (SVD least squares)
//! - stop when the relative offset `sqrt(|J δ|² / p) / sqrt(RSS / (n - p))`
//!   falls below the tolerance
//! - otherwise try `θ + f δ` for `f = 1, 1/2, 1/4, ...` until the RSS drops
//!
//! Every way this can go wrong is reported as a `FitFailure` so bootstrap
//! trials can record it and move on.

use nalgebra::{DMatrix, DVector};

use crate::domain::{CurveModel, ObservationSet, Parameters, SolverOptions};
use crate::error::FitFailure;
use crate::math::solve_least_squares;
use crate::models::ModelForm;

/// Number of model parameters.
const P: usize = 3;

/// RSS below this fraction of `Σ y²` counts as an exact fit.
///
/// The relative offset criterion is undefined for zero-residual data, so
/// noiseless inputs are caught here instead.
const ZERO_RSS_RATIO: f64 = 1e-20;

/// Fit `model` to `observations` starting from `initial_guess`.
pub fn fit_point_estimate<M: ModelForm + ?Sized>(
    observations: &ObservationSet,
    model: &M,
    initial_guess: Parameters,
    options: &SolverOptions,
) -> Result<CurveModel, FitFailure> {
    if !initial_guess.is_finite() {
        return Err(FitFailure::NonFiniteStart);
    }

    let distinct_times = observations.distinct_times();
    if distinct_times < P {
        return Err(FitFailure::RankDeficient { distinct_times });
    }

    let times = observations.times();
    let y = DVector::from_vec(observations.bods());
    let n = times.len();
    let dof = n.saturating_sub(P).max(1) as f64;
    let zero_rss = ZERO_RSS_RATIO * y.norm_squared().max(f64::MIN_POSITIVE);

    let mut theta = initial_guess;
    let mut r = residuals(model, &times, &y, &theta);
    let mut rss = r.norm_squared();
    if !rss.is_finite() {
        return Err(FitFailure::NonFinite { iteration: 0 });
    }

    let mut steps = 0usize;
    for iteration in 1..=options.max_iterations {
        if rss <= zero_rss {
            return Ok(CurveModel { params: theta, rss, iterations: steps });
        }

        let jac = jacobian(model, &times, &theta);
        if jac.iter().any(|v| !v.is_finite()) {
            return Err(FitFailure::NonFinite { iteration });
        }

        let Some(delta) = solve_least_squares(&jac, &r, options.rank_tolerance) else {
            return Err(FitFailure::SingularGradient { iteration });
        };

        let projected = (&jac * &delta).norm_squared();
        let offset = (projected / P as f64).sqrt() / (rss / dof).sqrt();
        if offset < options.tolerance {
            return Ok(CurveModel { params: theta, rss, iterations: steps });
        }

        let mut factor = 1.0;
        loop {
            let candidate = step(&theta, &delta, factor);
            let r_candidate = residuals(model, &times, &y, &candidate);
            let rss_candidate = r_candidate.norm_squared();
            if rss_candidate.is_finite() && rss_candidate < rss {
                theta = candidate;
                r = r_candidate;
                rss = rss_candidate;
                steps += 1;
                break;
            }
            factor /= 2.0;
            if factor < options.min_step_factor {
                return Err(FitFailure::StepFactorReduced { iteration });
            }
        }
    }

    if rss <= zero_rss {
        return Ok(CurveModel { params: theta, rss, iterations: steps });
    }
    Err(FitFailure::IterationLimit {
        max_iterations: options.max_iterations,
    })
}

fn residuals<M: ModelForm + ?Sized>(
    model: &M,
    times: &[f64],
    y: &DVector<f64>,
    params: &Parameters,
) -> DVector<f64> {
    DVector::from_iterator(
        times.len(),
        times
            .iter()
            .zip(y.iter())
            .map(|(&t, &yi)| yi - model.predict(t, params)),
    )
}

fn jacobian<M: ModelForm + ?Sized>(model: &M, times: &[f64], params: &Parameters) -> DMatrix<f64> {
    let mut jac = DMatrix::<f64>::zeros(times.len(), P);
    for (i, &t) in times.iter().enumerate() {
        let g = model.gradient(t, params);
        for j in 0..P {
            jac[(i, j)] = g[j];
        }
    }
    jac
}

fn step(theta: &Parameters, delta: &DVector<f64>, factor: f64) -> Parameters {
    let mut v = theta.to_array();
    for j in 0..P {
        v[j] += factor * delta[j];
    }
    Parameters::from_array(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Habitat, Observation, Treatment};
    use crate::models::Logistic;

    fn synthetic(truth: Parameters, times: &[f64]) -> ObservationSet {
        let obs = times
            .iter()
            .map(|&t| Observation {
                reactor: "R1".to_string(),
                habitat: Habitat::Sand,
                treatment: Treatment::Paper,
                time_days: t,
                pressure: 0.0,
                adjusted_pressure: 0.0,
                bod: Logistic.predict(t, &truth),
            })
            .collect();
        ObservationSet::new(obs).unwrap()
    }

    fn days(n: usize) -> Vec<f64> {
        (0..n).map(|d| d as f64).collect()
    }

    #[test]
    fn recovers_truth_from_true_start_on_noiseless_data() {
        let truth = Parameters::new(5.0, 0.3, 70.0);
        let set = synthetic(truth, &days(31));
        let fit = fit_point_estimate(&set, &Logistic, truth, &SolverOptions::default()).unwrap();
        assert!((fit.params.half_time - 5.0).abs() < 1e-8);
        assert!((fit.params.k - 0.3).abs() < 1e-8);
        assert!((fit.params.limit - 70.0).abs() < 1e-8);
        assert!(fit.rss < 1e-12);
    }

    #[test]
    fn recovers_truth_from_perturbed_start() {
        let truth = Parameters::new(5.0, 0.3, 70.0);
        let set = synthetic(truth, &days(31));
        let guess = Parameters::new(4.0, 0.25, 60.0);
        let fit = fit_point_estimate(&set, &Logistic, guess, &SolverOptions::default()).unwrap();
        assert!((fit.params.half_time - 5.0).abs() < 1e-6, "{fit:?}");
        assert!((fit.params.k - 0.3).abs() < 1e-6, "{fit:?}");
        assert!((fit.params.limit - 70.0).abs() < 1e-6, "{fit:?}");
        assert!(fit.iterations > 0);
    }

    #[test]
    fn three_distinct_times_are_enough() {
        let truth = Parameters::new(5.0, 0.3, 70.0);
        let set = synthetic(truth, &[2.0, 5.0, 9.0]);
        let fit = fit_point_estimate(&set, &Logistic, truth, &SolverOptions::default()).unwrap();
        assert!((fit.params.limit - 70.0).abs() < 1e-8);
    }

    #[test]
    fn single_time_point_is_rank_deficient() {
        let truth = Parameters::new(5.0, 0.3, 70.0);
        let set = synthetic(truth, &[4.0, 4.0, 4.0, 4.0]);
        let err = fit_point_estimate(&set, &Logistic, truth, &SolverOptions::default()).unwrap_err();
        assert_eq!(err, FitFailure::RankDeficient { distinct_times: 1 });
    }

    #[test]
    fn non_finite_guess_fails_without_panicking() {
        let set = synthetic(Parameters::new(5.0, 0.3, 70.0), &days(10));
        let guess = Parameters::new(f64::NAN, 0.1, 70.0);
        let err = fit_point_estimate(&set, &Logistic, guess, &SolverOptions::default()).unwrap_err();
        assert_eq!(err, FitFailure::NonFiniteStart);
    }

    #[test]
    fn zero_limit_and_rate_guess_has_singular_gradient() {
        // With limit = 0 and k = 0 only the `limit` column of J is non-zero.
        let set = synthetic(Parameters::new(5.0, 0.3, 70.0), &days(31));
        let guess = Parameters::new(0.0, 0.0, 0.0);
        let err = fit_point_estimate(&set, &Logistic, guess, &SolverOptions::default()).unwrap_err();
        assert_eq!(err, FitFailure::SingularGradient { iteration: 1 });
    }

    #[test]
    fn exhausted_budget_is_reported() {
        let truth = Parameters::new(5.0, 0.3, 70.0);
        let set = synthetic(truth, &days(31));
        let options = SolverOptions {
            max_iterations: 1,
            ..SolverOptions::default()
        };
        let guess = Parameters::new(0.0, 0.1, 40.0);
        let err = fit_point_estimate(&set, &Logistic, guess, &options).unwrap_err();
        assert_eq!(err, FitFailure::IterationLimit { max_iterations: 1 });
    }
}
