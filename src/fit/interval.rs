//! Percentile confidence intervals from bootstrap fits.
//!
//! For each parameter independently we take the estimates of every successful
//! resampled fit, sort them, and read off the empirical quantiles at
//! `(1 - c) / 2` and `1 - (1 - c) / 2`. The apparent fit is not part of the
//! bootstrap distribution and is skipped.

use std::collections::BTreeMap;

use crate::domain::{FitResult, ParamName, PercentileInterval};
use crate::error::BootstrapError;
use crate::fit::bootstrap::validate_confidence_level;
use crate::math::{quantile_linear_sorted, sorted_copy};

/// Fewest successful fits an interval can be built from.
pub const DEFAULT_MIN_SUCCESSFUL: usize = 2;

pub type IntervalTable = BTreeMap<ParamName, PercentileInterval>;

/// Percentile intervals with the default minimum sample count.
pub fn percentile_intervals(
    fit_results: &[FitResult],
    confidence_level: f64,
) -> Result<IntervalTable, BootstrapError> {
    percentile_intervals_with_min(fit_results, confidence_level, DEFAULT_MIN_SUCCESSFUL)
}

pub fn percentile_intervals_with_min(
    fit_results: &[FitResult],
    confidence_level: f64,
    min_successful: usize,
) -> Result<IntervalTable, BootstrapError> {
    validate_confidence_level(confidence_level)?;

    let required = min_successful.max(1);
    let successful = fit_results
        .iter()
        .filter(|r| !r.trial.is_apparent() && r.is_success())
        .count();
    if successful < required {
        return Err(BootstrapError::InsufficientSamples { successful, required });
    }

    let alpha = (1.0 - confidence_level) / 2.0;
    let mut table = IntervalTable::new();
    for name in ParamName::ALL {
        let sorted = sorted_copy(&parameter_estimates(fit_results, name));
        let lower = quantile_linear_sorted(&sorted, alpha);
        let upper = quantile_linear_sorted(&sorted, 1.0 - alpha);
        table.insert(
            name,
            PercentileInterval {
                lower: lower.min(upper),
                upper: lower.max(upper),
                confidence_level,
                n_samples: sorted.len(),
            },
        );
    }
    Ok(table)
}

/// Estimates of one parameter across successful resampled fits, in trial order.
pub fn parameter_estimates(fit_results: &[FitResult], name: ParamName) -> Vec<f64> {
    fit_results
        .iter()
        .filter(|r| !r.trial.is_apparent())
        .filter_map(FitResult::curve)
        .map(|c| c.params.get(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CurveModel, Parameters, TrialKind};
    use crate::error::FitFailure;

    fn ok(index: usize, limit: f64) -> FitResult {
        FitResult {
            trial: TrialKind::Resample { index, seed: index as u64 },
            draws: Vec::new(),
            outcome: Ok(CurveModel {
                params: Parameters::new(5.0 + limit / 100.0, 0.3, limit),
                rss: 1.0,
                iterations: 3,
            }),
        }
    }

    fn failed(index: usize) -> FitResult {
        FitResult {
            trial: TrialKind::Resample { index, seed: index as u64 },
            draws: Vec::new(),
            outcome: Err(FitFailure::SingularGradient { iteration: 1 }),
        }
    }

    fn apparent(limit: f64) -> FitResult {
        FitResult {
            trial: TrialKind::Apparent,
            ..ok(0, limit)
        }
    }

    #[test]
    fn interval_uses_interpolated_quantiles() {
        // limits 10, 20, 30, 40: q=0.025 -> 10.75, q=0.975 -> 39.25
        let results: Vec<FitResult> = [10.0, 40.0, 30.0, 20.0]
            .iter()
            .enumerate()
            .map(|(i, &l)| ok(i, l))
            .collect();
        let table = percentile_intervals(&results, 0.95).unwrap();
        let limit = table[&ParamName::Limit];
        assert!((limit.lower - 10.75).abs() < 1e-12);
        assert!((limit.upper - 39.25).abs() < 1e-12);
        assert_eq!(limit.n_samples, 4);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn failures_and_apparent_are_excluded() {
        let results = vec![ok(0, 10.0), failed(1), ok(2, 20.0), apparent(1000.0)];
        let table = percentile_intervals(&results, 0.5).unwrap();
        let limit = table[&ParamName::Limit];
        assert_eq!(limit.n_samples, 2);
        assert!(limit.upper <= 20.0);
    }

    #[test]
    fn too_few_successes_is_insufficient() {
        let results = vec![ok(0, 10.0), failed(1), failed(2), apparent(10.0)];
        let err = percentile_intervals(&results, 0.95).unwrap_err();
        assert_eq!(err, BootstrapError::InsufficientSamples { successful: 1, required: 2 });

        let err = percentile_intervals_with_min(&[ok(0, 1.0), ok(1, 2.0)], 0.95, 3).unwrap_err();
        assert!(matches!(err, BootstrapError::InsufficientSamples { successful: 2, required: 3 }));
    }

    #[test]
    fn wider_level_never_narrows() {
        let results: Vec<FitResult> = (0..200).map(|i| ok(i, 50.0 + ((i * 37) % 101) as f64 / 5.0)).collect();
        let narrow = percentile_intervals(&results, 0.95).unwrap();
        let wide = percentile_intervals(&results, 0.99).unwrap();
        for name in ParamName::ALL {
            assert!(wide[&name].lower <= narrow[&name].lower);
            assert!(wide[&name].upper >= narrow[&name].upper);
        }
    }

    #[test]
    fn confidence_level_must_be_open_unit() {
        let results = vec![ok(0, 10.0), ok(1, 20.0)];
        for level in [0.0, 1.0, 1.5] {
            assert!(matches!(
                percentile_intervals(&results, level),
                Err(BootstrapError::InvalidConfiguration(_))
            ));
        }
    }
}
