//! Bootstrap resampling over the nonlinear fit.
//!
//! Responsibilities:
//!
//! - validate the resampling configuration up front
//! - draw `resample_count` resamples with replacement (one RNG sub-seed per trial)
//! - fit every resample independently (parallel when enabled)
//! - optionally fit the unresampled "apparent" sample
//!
//! A failed trial is recorded in its `FitResult`, never dropped and never
//! fatal. Results are ordered by trial index with the apparent fit last, so a
//! run is identical for a fixed seed regardless of worker count.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::domain::{BootstrapConfig, FitResult, ObservationSet, Parameters, TrialCounts, TrialKind};
use crate::error::BootstrapError;
use crate::fit::solver::fit_point_estimate;
use crate::models::ModelForm;

/// Failure rate above which a run is flagged in the logs.
pub const FAILURE_RATE_WARNING: f64 = 0.10;

/// All trials of one bootstrap run.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapRun {
    pub results: Vec<FitResult>,
    pub requested: usize,
}

impl BootstrapRun {
    pub fn apparent(&self) -> Option<&FitResult> {
        self.results.iter().find(|r| r.trial.is_apparent())
    }

    pub fn resampled(&self) -> impl Iterator<Item = &FitResult> {
        self.results.iter().filter(|r| !r.trial.is_apparent())
    }

    /// Indices of resampled trials whose fit failed.
    pub fn failed_indices(&self) -> Vec<usize> {
        self.resampled()
            .filter(|r| !r.is_success())
            .filter_map(|r| match r.trial {
                TrialKind::Resample { index, .. } => Some(index),
                TrialKind::Apparent => None,
            })
            .collect()
    }

    pub fn failure_count(&self) -> usize {
        self.resampled().filter(|r| !r.is_success()).count()
    }

    pub fn success_count(&self) -> usize {
        self.resampled().filter(|r| r.is_success()).count()
    }

    pub fn failure_rate(&self) -> f64 {
        if self.requested == 0 {
            return 0.0;
        }
        self.failure_count() as f64 / self.requested as f64
    }

    pub fn counts(&self) -> TrialCounts {
        TrialCounts {
            requested: self.requested,
            successful: self.success_count(),
            failed: self.failure_count(),
            failed_indices: self.failed_indices(),
        }
    }
}

/// Reject configurations that cannot produce a meaningful run.
pub fn validate_config(config: &BootstrapConfig) -> Result<(), BootstrapError> {
    if config.resample_count == 0 {
        return Err(BootstrapError::InvalidConfiguration(
            "resample_count must be > 0".to_string(),
        ));
    }
    validate_confidence_level(config.confidence_level)?;
    if config.min_successful == 0 {
        return Err(BootstrapError::InvalidConfiguration(
            "min_successful must be > 0".to_string(),
        ));
    }
    if config.min_successful > config.resample_count {
        return Err(BootstrapError::InvalidConfiguration(format!(
            "min_successful ({}) exceeds resample_count ({})",
            config.min_successful, config.resample_count
        )));
    }
    let solver = &config.solver;
    if solver.max_iterations == 0 {
        return Err(BootstrapError::InvalidConfiguration(
            "solver max_iterations must be > 0".to_string(),
        ));
    }
    if !(solver.tolerance.is_finite() && solver.tolerance > 0.0) {
        return Err(BootstrapError::InvalidConfiguration(format!(
            "solver tolerance must be finite and > 0, got {}",
            solver.tolerance
        )));
    }
    if !(solver.min_step_factor > 0.0 && solver.min_step_factor <= 1.0) {
        return Err(BootstrapError::InvalidConfiguration(format!(
            "solver min_step_factor must be in (0, 1], got {}",
            solver.min_step_factor
        )));
    }
    Ok(())
}

pub(crate) fn validate_confidence_level(level: f64) -> Result<(), BootstrapError> {
    if level.is_finite() && level > 0.0 && level < 1.0 {
        Ok(())
    } else {
        Err(BootstrapError::InvalidConfiguration(format!(
            "confidence_level must be in (0, 1), got {level}"
        )))
    }
}

/// Run the bootstrap with the configured initial guess for every trial.
pub fn bootstrap<M: ModelForm + ?Sized>(
    observations: &ObservationSet,
    model: &M,
    config: &BootstrapConfig,
) -> Result<BootstrapRun, BootstrapError> {
    let guess = config.initial_guess;
    bootstrap_with_guesses(observations, model, config, move |_| guess)
}

/// Run the bootstrap, taking the initial guess for resample `i` from `guess_for(i)`.
///
/// The apparent fit always starts from `config.initial_guess`.
pub fn bootstrap_with_guesses<M, G>(
    observations: &ObservationSet,
    model: &M,
    config: &BootstrapConfig,
    guess_for: G,
) -> Result<BootstrapRun, BootstrapError>
where
    M: ModelForm + ?Sized,
    G: Fn(usize) -> Parameters + Sync,
{
    validate_config(config)?;
    if observations.is_empty() {
        return Err(BootstrapError::InvalidConfiguration(
            "observation set is empty".to_string(),
        ));
    }

    let n = observations.len();
    let started = Instant::now();

    let run_trial = |index: usize| -> FitResult {
        let seed = trial_seed(config.seed, index);
        let draws = draw_indices(n, seed);
        let sample = observations.resample(&draws);
        let outcome = fit_point_estimate(&sample, model, guess_for(index), &config.solver);
        if let Err(reason) = &outcome {
            debug!(trial = index, seed, %reason, "bootstrap trial failed");
        }
        FitResult {
            trial: TrialKind::Resample { index, seed },
            draws,
            outcome,
        }
    };

    let mut results: Vec<FitResult> = if config.parallel {
        (0..config.resample_count).into_par_iter().map(&run_trial).collect()
    } else {
        (0..config.resample_count).map(&run_trial).collect()
    };

    if config.include_apparent {
        let outcome = fit_point_estimate(observations, model, config.initial_guess, &config.solver);
        if let Err(reason) = &outcome {
            warn!(%reason, "apparent fit failed");
        }
        results.push(FitResult {
            trial: TrialKind::Apparent,
            draws: (0..n).collect(),
            outcome,
        });
    }

    let run = BootstrapRun {
        results,
        requested: config.resample_count,
    };

    info!(
        model = model.name(),
        n_obs = n,
        requested = run.requested,
        failed = run.failure_count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "bootstrap finished"
    );
    if run.failure_rate() > FAILURE_RATE_WARNING {
        warn!(
            failure_rate = run.failure_rate(),
            "high bootstrap failure rate; check the initial guess or the data"
        );
    }

    Ok(run)
}

/// Per-trial RNG seed derived from the run seed (SplitMix64 finalizer).
///
/// Mixing keeps runs with neighbouring seeds from sharing shifted resamples.
pub fn trial_seed(seed: u64, index: usize) -> u64 {
    let mut z = seed.wrapping_add((index as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Draw `n` indices uniformly from `0..n` with replacement.
pub fn draw_indices(n: usize, seed: u64) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(0..n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Habitat, Observation, Treatment};
    use crate::error::FitFailure;
    use crate::models::Logistic;

    fn noiseless_set(truth: Parameters) -> ObservationSet {
        let obs = (0..=30)
            .map(|d| {
                let t = d as f64;
                Observation {
                    reactor: "R1".to_string(),
                    habitat: Habitat::Mud,
                    treatment: Treatment::Plastic,
                    time_days: t,
                    pressure: 0.0,
                    adjusted_pressure: 0.0,
                    bod: Logistic.predict(t, &truth),
                }
            })
            .collect();
        ObservationSet::new(obs).unwrap()
    }

    fn config(resample_count: usize, include_apparent: bool) -> BootstrapConfig {
        BootstrapConfig {
            initial_guess: Parameters::new(5.0, 0.3, 70.0),
            resample_count,
            include_apparent,
            seed: 7,
            ..BootstrapConfig::default()
        }
    }

    #[test]
    fn entry_count_follows_apparent_flag() {
        let set = noiseless_set(Parameters::new(5.0, 0.3, 70.0));

        let with = bootstrap(&set, &Logistic, &config(25, true)).unwrap();
        assert_eq!(with.results.len(), 26);
        assert_eq!(with.results.iter().filter(|r| r.trial.is_apparent()).count(), 1);
        assert!(with.apparent().is_some());

        let without = bootstrap(&set, &Logistic, &config(25, false)).unwrap();
        assert_eq!(without.results.len(), 25);
        assert!(without.apparent().is_none());
    }

    #[test]
    fn identical_seed_reproduces_resamples_and_fits() {
        let set = noiseless_set(Parameters::new(5.0, 0.3, 70.0));
        let mut cfg = config(40, true);
        cfg.initial_guess = Parameters::new(4.0, 0.25, 65.0);

        let a = bootstrap(&set, &Logistic, &cfg).unwrap();
        let b = bootstrap(&set, &Logistic, &cfg).unwrap();
        assert_eq!(a, b);

        cfg.parallel = false;
        let sequential = bootstrap(&set, &Logistic, &cfg).unwrap();
        assert_eq!(a, sequential);
    }

    #[test]
    fn different_seeds_draw_different_resamples() {
        let set = noiseless_set(Parameters::new(5.0, 0.3, 70.0));
        let a = bootstrap(&set, &Logistic, &config(5, false)).unwrap();
        let mut cfg = config(5, false);
        cfg.seed = 8;
        let b = bootstrap(&set, &Logistic, &cfg).unwrap();
        assert_ne!(a.results[0].draws, b.results[0].draws);
    }

    #[test]
    fn poisoned_guesses_are_counted_as_failures() {
        let set = noiseless_set(Parameters::new(5.0, 0.3, 70.0));
        let cfg = config(100, true);
        let poisoned = [3usize, 17, 42, 88, 99];
        let run = bootstrap_with_guesses(&set, &Logistic, &cfg, |i| {
            if poisoned.contains(&i) {
                Parameters::new(f64::NAN, f64::NAN, f64::NAN)
            } else {
                cfg.initial_guess
            }
        })
        .unwrap();

        assert_eq!(run.results.len(), 101);
        assert_eq!(run.failure_count(), poisoned.len());
        assert_eq!(run.success_count(), 100 - poisoned.len());
        assert_eq!(run.failed_indices(), poisoned.to_vec());
        for r in run.resampled().filter(|r| !r.is_success()) {
            assert_eq!(r.outcome, Err(FitFailure::NonFiniteStart));
        }
        assert!(run.apparent().unwrap().is_success());

        let counts = run.counts();
        assert_eq!(counts.failed, 5);
        assert_eq!(counts.successful, 95);
    }

    #[test]
    fn invalid_configurations_are_rejected_before_work() {
        let set = noiseless_set(Parameters::new(5.0, 0.3, 70.0));

        let zero = config(0, true);
        assert!(matches!(
            bootstrap(&set, &Logistic, &zero),
            Err(BootstrapError::InvalidConfiguration(_))
        ));

        for level in [0.0, 1.0, -0.5, f64::NAN] {
            let mut cfg = config(10, true);
            cfg.confidence_level = level;
            assert!(matches!(
                bootstrap(&set, &Logistic, &cfg),
                Err(BootstrapError::InvalidConfiguration(_))
            ));
        }

        let mut unreachable = config(10, true);
        unreachable.min_successful = 11;
        assert!(matches!(
            bootstrap(&set, &Logistic, &unreachable),
            Err(BootstrapError::InvalidConfiguration(msg)) if msg.contains("min_successful")
        ));
        unreachable.min_successful = 10;
        assert!(bootstrap(&set, &Logistic, &unreachable).is_ok());
    }

    #[test]
    fn degenerate_resamples_fail_per_trial() {
        // Only two distinct times: every resample is rank deficient.
        let truth = Parameters::new(5.0, 0.3, 70.0);
        let obs = [2.0, 2.0, 8.0, 8.0]
            .iter()
            .map(|&t| Observation {
                reactor: "R1".to_string(),
                habitat: Habitat::Sand,
                treatment: Treatment::Control,
                time_days: t,
                pressure: 0.0,
                adjusted_pressure: 0.0,
                bod: Logistic.predict(t, &truth),
            })
            .collect();
        let set = ObservationSet::new(obs).unwrap();

        let run = bootstrap(&set, &Logistic, &config(10, true)).unwrap();
        assert_eq!(run.failure_count(), 10);
        assert!(!run.apparent().unwrap().is_success());
    }

    #[test]
    fn draws_stay_in_bounds() {
        let draws = draw_indices(31, trial_seed(42, 0));
        assert_eq!(draws.len(), 31);
        assert!(draws.iter().all(|&i| i < 31));
        assert_ne!(trial_seed(42, 0), trial_seed(42, 1));
        assert_ne!(trial_seed(42, 1), trial_seed(43, 0));
    }
}
