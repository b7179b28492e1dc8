//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during preprocessing and fitting
//! - exported to JSON/CSV
//! - reloaded later for plotting

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{BootstrapError, FitFailure};

/// Benthic habitat the reactor sediment was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Habitat {
    Sand,
    Mud,
    Seagrass,
}

impl Habitat {
    pub fn display_name(self) -> &'static str {
        match self {
            Habitat::Sand => "Sand",
            Habitat::Mud => "Mud",
            Habitat::Seagrass => "Seagrass",
        }
    }
}

/// Material added to the reactor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Treatment {
    Control,
    Paper,
    Plastic,
    /// Sediment-free reactor. Only used to track temperature drift.
    Blank,
}

impl Treatment {
    pub fn display_name(self) -> &'static str {
        match self {
            Treatment::Control => "Control",
            Treatment::Paper => "Paper",
            Treatment::Plastic => "Plastic",
            Treatment::Blank => "Blank",
        }
    }

    pub fn is_blank(self) -> bool {
        self == Treatment::Blank
    }
}

/// A raw logger reading as it appears in the input CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressureReading {
    pub reactor: String,
    pub habitat: Habitat,
    pub treatment: Treatment,
    pub time_days: f64,
    /// Headspace pressure (hPa).
    pub pressure: f64,
}

/// A single processed time-series sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub reactor: String,
    pub habitat: Habitat,
    pub treatment: Treatment,
    pub time_days: f64,
    pub pressure: f64,
    /// Pressure after subtracting the blank drift offset.
    pub adjusted_pressure: f64,
    /// Biological oxygen demand (mg O2/L).
    pub bod: f64,
}

/// Regression dataset: a non-empty, ordered set of observations from one
/// habitat/treatment combination.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationSet {
    observations: Vec<Observation>,
}

impl ObservationSet {
    pub fn new(observations: Vec<Observation>) -> Result<Self, BootstrapError> {
        if observations.is_empty() {
            return Err(BootstrapError::InvalidConfiguration(
                "observation set is empty".to_string(),
            ));
        }
        Ok(Self { observations })
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn times(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.time_days).collect()
    }

    pub fn bods(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.bod).collect()
    }

    /// Number of distinct time points (compared bitwise, `-0.0 == 0.0`).
    pub fn distinct_times(&self) -> usize {
        self.observations
            .iter()
            .map(|o| (o.time_days + 0.0).to_bits())
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Build a resample from drawn indices.
    ///
    /// # Panics
    /// Panics if an index is out of bounds or `indices` is empty.
    pub fn resample(&self, indices: &[usize]) -> ObservationSet {
        assert!(!indices.is_empty(), "resample needs at least one draw");
        ObservationSet {
            observations: indices.iter().map(|&i| self.observations[i].clone()).collect(),
        }
    }
}

/// Named model parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamName {
    HalfTime,
    Rate,
    Limit,
}

impl ParamName {
    pub const ALL: [ParamName; 3] = [ParamName::HalfTime, ParamName::Rate, ParamName::Limit];

    pub fn label(self) -> &'static str {
        match self {
            ParamName::HalfTime => "half_time",
            ParamName::Rate => "k",
            ParamName::Limit => "limit",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            ParamName::HalfTime => "d",
            ParamName::Rate => "1/d",
            ParamName::Limit => "mg/L",
        }
    }
}

/// Logistic curve parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    /// Half-saturation time (days).
    pub half_time: f64,
    /// Growth rate (1/day).
    pub k: f64,
    /// Limiting BOD (mg O2/L).
    pub limit: f64,
}

impl Parameters {
    pub fn new(half_time: f64, k: f64, limit: f64) -> Self {
        Self { half_time, k, limit }
    }

    /// Parameter vector in `[half_time, k, limit]` order.
    pub fn to_array(self) -> [f64; 3] {
        [self.half_time, self.k, self.limit]
    }

    pub fn from_array(v: [f64; 3]) -> Self {
        Self {
            half_time: v[0],
            k: v[1],
            limit: v[2],
        }
    }

    pub fn get(&self, name: ParamName) -> f64 {
        match name {
            ParamName::HalfTime => self.half_time,
            ParamName::Rate => self.k,
            ParamName::Limit => self.limit,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.half_time.is_finite() && self.k.is_finite() && self.limit.is_finite()
    }
}

/// A converged logistic fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveModel {
    pub params: Parameters,
    /// Residual sum of squares at the solution.
    pub rss: f64,
    /// Gauss–Newton iterations used.
    pub iterations: usize,
}

/// Which sample a fit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrialKind {
    /// Fit to the unresampled observation set.
    Apparent,
    /// Fit to resample `index`, drawn with RNG sub-seed `seed`.
    Resample { index: usize, seed: u64 },
}

impl TrialKind {
    pub fn is_apparent(self) -> bool {
        matches!(self, TrialKind::Apparent)
    }

    pub fn label(self) -> String {
        match self {
            TrialKind::Apparent => "Apparent".to_string(),
            TrialKind::Resample { index, .. } => format!("Bootstrap{:04}", index + 1),
        }
    }
}

/// Outcome of one bootstrap trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub trial: TrialKind,
    /// Indices into the original observation set that made up this sample.
    #[serde(skip)]
    pub draws: Vec<usize>,
    pub outcome: Result<CurveModel, FitFailure>,
}

impl FitResult {
    pub fn curve(&self) -> Option<&CurveModel> {
        self.outcome.as_ref().ok()
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Percentile interval for one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileInterval {
    pub lower: f64,
    pub upper: f64,
    pub confidence_level: f64,
    /// Number of successful resampled fits the interval was built from.
    pub n_samples: usize,
}

impl PercentileInterval {
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Gauss–Newton solver settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverOptions {
    pub max_iterations: usize,
    /// Relative-offset convergence tolerance.
    pub tolerance: f64,
    /// Smallest step factor tried before giving up.
    pub min_step_factor: f64,
    /// Jacobian is treated as singular when `s_min <= rank_tolerance * s_max`.
    pub rank_tolerance: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tolerance: 1e-6,
            min_step_factor: 1.0 / 1024.0,
            rank_tolerance: 1e-10,
        }
    }
}

/// Resampling configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub initial_guess: Parameters,
    pub resample_count: usize,
    pub include_apparent: bool,
    pub confidence_level: f64,
    pub seed: u64,
    /// Minimum successful resampled fits required for intervals.
    pub min_successful: usize,
    /// Run trials on the rayon pool.
    pub parallel: bool,
    pub solver: SolverOptions,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            initial_guess: Parameters::new(0.0, 0.1, 70.0),
            resample_count: 1000,
            include_apparent: true,
            confidence_level: 0.95,
            seed: 42,
            min_successful: 2,
            parallel: true,
            solver: SolverOptions::default(),
        }
    }
}

/// Constants of the manometric BOD conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalConstants {
    /// Molar mass of O2 (mg/mol).
    pub oxygen_molar_mass: f64,
    /// Gas constant (L·hPa/(mol·K)).
    pub gas_constant: f64,
    /// Bunsen absorption coefficient of O2 in water.
    pub bunsen_coefficient: f64,
    /// Measurement temperature (K).
    pub measurement_temp_k: f64,
    /// Reference temperature (K).
    pub reference_temp_k: f64,
    /// Total bottle volume (mL).
    pub total_volume_ml: f64,
    /// Liquid sample volume (mL).
    pub sample_volume_ml: f64,
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self {
            oxygen_molar_mass: 32_000.0,
            gas_constant: 83.144,
            bunsen_coefficient: 0.03103,
            measurement_temp_k: 293.15,
            reference_temp_k: 273.15,
            total_volume_ml: 510.0,
            sample_volume_ml: 250.0,
        }
    }
}

/// Preprocessing configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrepConfig {
    pub constants: PhysicalConstants,
    /// Reactors flagged as outliers and dropped before conversion.
    pub excluded_reactors: Vec<String>,
}

/// A full `bod fit` run as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub csv_path: PathBuf,
    pub habitat: Habitat,
    pub treatment: Treatment,
    pub prep: PrepConfig,
    pub bootstrap: BootstrapConfig,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    pub histogram_bins: usize,

    pub export_trials: Option<PathBuf>,
    pub export_observations: Option<PathBuf>,
    pub export_report: Option<PathBuf>,
}

/// A saved report file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportFile {
    pub tool: String,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub habitat: Habitat,
    pub treatment: Treatment,
    pub n_observations: usize,
    pub config: BootstrapConfig,
    pub apparent: Option<CurveModel>,
    pub intervals: Vec<(ParamName, PercentileInterval)>,
    pub trials: TrialCounts,
    pub grid: CurveGrid,
}

/// Trial bookkeeping for a bootstrap run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialCounts {
    pub requested: usize,
    pub successful: usize,
    pub failed: usize,
    pub failed_indices: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveGrid {
    pub time_days: Vec<f64>,
    pub bod: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(t: f64) -> Observation {
        Observation {
            reactor: "R1".to_string(),
            habitat: Habitat::Sand,
            treatment: Treatment::Plastic,
            time_days: t,
            pressure: 1000.0,
            adjusted_pressure: 1000.0,
            bod: t,
        }
    }

    #[test]
    fn empty_observation_set_is_rejected() {
        let err = ObservationSet::new(Vec::new()).unwrap_err();
        assert!(matches!(err, BootstrapError::InvalidConfiguration(_)));
    }

    #[test]
    fn distinct_times_ignores_duplicates() {
        let set = ObservationSet::new(vec![obs(0.0), obs(1.0), obs(1.0), obs(2.0)]).unwrap();
        assert_eq!(set.distinct_times(), 3);

        let re = set.resample(&[1, 1, 2, 2]);
        assert_eq!(re.len(), 4);
        assert_eq!(re.distinct_times(), 1);
    }

    #[test]
    fn signed_zero_times_are_one_time_point() {
        let set = ObservationSet::new(vec![obs(-0.0), obs(0.0), obs(1.0)]).unwrap();
        assert_eq!(set.distinct_times(), 2);
    }

    #[test]
    fn parameters_round_trip_through_array_order() {
        let p = Parameters::new(5.0, 0.3, 70.0);
        assert_eq!(p.to_array(), [5.0, 0.3, 70.0]);
        assert_eq!(Parameters::from_array(p.to_array()), p);
        assert_eq!(p.get(ParamName::Rate), 0.3);
    }

    #[test]
    fn trial_labels_distinguish_apparent() {
        assert_eq!(TrialKind::Apparent.label(), "Apparent");
        assert_eq!(TrialKind::Resample { index: 0, seed: 7 }.label(), "Bootstrap0001");
        assert!(TrialKind::Apparent.is_apparent());
    }
}
