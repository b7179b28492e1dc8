//! Command-line parsing for the BOD bootstrap fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{Habitat, Treatment};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "bod", version, about = "Logistic BOD curve fitting with bootstrap confidence intervals")]
pub struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit one habitat/treatment, bootstrap the fit, and print percentile intervals.
    Fit(FitArgs),
    /// Print mean/sd BOD per habitat, treatment and time.
    Describe(DescribeArgs),
    /// Write a synthetic raw-pressure CSV (sample + blank reactors).
    Simulate(SimulateArgs),
    /// Plot a previously exported report JSON.
    Plot(PlotArgs),
}

/// Preprocessing options shared by `fit` and `describe`.
#[derive(Debug, Args, Clone)]
pub struct PrepArgs {
    /// Reactor id to drop before conversion (repeatable).
    #[arg(long = "exclude-reactor", value_name = "ID")]
    pub exclude_reactor: Vec<String>,

    /// Molar mass of O2 (mg/mol).
    #[arg(long, default_value_t = 32_000.0)]
    pub oxygen_molar_mass: f64,

    /// Gas constant (L·hPa/(mol·K)).
    #[arg(long, default_value_t = 83.144)]
    pub gas_constant: f64,

    /// Bunsen absorption coefficient of O2.
    #[arg(long, default_value_t = 0.03103)]
    pub bunsen_coefficient: f64,

    /// Measurement temperature (K).
    #[arg(long, default_value_t = 293.15)]
    pub measurement_temp: f64,

    /// Reference temperature (K).
    #[arg(long, default_value_t = 273.15)]
    pub reference_temp: f64,

    /// Total bottle volume (mL).
    #[arg(long, default_value_t = 510.0)]
    pub total_volume: f64,

    /// Liquid sample volume (mL).
    #[arg(long, default_value_t = 250.0)]
    pub sample_volume: f64,
}

/// Options for `bod fit`.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Raw pressure CSV (reactor, habitat, treatment, time, pressure).
    #[arg(short = 'i', long, value_name = "CSV")]
    pub input: PathBuf,

    /// Habitat to fit.
    #[arg(long, value_enum)]
    pub habitat: Habitat,

    /// Treatment to fit.
    #[arg(long, value_enum)]
    pub treatment: Treatment,

    #[command(flatten)]
    pub prep: PrepArgs,

    /// Initial guess for the half-saturation time (days).
    #[arg(long, default_value_t = 0.0)]
    pub guess_half_time: f64,

    /// Initial guess for the rate constant (1/day).
    #[arg(long, default_value_t = 0.1)]
    pub guess_k: f64,

    /// Initial guess for the BOD limit (mg/L).
    #[arg(long, default_value_t = 70.0)]
    pub guess_limit: f64,

    /// Number of bootstrap resamples.
    #[arg(short = 'n', long, default_value_t = 1000)]
    pub resamples: usize,

    /// Seed for resampling.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Confidence level of the percentile intervals.
    #[arg(long, default_value_t = 0.95)]
    pub confidence: f64,

    /// Skip the fit to the unresampled data.
    #[arg(long)]
    pub no_apparent: bool,

    /// Minimum successful resampled fits required for intervals.
    #[arg(long, default_value_t = 2)]
    pub min_successful: usize,

    /// Run trials on a single thread.
    #[arg(long)]
    pub sequential: bool,

    /// Gauss–Newton iteration budget per fit.
    #[arg(long, default_value_t = 50)]
    pub max_iterations: usize,

    /// Relative-offset convergence tolerance.
    #[arg(long, default_value_t = 1e-6)]
    pub tolerance: f64,

    /// Smallest step factor before a fit is abandoned.
    #[arg(long, default_value_t = 1.0 / 1024.0)]
    pub min_step_factor: f64,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Histogram bins for the bootstrap distributions (0 disables histograms).
    #[arg(long, default_value_t = 0)]
    pub histogram_bins: usize,

    /// Export one row per trial to CSV.
    #[arg(long = "export-trials", value_name = "CSV")]
    pub export_trials: Option<PathBuf>,

    /// Export processed observations (drift-adjusted pressure + BOD) to CSV.
    #[arg(long = "export-observations", value_name = "CSV")]
    pub export_observations: Option<PathBuf>,

    /// Export the report (fit + intervals + fitted grid) to JSON.
    #[arg(long = "export-report", value_name = "JSON")]
    pub export_report: Option<PathBuf>,
}

/// Options for `bod describe`.
#[derive(Debug, Parser, Clone)]
pub struct DescribeArgs {
    /// Raw pressure CSV.
    #[arg(short = 'i', long, value_name = "CSV")]
    pub input: PathBuf,

    /// Only show this habitat.
    #[arg(long, value_enum)]
    pub habitat: Option<Habitat>,

    /// Only show this treatment.
    #[arg(long, value_enum)]
    pub treatment: Option<Treatment>,

    #[command(flatten)]
    pub prep: PrepArgs,
}

/// Options for `bod simulate`.
#[derive(Debug, Parser, Clone)]
pub struct SimulateArgs {
    /// Output CSV path.
    #[arg(short = 'o', long, value_name = "CSV")]
    pub output: PathBuf,

    #[arg(long, value_enum, default_value_t = Habitat::Sand)]
    pub habitat: Habitat,

    #[arg(long, value_enum, default_value_t = Treatment::Plastic)]
    pub treatment: Treatment,

    /// True half-saturation time (days).
    #[arg(long, default_value_t = 5.0)]
    pub half_time: f64,

    /// True rate constant (1/day).
    #[arg(long, default_value_t = 0.3)]
    pub k: f64,

    /// True BOD limit (mg/L).
    #[arg(long, default_value_t = 70.0)]
    pub limit: f64,

    /// Days of daily readings (times 0..=days).
    #[arg(long, default_value_t = 30)]
    pub days: usize,

    /// Sample reactors.
    #[arg(long, default_value_t = 3)]
    pub replicates: usize,

    /// Blank reactors.
    #[arg(long, default_value_t = 2)]
    pub blanks: usize,

    /// Pressure at the first reading (hPa).
    #[arg(long, default_value_t = 1013.25)]
    pub initial_pressure: f64,

    /// Temperature drift amplitude (hPa).
    #[arg(long, default_value_t = 1.5)]
    pub drift_amplitude: f64,

    /// Temperature drift period (days).
    #[arg(long, default_value_t = 7.0)]
    pub drift_period: f64,

    /// Pressure noise standard deviation (hPa).
    #[arg(long, default_value_t = 0.3)]
    pub noise: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Options for plotting a saved report.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Report JSON file produced by `bod fit --export-report`.
    #[arg(long, value_name = "JSON")]
    pub report: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}
