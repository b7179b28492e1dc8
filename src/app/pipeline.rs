//! Shared "fit pipeline" logic.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! CSV ingest -> drift/BOD preprocessing -> selection -> bootstrap -> intervals
//!
//! Front-ends (CLI, integration tests) can then focus on presentation.

use tracing::warn;

use crate::domain::{ObservationSet, ReportFile, RunConfig};
use crate::error::{AppError, BootstrapError};
use crate::fit::{BootstrapRun, IntervalTable, bootstrap, percentile_intervals_with_min};
use crate::io::curve::{GRID_POINTS, build_grid};
use crate::io::ingest::{IngestedReadings, load_readings};
use crate::models::Logistic;
use crate::prep::{PrepOutput, preprocess, select};

/// All computed outputs of a single `bod fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedReadings,
    pub prep: PrepOutput,
    pub set: ObservationSet,
    pub run: BootstrapRun,
    /// Too few successful fits fails only the intervals; the run is kept.
    pub intervals: Result<IntervalTable, BootstrapError>,
}

/// Execute the full fitting pipeline from the configured CSV.
pub fn run_fit(config: &RunConfig) -> Result<RunOutput, AppError> {
    let ingest = load_readings(&config.csv_path)?;
    run_fit_with_ingest(config, ingest)
}

/// Execute the fitting pipeline on readings that were already loaded.
pub fn run_fit_with_ingest(config: &RunConfig, ingest: IngestedReadings) -> Result<RunOutput, AppError> {
    let prep = preprocess(&ingest.readings, &config.prep)?;
    let set = select(&prep.observations, config.habitat, config.treatment)?;
    let run = bootstrap(&set, &Logistic, &config.bootstrap)?;
    let intervals = percentile_intervals_with_min(
        &run.results,
        config.bootstrap.confidence_level,
        config.bootstrap.min_successful,
    );
    if let Err(err) = &intervals {
        warn!(%err, "percentile intervals not computed");
    }

    Ok(RunOutput {
        ingest,
        prep,
        set,
        run,
        intervals,
    })
}

/// Assemble the portable report for a finished run.
pub fn build_report(config: &RunConfig, output: &RunOutput) -> ReportFile {
    let apparent = output.run.apparent().and_then(|r| r.curve()).copied();
    let times = output.set.times();
    let t_min = times.iter().copied().fold(f64::INFINITY, f64::min).min(0.0);
    let t_max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let grid = match &apparent {
        Some(curve) => build_grid(&Logistic, curve, t_min, t_max, GRID_POINTS),
        None => crate::domain::CurveGrid {
            time_days: Vec::new(),
            bod: Vec::new(),
        },
    };

    ReportFile {
        tool: "bod".to_string(),
        generated_at: chrono::Utc::now(),
        habitat: config.habitat,
        treatment: config.treatment,
        n_observations: output.set.len(),
        config: config.bootstrap,
        apparent,
        intervals: output
            .intervals
            .as_ref()
            .map(|table| table.iter().map(|(k, v)| (*k, *v)).collect())
            .unwrap_or_default(),
        trials: output.run.counts(),
        grid,
    }
}
