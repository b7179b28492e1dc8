//! Export bootstrap trials and processed data to CSV.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream scripts:
//! - one row per trial (`write_trials_csv`)
//! - one row per processed observation (`write_observations_csv`)
//! - raw logger readings in the ingest schema (`write_readings_csv`)

use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::domain::{FitResult, Observation, PressureReading, TrialKind};
use crate::error::AppError;

#[derive(Debug, Serialize)]
struct TrialRow<'a> {
    trial: String,
    index: Option<usize>,
    seed: Option<u64>,
    status: &'a str,
    failure: &'a str,
    half_time: Option<f64>,
    k: Option<f64>,
    limit: Option<f64>,
    rss: Option<f64>,
    iterations: Option<usize>,
}

impl<'a> TrialRow<'a> {
    fn from_result(r: &'a FitResult) -> Self {
        let (index, seed) = match r.trial {
            TrialKind::Apparent => (None, None),
            TrialKind::Resample { index, seed } => (Some(index), Some(seed)),
        };
        let curve = r.curve();
        Self {
            trial: r.trial.label(),
            index,
            seed,
            status: if r.is_success() { "ok" } else { "failed" },
            failure: r.outcome.as_ref().err().map(|f| f.label()).unwrap_or(""),
            half_time: curve.map(|c| c.params.half_time),
            k: curve.map(|c| c.params.k),
            limit: curve.map(|c| c.params.limit),
            rss: curve.map(|c| c.rss),
            iterations: curve.map(|c| c.iterations),
        }
    }
}

/// Write one row per trial, failed trials included with empty estimates.
pub fn write_trials_csv(path: &Path, results: &[FitResult]) -> Result<(), AppError> {
    let mut writer = create_writer(path, "trials")?;
    for r in results {
        writer
            .serialize(TrialRow::from_result(r))
            .map_err(|e| AppError::new(2, format!("Failed to write trials CSV row: {e}")))?;
    }
    flush(writer, "trials")
}

/// Write processed observations (raw, drift-adjusted pressure and BOD).
pub fn write_observations_csv(path: &Path, observations: &[Observation]) -> Result<(), AppError> {
    let mut writer = create_writer(path, "observations")?;
    for o in observations {
        writer
            .serialize(o)
            .map_err(|e| AppError::new(2, format!("Failed to write observations CSV row: {e}")))?;
    }
    flush(writer, "observations")
}

/// Write raw readings with a header `load_readings` accepts.
pub fn write_readings_csv(path: &Path, readings: &[PressureReading]) -> Result<(), AppError> {
    let mut writer = create_writer(path, "readings")?;
    for r in readings {
        writer
            .serialize(r)
            .map_err(|e| AppError::new(2, format!("Failed to write readings CSV row: {e}")))?;
    }
    flush(writer, "readings")
}

fn create_writer(path: &Path, what: &str) -> Result<csv::Writer<File>, AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create {what} CSV '{}': {e}", path.display())))?;
    Ok(csv::Writer::from_writer(file))
}

fn flush(mut writer: csv::Writer<File>, what: &str) -> Result<(), AppError> {
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush {what} CSV: {e}")))
}
