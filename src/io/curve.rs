//! Read/write report JSON files.
//!
//! Report JSON is the "portable" representation of a bootstrap run:
//! - selection (habitat, treatment) and the resampling configuration
//! - apparent fit + percentile intervals + trial counts
//! - a precomputed fitted grid for quick plotting
//!
//! The schema is defined by `domain::ReportFile`.

use std::fs::File;
use std::path::Path;

use crate::domain::{CurveGrid, CurveModel, ReportFile};
use crate::error::AppError;
use crate::models::ModelForm;

/// Points in the fitted grid stored with a report.
pub const GRID_POINTS: usize = 101;

/// Write a report JSON file.
pub fn write_report_json(path: &Path, report: &ReportFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create report JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, report)
        .map_err(|e| AppError::new(2, format!("Failed to write report JSON: {e}")))?;
    Ok(())
}

/// Read a report JSON file.
pub fn read_report_json(path: &Path) -> Result<ReportFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open report JSON '{}': {e}", path.display())))?;
    let report: ReportFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid report JSON: {e}")))?;
    Ok(report)
}

/// Evaluate `curve` on `n` evenly spaced times over `[t_min, t_max]`.
pub fn build_grid<M: ModelForm + ?Sized>(
    model: &M,
    curve: &CurveModel,
    t_min: f64,
    t_max: f64,
    n: usize,
) -> CurveGrid {
    let n = n.max(2);
    let mut t0 = t_min;
    let mut t1 = t_max;
    if !(t0.is_finite() && t1.is_finite()) || t1 < t0 {
        t0 = 0.0;
        t1 = 30.0;
    }
    if (t1 - t0).abs() < 1e-9 {
        t0 = (t0 - 0.5).max(0.0);
        t1 += 0.5;
    }

    let mut time_days = Vec::with_capacity(n);
    let mut bod = Vec::with_capacity(n);
    for i in 0..n {
        let u = i as f64 / (n as f64 - 1.0);
        let t = t0 + u * (t1 - t0);
        time_days.push(t);
        bod.push(model.predict(t, &curve.params));
    }
    CurveGrid { time_days, bod }
}
