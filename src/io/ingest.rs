//! CSV ingest of raw logger readings.
//!
//! This module turns a reactor pressure log into `PressureReading`s that are
//! safe to preprocess.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Separation of concerns**: no drift correction or fitting here

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use clap::ValueEnum;
use csv::StringRecord;
use tracing::{info, warn};

use crate::domain::{Habitat, PressureReading, Treatment};
use crate::error::AppError;

/// Canonical column names and the aliases accepted for each.
const COLUMNS: [(&str, &[&str]); 5] = [
    ("reactor", &["reactor", "reactor_id", "id"]),
    ("habitat", &["habitat"]),
    ("treatment", &["treatment"]),
    ("time", &["time", "time_days", "day", "days"]),
    ("pressure", &["pressure", "pressure_hpa"]),
];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub reactor: Option<String>,
    pub message: String,
}

/// Ingest output: parsed readings + row errors.
#[derive(Debug, Clone)]
pub struct IngestedReadings {
    pub readings: Vec<PressureReading>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Load readings from a CSV file.
pub fn load_readings(path: &Path) -> Result<IngestedReadings, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    let ingested = read_readings(file)?;
    info!(
        path = %path.display(),
        rows_read = ingested.rows_read,
        rows_used = ingested.rows_used,
        row_errors = ingested.row_errors.len(),
        "readings loaded"
    );
    Ok(ingested)
}

/// Parse readings from any CSV source.
pub fn read_readings<R: Read>(source: R) -> Result<IngestedReadings, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();

    let columns = resolve_columns(&build_header_map(&headers))?;

    let mut readings = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: header is line 1 and lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    reactor: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &columns) {
            Ok(reading) => readings.push(reading),
            Err(message) => {
                warn!(line, %message, "skipping CSV row");
                row_errors.push(RowError {
                    line,
                    reactor: get(&record, columns["reactor"]).map(str::to_string),
                    message,
                });
            }
        }
    }

    let rows_used = readings.len();
    if rows_used == 0 {
        return Err(AppError::new(3, "No valid rows remain after parsing."));
    }

    Ok(IngestedReadings {
        readings,
        row_errors,
        rows_read,
        rows_used,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

/// Map each canonical column to its index, accepting the first alias found.
fn resolve_columns(header_map: &HashMap<String, usize>) -> Result<HashMap<&'static str, usize>, AppError> {
    let mut out = HashMap::new();
    for (canonical, aliases) in COLUMNS {
        let idx = aliases
            .iter()
            .find_map(|alias| header_map.get(*alias).copied())
            .ok_or_else(|| {
                AppError::new(
                    2,
                    format!(
                        "Missing required column: `{canonical}` (accepted: {}).",
                        aliases.join(", ")
                    ),
                )
            })?;
        out.insert(canonical, idx);
    }
    Ok(out)
}

fn parse_row(record: &StringRecord, columns: &HashMap<&'static str, usize>) -> Result<PressureReading, String> {
    let reactor = get_required(record, columns["reactor"], "reactor")?.to_string();

    let habitat_raw = get_required(record, columns["habitat"], "habitat")?;
    let habitat = <Habitat as ValueEnum>::from_str(habitat_raw, true)
        .map_err(|_| format!("Unknown habitat '{habitat_raw}'."))?;

    let treatment_raw = get_required(record, columns["treatment"], "treatment")?;
    let treatment = <Treatment as ValueEnum>::from_str(treatment_raw, true)
        .map_err(|_| format!("Unknown treatment '{treatment_raw}'."))?;

    let time_days = parse_f64(get_required(record, columns["time"], "time")?, "time")?;
    if time_days < 0.0 {
        return Err(format!("Negative time {time_days}."));
    }
    let pressure = parse_f64(get_required(record, columns["pressure"], "pressure")?, "pressure")?;

    Ok(PressureReading {
        reactor,
        habitat,
        treatment,
        time_days,
        pressure,
    })
}

fn get(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

fn get_required<'a>(record: &'a StringRecord, idx: usize, name: &str) -> Result<&'a str, String> {
    get(record, idx).ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn parse_f64(s: &str, name: &str) -> Result<f64, String> {
    let v = s
        .parse::<f64>()
        .map_err(|_| format!("Invalid `{name}` value '{s}'."))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("Non-finite `{name}` value."))
    }
}
