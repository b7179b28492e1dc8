//! Preprocessing: raw pressure readings → BOD observations.
//!
//! Pipeline:
//! - drop reactors flagged as outliers
//! - estimate temperature drift from blank reactors (`drift`)
//! - subtract drift, convert each reactor's pressure drop to BOD (`conversion`)
//!
//! No fitting logic here.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{info, warn};

use crate::domain::{Habitat, Observation, ObservationSet, PrepConfig, PressureReading, Treatment};
use crate::error::{AppError, BootstrapError};

pub mod conversion;
pub mod drift;

pub use conversion::*;
pub use drift::*;

/// Preprocessing output.
#[derive(Debug, Clone)]
pub struct PrepOutput {
    /// Observations of all non-blank reactors, ordered by reactor then time.
    pub observations: Vec<Observation>,
    pub drift: DriftCurve,
    /// Reactors removed by the exclusion list.
    pub excluded: Vec<String>,
    /// BOD per hPa of pressure drop.
    pub bod_factor: f64,
}

/// Convert raw readings into BOD observations.
pub fn preprocess(readings: &[PressureReading], config: &PrepConfig) -> Result<PrepOutput, AppError> {
    let factor = bod_factor(&config.constants)?;

    let requested: BTreeSet<&str> = config.excluded_reactors.iter().map(String::as_str).collect();
    let present: BTreeSet<&str> = readings.iter().map(|r| r.reactor.as_str()).collect();
    for missing in requested.difference(&present) {
        warn!(reactor = %missing, "excluded reactor not present in input");
    }
    let excluded: Vec<String> = requested
        .intersection(&present)
        .map(|s| s.to_string())
        .collect();

    let kept: Vec<PressureReading> = readings
        .iter()
        .filter(|r| !requested.contains(r.reactor.as_str()))
        .cloned()
        .collect();

    let drift = DriftCurve::from_readings(&kept);
    if drift.is_empty() {
        warn!("no blank reactors found; pressures are not drift-corrected");
    }

    let mut by_reactor: BTreeMap<&str, Vec<&PressureReading>> = BTreeMap::new();
    for r in kept.iter().filter(|r| !r.treatment.is_blank()) {
        by_reactor.entry(r.reactor.as_str()).or_default().push(r);
    }

    let mut observations = Vec::new();
    for (reactor, mut series) in by_reactor {
        series.sort_by(|a, b| a.time_days.total_cmp(&b.time_days));

        let (habitat, treatment) = (series[0].habitat, series[0].treatment);
        if series.iter().any(|r| r.habitat != habitat || r.treatment != treatment) {
            return Err(AppError::new(
                2,
                format!("Reactor '{reactor}' has readings with mixed habitat/treatment labels."),
            ));
        }

        let baseline = series[0].pressure - drift.offset_at(series[0].time_days);
        for r in series {
            let adjusted_pressure = r.pressure - drift.offset_at(r.time_days);
            observations.push(Observation {
                reactor: r.reactor.clone(),
                habitat: r.habitat,
                treatment: r.treatment,
                time_days: r.time_days,
                pressure: r.pressure,
                adjusted_pressure,
                bod: factor * (baseline - adjusted_pressure),
            });
        }
    }

    if observations.is_empty() {
        return Err(AppError::new(3, "No non-blank reactor readings remain after exclusions."));
    }

    info!(
        observations = observations.len(),
        blanks = drift.blanks().len(),
        excluded = excluded.len(),
        bod_factor = factor,
        "preprocessing finished"
    );

    Ok(PrepOutput {
        observations,
        drift,
        excluded,
        bod_factor: factor,
    })
}

/// Filter observations down to one habitat/treatment combination.
pub fn select(
    observations: &[Observation],
    habitat: Habitat,
    treatment: Treatment,
) -> Result<ObservationSet, BootstrapError> {
    if treatment.is_blank() {
        return Err(BootstrapError::InvalidConfiguration(
            "blank reactors cannot be fitted".to_string(),
        ));
    }
    let selected: Vec<Observation> = observations
        .iter()
        .filter(|o| o.habitat == habitat && o.treatment == treatment)
        .cloned()
        .collect();
    if selected.is_empty() {
        return Err(BootstrapError::InvalidConfiguration(format!(
            "no observations for habitat={} treatment={}",
            habitat.display_name(),
            treatment.display_name()
        )));
    }
    ObservationSet::new(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(reactor: &str, treatment: Treatment, t: f64, p: f64) -> PressureReading {
        PressureReading {
            reactor: reactor.to_string(),
            habitat: Habitat::Mud,
            treatment,
            time_days: t,
            pressure: p,
        }
    }

    fn readings() -> Vec<PressureReading> {
        vec![
            reading("B1", Treatment::Blank, 0.0, 1000.0),
            reading("B1", Treatment::Blank, 1.0, 1001.0),
            reading("B1", Treatment::Blank, 2.0, 1002.0),
            reading("R1", Treatment::Plastic, 2.0, 992.0),
            reading("R1", Treatment::Plastic, 0.0, 1000.0),
            reading("R1", Treatment::Plastic, 1.0, 996.0),
            reading("R2", Treatment::Control, 0.0, 1000.0),
            reading("R2", Treatment::Control, 1.0, 990.0),
        ]
    }

    #[test]
    fn drift_is_removed_before_conversion() {
        let out = preprocess(&readings(), &PrepConfig::default()).unwrap();
        let r1: Vec<&Observation> = out.observations.iter().filter(|o| o.reactor == "R1").collect();
        assert_eq!(r1.len(), 3);
        // Sorted by time; adjusted drop is 0, 5, 10 hPa.
        assert_eq!(r1[0].time_days, 0.0);
        assert!((r1[1].adjusted_pressure - 995.0).abs() < 1e-12);
        assert!((r1[2].adjusted_pressure - 990.0).abs() < 1e-12);
        assert!(r1[0].bod.abs() < 1e-12);
        assert!((r1[2].bod - 10.0 * out.bod_factor).abs() < 1e-9);
        assert!(out.observations.iter().all(|o| !o.treatment.is_blank()));
    }

    #[test]
    fn excluded_reactors_are_dropped_and_listed() {
        let config = PrepConfig {
            excluded_reactors: vec!["R2".to_string(), "R9".to_string()],
            ..PrepConfig::default()
        };
        let out = preprocess(&readings(), &config).unwrap();
        assert_eq!(out.excluded, vec!["R2".to_string()]);
        assert!(out.observations.iter().all(|o| o.reactor != "R2"));
    }

    #[test]
    fn mixed_labels_within_a_reactor_are_rejected() {
        let mut input = readings();
        input.push(reading("R2", Treatment::Paper, 2.0, 985.0));
        let err = preprocess(&input, &PrepConfig::default()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn select_filters_and_rejects_blank_or_empty() {
        let out = preprocess(&readings(), &PrepConfig::default()).unwrap();
        let set = select(&out.observations, Habitat::Mud, Treatment::Plastic).unwrap();
        assert_eq!(set.len(), 3);

        assert!(matches!(
            select(&out.observations, Habitat::Mud, Treatment::Blank),
            Err(BootstrapError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            select(&out.observations, Habitat::Seagrass, Treatment::Plastic),
            Err(BootstrapError::InvalidConfiguration(_))
        ));
    }
}
