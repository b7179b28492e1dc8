//! Reporting utilities: descriptive tables, residuals, and formatted terminal output.

use std::collections::BTreeMap;

use crate::domain::{CurveModel, Habitat, Observation, ObservationSet, Treatment};
use crate::error::AppError;
use crate::math::mean_sd;
use crate::models::ModelForm;

pub mod format;

pub use format::*;

/// BOD statistics for one (habitat, treatment, time) cell.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSummary {
    pub habitat: Habitat,
    pub treatment: Treatment,
    pub time_days: f64,
    pub n: usize,
    pub mean_bod: f64,
    /// Sample standard deviation; NaN for a single observation.
    pub sd_bod: f64,
}

/// Observed vs fitted BOD for one observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Residual {
    pub reactor: String,
    pub time_days: f64,
    pub bod: f64,
    pub fitted: f64,
    pub residual: f64,
}

/// Mean, sd and count of BOD per habitat, treatment and time point.
///
/// Rows are ordered by habitat, treatment, then time.
pub fn describe_by_time(observations: &[Observation]) -> Vec<TimeSummary> {
    let mut groups: BTreeMap<(Habitat, Treatment, u64), (f64, Vec<f64>)> = BTreeMap::new();
    for o in observations {
        // Nonnegative times order correctly by bit pattern.
        groups
            .entry((o.habitat, o.treatment, (o.time_days + 0.0).to_bits()))
            .or_insert_with(|| (o.time_days, Vec::new()))
            .1
            .push(o.bod);
    }

    groups
        .into_iter()
        .map(|((habitat, treatment, _), (time_days, values))| {
            let (mean_bod, sd_bod) = mean_sd(&values).unwrap_or((f64::NAN, f64::NAN));
            TimeSummary {
                habitat,
                treatment,
                time_days,
                n: values.len(),
                mean_bod,
                sd_bod,
            }
        })
        .collect()
}

/// Compute fitted values and residuals for each observation.
pub fn compute_residuals<M: ModelForm + ?Sized>(
    observations: &ObservationSet,
    model: &M,
    curve: &CurveModel,
) -> Result<Vec<Residual>, AppError> {
    let mut out = Vec::with_capacity(observations.len());
    for o in observations.observations() {
        let fitted = model.predict(o.time_days, &curve.params);
        if !fitted.is_finite() {
            return Err(AppError::new(4, "Non-finite model prediction during residual computation."));
        }
        out.push(Residual {
            reactor: o.reactor.clone(),
            time_days: o.time_days,
            bod: o.bod,
            fitted,
            residual: o.bod - fitted,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Parameters;
    use crate::models::Logistic;

    fn obs(reactor: &str, treatment: Treatment, t: f64, bod: f64) -> Observation {
        Observation {
            reactor: reactor.to_string(),
            habitat: Habitat::Sand,
            treatment,
            time_days: t,
            pressure: 0.0,
            adjusted_pressure: 0.0,
            bod,
        }
    }

    #[test]
    fn describe_groups_by_cell() {
        let rows = describe_by_time(&[
            obs("R1", Treatment::Paper, 1.0, 10.0),
            obs("R2", Treatment::Paper, 1.0, 14.0),
            obs("R1", Treatment::Paper, 0.0, 0.0),
            obs("R3", Treatment::Control, 1.0, 5.0),
        ]);
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].treatment, Treatment::Control);
        assert_eq!(rows[0].n, 1);
        assert!(rows[0].sd_bod.is_nan());

        assert_eq!(rows[1].time_days, 0.0);
        assert_eq!(rows[2].n, 2);
        assert!((rows[2].mean_bod - 12.0).abs() < 1e-12);
        assert!((rows[2].sd_bod - 2.0_f64.sqrt() * 2.0).abs() < 1e-12);
    }

    #[test]
    fn residuals_are_observed_minus_fitted() {
        let curve = CurveModel {
            params: Parameters::new(5.0, 0.3, 70.0),
            rss: 0.0,
            iterations: 1,
        };
        let set = ObservationSet::new(vec![obs("R1", Treatment::Paper, 5.0, 36.0)]).unwrap();
        let res = compute_residuals(&set, &Logistic, &curve).unwrap();
        assert!((res[0].fitted - 35.0).abs() < 1e-12);
        assert!((res[0].residual - 1.0).abs() < 1e-12);
    }
}
