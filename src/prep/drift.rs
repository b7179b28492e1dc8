//! Temperature-drift estimation from blank reactors.
//!
//! Blank reactors hold no sediment, so any pressure change they show is
//! instrument/temperature drift. Each blank contributes `p(t) − p(first)`;
//! offsets are averaged per time point and linearly interpolated between them.

use std::collections::{BTreeMap, HashMap};

use crate::domain::PressureReading;

/// Mean blank pressure offset as a function of time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriftCurve {
    /// `(time_days, offset_hpa)` sorted by time.
    points: Vec<(f64, f64)>,
    /// Blank reactors the curve was built from.
    blanks: Vec<String>,
}

impl DriftCurve {
    /// Build the curve from the blank readings in `readings` (others are ignored).
    pub fn from_readings(readings: &[PressureReading]) -> Self {
        let mut by_reactor: HashMap<&str, Vec<&PressureReading>> = HashMap::new();
        for r in readings.iter().filter(|r| r.treatment.is_blank()) {
            by_reactor.entry(r.reactor.as_str()).or_default().push(r);
        }

        // Offsets keyed by the time's bit pattern; f64 keys stay exact this way.
        let mut sums: BTreeMap<u64, (f64, f64, usize)> = BTreeMap::new();
        let mut blanks: Vec<String> = by_reactor.keys().map(|k| k.to_string()).collect();
        blanks.sort();

        for series in by_reactor.values_mut() {
            series.sort_by(|a, b| a.time_days.total_cmp(&b.time_days));
            let p0 = series[0].pressure;
            for r in series.iter() {
                let entry = sums.entry((r.time_days + 0.0).to_bits()).or_insert((r.time_days, 0.0, 0));
                entry.1 += r.pressure - p0;
                entry.2 += 1;
            }
        }

        let mut points: Vec<(f64, f64)> = sums
            .into_values()
            .map(|(t, sum, n)| (t, sum / n as f64))
            .collect();
        points.sort_by(|a, b| a.0.total_cmp(&b.0));

        Self { points, blanks }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn blanks(&self) -> &[String] {
        &self.blanks
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Drift offset at `t` (hPa); zero without blanks, clamped outside the range.
    pub fn offset_at(&self, t: f64) -> f64 {
        let Some(&(t_first, y_first)) = self.points.first() else {
            return 0.0;
        };
        if t <= t_first {
            return y_first;
        }
        let Some(&(t_last, y_last)) = self.points.last() else {
            return 0.0;
        };
        if t >= t_last {
            return y_last;
        }

        // First point strictly after t; t lies in [points[i-1], points[i]).
        let i = self.points.partition_point(|&(tp, _)| tp <= t);
        let (t0, y0) = self.points[i - 1];
        let (t1, y1) = self.points[i];
        if t1 == t0 {
            return y0;
        }
        y0 + (y1 - y0) * (t - t0) / (t1 - t0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Habitat, Treatment};

    fn reading(reactor: &str, treatment: Treatment, t: f64, p: f64) -> PressureReading {
        PressureReading {
            reactor: reactor.to_string(),
            habitat: Habitat::Sand,
            treatment,
            time_days: t,
            pressure: p,
        }
    }

    #[test]
    fn blanks_are_averaged_per_time() {
        let readings = vec![
            reading("B1", Treatment::Blank, 0.0, 1000.0),
            reading("B1", Treatment::Blank, 1.0, 1002.0),
            reading("B2", Treatment::Blank, 0.0, 990.0),
            reading("B2", Treatment::Blank, 1.0, 994.0),
            reading("R1", Treatment::Plastic, 1.0, 900.0),
        ];
        let drift = DriftCurve::from_readings(&readings);
        assert_eq!(drift.blanks(), &["B1".to_string(), "B2".to_string()]);
        assert_eq!(drift.points(), &[(0.0, 0.0), (1.0, 3.0)]);
    }

    #[test]
    fn offset_interpolates_and_clamps() {
        let readings = vec![
            reading("B1", Treatment::Blank, 0.0, 1000.0),
            reading("B1", Treatment::Blank, 2.0, 1004.0),
            reading("B1", Treatment::Blank, 4.0, 1002.0),
        ];
        let drift = DriftCurve::from_readings(&readings);
        assert!((drift.offset_at(1.0) - 2.0).abs() < 1e-12);
        assert!((drift.offset_at(3.0) - 3.0).abs() < 1e-12);
        assert!((drift.offset_at(2.0) - 4.0).abs() < 1e-12);
        assert_eq!(drift.offset_at(-1.0), 0.0);
        assert_eq!(drift.offset_at(10.0), 2.0);
    }

    #[test]
    fn no_blanks_means_no_drift() {
        let readings = vec![reading("R1", Treatment::Control, 0.0, 1000.0)];
        let drift = DriftCurve::from_readings(&readings);
        assert!(drift.is_empty());
        assert_eq!(drift.offset_at(5.0), 0.0);
    }
}
