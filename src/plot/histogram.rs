//! Text histogram of a bootstrap distribution.

use crate::domain::PercentileInterval;

/// Render `values` into `bins` equal-width bins with bars scaled to `width`.
///
/// Bins containing the interval bounds are marked `<lower` / `<upper`.
/// Non-finite values are ignored.
pub fn render_histogram(
    values: &[f64],
    interval: Option<&PercentileInterval>,
    bins: usize,
    width: usize,
) -> String {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return "Histogram: no values\n".to_string();
    }
    let bins = bins.max(1);
    let width = width.max(1);

    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    let bins = if span > 0.0 { bins } else { 1 };

    let bin_of = |v: f64| -> usize {
        if span > 0.0 {
            (((v - min) * bins as f64 / span).floor() as usize).min(bins - 1)
        } else {
            0
        }
    };

    let mut counts = vec![0usize; bins];
    for &v in &finite {
        counts[bin_of(v)] += 1;
    }
    let max_count = counts.iter().copied().max().unwrap_or(1).max(1);

    let lower_bin = interval.map(|iv| bin_of(iv.lower.clamp(min, max)));
    let upper_bin = interval.map(|iv| bin_of(iv.upper.clamp(min, max)));

    let mut out = format!("Histogram: n={} range=[{min:.3}, {max:.3}]\n", finite.len());
    for (i, &count) in counts.iter().enumerate() {
        let edge = min + span * i as f64 / bins as f64;
        let len = (count as f64 * width as f64 / max_count as f64).round() as usize;
        let bar = "#".repeat(len);
        let mut mark = String::new();
        if lower_bin == Some(i) {
            mark.push_str(" <lower");
        }
        if upper_bin == Some(i) {
            mark.push_str(" <upper");
        }
        out.push_str(&format!("{edge:>9.3} |{bar:<width$}| {count}{mark}\n"));
    }
    out
}
