//! Empirical quantiles.

/// Type-7 quantile of ascending `sorted` data: linear interpolation between
/// the order statistics around rank `q * (n - 1)`.
///
/// `q` is clamped to `[0, 1]`. Empty input gives `NaN`.
pub fn quantile_linear_sorted(sorted: &[f64], q: f64) -> f64 {
    let Some(last) = sorted.len().checked_sub(1) else {
        return f64::NAN;
    };
    let rank = q.clamp(0.0, 1.0) * last as f64;
    let below = rank.floor() as usize;
    if below >= last {
        return sorted[last];
    }
    let frac = rank - below as f64;
    sorted[below] + frac * (sorted[below + 1] - sorted[below])
}

/// Sort a copy ascending under `f64::total_cmp` for repeated quantile lookups.
pub fn sorted_copy(data: &[f64]) -> Vec<f64> {
    let mut v = data.to_vec();
    v.sort_by(f64::total_cmp);
    v
}

/// Sample mean and standard deviation (n-1). `sd` is `NaN` for a single value.
pub fn mean_sd(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return Some((mean, f64::NAN));
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some((mean, var.sqrt()))
}
