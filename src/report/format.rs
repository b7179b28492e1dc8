//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (snapshot-friendly)

use crate::domain::{CurveModel, ObservationSet, ParamName, PercentileInterval, RunConfig, TrialCounts};
use crate::error::BootstrapError;
use crate::fit::{BootstrapRun, FAILURE_RATE_WARNING, IntervalTable};
use crate::io::ingest::{IngestedReadings, RowError};
use crate::prep::PrepOutput;
use crate::report::{Residual, TimeSummary};

/// Format the full run summary (dataset, apparent fit, intervals, trial accounting).
pub fn format_run_summary(
    config: &RunConfig,
    ingest: &IngestedReadings,
    prep: &PrepOutput,
    set: &ObservationSet,
    run: &BootstrapRun,
    intervals: &Result<IntervalTable, BootstrapError>,
) -> String {
    let mut out = String::new();

    out.push_str("=== bod - Logistic BOD Bootstrap ===\n");
    out.push_str(&format!(
        "Selection: habitat={} treatment={}\n",
        config.habitat.display_name(),
        config.treatment.display_name()
    ));
    out.push_str(&format!(
        "Input: {} | rows={} used={} skipped={}\n",
        config.csv_path.display(),
        ingest.rows_read,
        ingest.rows_used,
        ingest.row_errors.len()
    ));
    out.push_str(&format!(
        "Prep: blanks={} excluded=[{}] | factor={:.4} mg/L per hPa\n",
        prep.drift.blanks().len(),
        prep.excluded.join(", "),
        prep.bod_factor
    ));

    let times = set.times();
    let bods = set.bods();
    out.push_str(&format!(
        "Observations: n={} | distinct times={} | t=[{:.2}, {:.2}]d | BOD=[{:.2}, {:.2}]\n",
        set.len(),
        set.distinct_times(),
        min(&times),
        max(&times),
        min(&bods),
        max(&bods)
    ));
    out.push_str(&format!(
        "Bootstrap: resamples={} seed={} confidence={:.3}\n",
        config.bootstrap.resample_count, config.bootstrap.seed, config.bootstrap.confidence_level
    ));

    out.push('\n');
    out.push_str(&format_apparent(run.apparent().map(|r| &r.outcome)));
    out.push('\n');
    match intervals {
        Ok(table) => out.push_str(&format_intervals(table.iter(), run.apparent().and_then(|r| r.curve()))),
        Err(err) => out.push_str(&format!("Intervals: not computed ({err})\n")),
    }
    out.push('\n');
    out.push_str(&format_trial_counts(&run.counts()));

    out
}

fn format_apparent(outcome: Option<&Result<CurveModel, crate::error::FitFailure>>) -> String {
    match outcome {
        None => "Apparent fit: not requested\n".to_string(),
        Some(Err(reason)) => format!("Apparent fit: FAILED ({reason})\n"),
        Some(Ok(c)) => format!(
            "Apparent fit: half_time={:.4} d | k={:.5} 1/d | limit={:.4} mg/L | RSS={:.4} | iterations={}\n",
            c.params.half_time, c.params.k, c.params.limit, c.rss, c.iterations
        ),
    }
}

/// Format the per-parameter interval table, with the apparent estimate when available.
pub fn format_intervals<'a, I>(intervals: I, apparent: Option<&CurveModel>) -> String
where
    I: IntoIterator<Item = (&'a ParamName, &'a PercentileInterval)>,
{
    let mut out = String::new();
    out.push_str(&format!(
        "{:<10} {:>12} {:>12} {:>12} {:>8} {:>7}\n",
        "parameter", "estimate", "lower", "upper", "level", "n"
    ));
    out.push_str(&format!(
        "{:-<10} {:-<12} {:-<12} {:-<12} {:-<8} {:-<7}\n",
        "", "", "", "", "", ""
    ));
    for (name, iv) in intervals {
        let estimate = apparent
            .map(|c| format!("{:>12.4}", c.params.get(*name)))
            .unwrap_or_else(|| format!("{:>12}", "-"));
        out.push_str(&format!(
            "{:<10} {} {:>12.4} {:>12.4} {:>7.1}% {:>7}\n",
            name.label(),
            estimate,
            iv.lower,
            iv.upper,
            iv.confidence_level * 100.0,
            iv.n_samples
        ));
    }
    out
}

/// Format requested/successful/failed trial counts, flagging high failure rates.
pub fn format_trial_counts(counts: &TrialCounts) -> String {
    let mut out = format!(
        "Trials: requested={} successful={} failed={}\n",
        counts.requested, counts.successful, counts.failed
    );
    if !counts.failed_indices.is_empty() {
        out.push_str(&format!("Failed trials: {}\n", fmt_indices(&counts.failed_indices, 20)));
    }
    let rate = if counts.requested == 0 {
        0.0
    } else {
        counts.failed as f64 / counts.requested as f64
    };
    if rate > FAILURE_RATE_WARNING {
        out.push_str(&format!(
            "WARNING: {:.1}% of trials failed; intervals may be biased.\n",
            rate * 100.0
        ));
    }
    out
}

/// One-line residual diagnostics for the apparent fit.
pub fn format_residual_summary(residuals: &[Residual]) -> String {
    if residuals.is_empty() {
        return String::new();
    }
    let n = residuals.len() as f64;
    let rmse = (residuals.iter().map(|r| r.residual * r.residual).sum::<f64>() / n).sqrt();
    let worst = residuals
        .iter()
        .max_by(|a, b| a.residual.abs().total_cmp(&b.residual.abs()));
    match worst {
        Some(w) => format!(
            "Residuals: RMSE={rmse:.4} | max |r|={:.4} ({} @ t={:.2}d)\n",
            w.residual.abs(),
            w.reactor,
            w.time_days
        ),
        None => String::new(),
    }
}

/// Format the per-time descriptive table.
pub fn format_description(rows: &[TimeSummary]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<10} {:<10} {:>8} {:>4} {:>12} {:>12}\n",
        "habitat", "treatment", "time_d", "n", "mean_bod", "sd_bod"
    ));
    out.push_str(&format!(
        "{:-<10} {:-<10} {:-<8} {:-<4} {:-<12} {:-<12}\n",
        "", "", "", "", "", ""
    ));
    for r in rows {
        let sd = if r.sd_bod.is_finite() {
            format!("{:>12.3}", r.sd_bod)
        } else {
            format!("{:>12}", "-")
        };
        out.push_str(&format!(
            "{:<10} {:<10} {:>8.2} {:>4} {:>12.3} {}\n",
            r.habitat.display_name(),
            r.treatment.display_name(),
            r.time_days,
            r.n,
            r.mean_bod,
            sd
        ));
    }
    out
}

/// Format skipped CSV rows (first `max` only).
pub fn format_row_errors(errors: &[RowError], max: usize) -> String {
    let mut out = String::new();
    if errors.is_empty() {
        return out;
    }
    out.push_str(&format!("Skipped rows: {}\n", errors.len()));
    for e in errors.iter().take(max) {
        out.push_str(&format!(
            "  line {} [{}]: {}\n",
            e.line,
            e.reactor.as_deref().unwrap_or("?"),
            e.message
        ));
    }
    if errors.len() > max {
        out.push_str(&format!("  ... {} more\n", errors.len() - max));
    }
    out
}

fn fmt_indices(v: &[usize], max: usize) -> String {
    let mut parts: Vec<String> = v.iter().take(max).map(|i| i.to_string()).collect();
    if v.len() > max {
        parts.push(format!("... (+{})", v.len() - max));
    }
    format!("[{}]", parts.join(", "))
}

fn min(v: &[f64]) -> f64 {
    v.iter().copied().fold(f64::INFINITY, f64::min)
}

fn max(v: &[f64]) -> f64 {
    v.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}
