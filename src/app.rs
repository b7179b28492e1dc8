//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and installs logging
//! - ingests and preprocesses logger readings
//! - runs the bootstrap fit and percentile intervals
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;
use tracing::info;

use crate::cli::{Command, DescribeArgs, FitArgs, PlotArgs, PrepArgs, SimulateArgs};
use crate::data::{SimulationSpec, daily_times, simulate_readings};
use crate::domain::{BootstrapConfig, Parameters, PhysicalConstants, PrepConfig, RunConfig, SolverOptions};
use crate::error::AppError;
use crate::fit::parameter_estimates;
use crate::io::curve::{read_report_json, write_report_json};
use crate::io::export::{write_observations_csv, write_readings_csv, write_trials_csv};
use crate::io::ingest::load_readings;
use crate::models::Logistic;
use crate::plot::{render_ascii_plot, render_ascii_plot_from_report, render_histogram};
use crate::prep::preprocess;
use crate::report::{
    compute_residuals, describe_by_time, format_description, format_intervals, format_residual_summary,
    format_row_errors, format_run_summary, format_trial_counts,
};

pub mod pipeline;

/// Skipped CSV rows listed in terminal output.
const MAX_ROW_ERRORS_SHOWN: usize = 10;

/// Entry point for the `bod` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Describe(args) => handle_describe(args),
        Command::Simulate(args) => handle_simulate(args),
        Command::Plot(args) => handle_plot(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args);
    let output = pipeline::run_fit(&config)?;

    print!("{}", format_row_errors(&output.ingest.row_errors, MAX_ROW_ERRORS_SHOWN));
    println!(
        "{}",
        format_run_summary(
            &config,
            &output.ingest,
            &output.prep,
            &output.set,
            &output.run,
            &output.intervals
        )
    );

    let apparent = output.run.apparent().and_then(|r| r.curve());
    if let Some(curve) = apparent {
        let residuals = compute_residuals(&output.set, &Logistic, curve)?;
        println!("{}", format_residual_summary(&residuals));
    }

    if config.plot {
        let plot = render_ascii_plot(
            output.set.observations(),
            apparent,
            config.plot_width,
            config.plot_height,
        );
        println!("{plot}");
    }

    if let Ok(intervals) = &output.intervals {
        if config.histogram_bins > 0 {
            for (name, interval) in intervals {
                let values = parameter_estimates(&output.run.results, *name);
                println!("{} ({})", name.label(), name.unit());
                println!(
                    "{}",
                    render_histogram(&values, Some(interval), config.histogram_bins, config.plot_width / 2)
                );
            }
        }
    }

    // Optional exports.
    if let Some(path) = &config.export_trials {
        write_trials_csv(path, &output.run.results)?;
        info!(path = %path.display(), "trials exported");
    }
    if let Some(path) = &config.export_observations {
        write_observations_csv(path, &output.prep.observations)?;
        info!(path = %path.display(), "observations exported");
    }
    if let Some(path) = &config.export_report {
        write_report_json(path, &pipeline::build_report(&config, &output))?;
        info!(path = %path.display(), "report exported");
    }

    // Interval failure surfaces only after the trial accounting and exports.
    output.intervals?;
    Ok(())
}

fn handle_describe(args: DescribeArgs) -> Result<(), AppError> {
    let ingest = load_readings(&args.input)?;
    let prep = preprocess(&ingest.readings, &prep_config_from_args(&args.prep))?;

    let observations: Vec<_> = prep
        .observations
        .into_iter()
        .filter(|o| args.habitat.is_none_or(|h| o.habitat == h))
        .filter(|o| args.treatment.is_none_or(|t| o.treatment == t))
        .collect();
    if observations.is_empty() {
        return Err(AppError::new(3, "No observations match the requested habitat/treatment."));
    }

    print!("{}", format_row_errors(&ingest.row_errors, MAX_ROW_ERRORS_SHOWN));
    print!("{}", format_description(&describe_by_time(&observations)));
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let spec = SimulationSpec {
        truth: Parameters::new(args.half_time, args.k, args.limit),
        habitat: args.habitat,
        treatment: args.treatment,
        times: daily_times(args.days),
        replicates: args.replicates,
        blanks: args.blanks,
        initial_pressure: args.initial_pressure,
        drift_amplitude: args.drift_amplitude,
        drift_period_days: args.drift_period,
        noise_sd: args.noise,
        seed: args.seed,
    };
    let readings = simulate_readings(&spec, &PhysicalConstants::default())?;
    write_readings_csv(&args.output, &readings)?;
    info!(path = %args.output.display(), rows = readings.len(), "simulated readings written");
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let report = read_report_json(&args.report)?;

    println!(
        "=== {} | habitat={} treatment={} | n={} ===",
        report.tool,
        report.habitat.display_name(),
        report.treatment.display_name(),
        report.n_observations
    );
    let intervals = report.intervals.iter().map(|(name, iv)| (name, iv));
    println!("{}", format_intervals(intervals, report.apparent.as_ref()));
    println!("{}", format_trial_counts(&report.trials));

    if report.grid.time_days.is_empty() {
        println!("(no fitted curve in report)");
    } else {
        println!("{}", render_ascii_plot_from_report(&report, args.width, args.height));
    }
    Ok(())
}

pub fn run_config_from_args(args: &FitArgs) -> RunConfig {
    RunConfig {
        csv_path: args.input.clone(),
        habitat: args.habitat,
        treatment: args.treatment,
        prep: prep_config_from_args(&args.prep),
        bootstrap: bootstrap_config_from_args(args),
        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        histogram_bins: args.histogram_bins,
        export_trials: args.export_trials.clone(),
        export_observations: args.export_observations.clone(),
        export_report: args.export_report.clone(),
    }
}

pub fn bootstrap_config_from_args(args: &FitArgs) -> BootstrapConfig {
    BootstrapConfig {
        initial_guess: Parameters::new(args.guess_half_time, args.guess_k, args.guess_limit),
        resample_count: args.resamples,
        include_apparent: !args.no_apparent,
        confidence_level: args.confidence,
        seed: args.seed,
        min_successful: args.min_successful,
        parallel: !args.sequential,
        solver: SolverOptions {
            max_iterations: args.max_iterations,
            tolerance: args.tolerance,
            min_step_factor: args.min_step_factor,
            ..SolverOptions::default()
        },
    }
}

pub fn prep_config_from_args(args: &PrepArgs) -> PrepConfig {
    PrepConfig {
        constants: PhysicalConstants {
            oxygen_molar_mass: args.oxygen_molar_mass,
            gas_constant: args.gas_constant,
            bunsen_coefficient: args.bunsen_coefficient,
            measurement_temp_k: args.measurement_temp,
            reference_temp_k: args.reference_temp,
            total_volume_ml: args.total_volume,
            sample_volume_ml: args.sample_volume,
        },
        excluded_reactors: args.exclude_reactor.clone(),
    }
}
