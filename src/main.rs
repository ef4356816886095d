//! Entry point for the bgc-zones application.
//! Handles CLI parsing, configuration, and dispatches the analyses.

use bgc_zones::config::AnalysisConfig;
use bgc_zones::errors::{BgcError, Result};
use bgc_zones::parallel::ParallelConfig;
use bgc_zones::pipeline::{self, Analysis, ProfileFiles};
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;

use cli::{Args, Command};

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn load_config(args: &Args) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Reading configuration from {}", path.display());
            AnalysisConfig::from_json_file(path)?
        }
        None => AnalysisConfig::default(),
    };
    if let Some(year) = args.year {
        config.year = Some(year);
    }
    if !args.zones.is_empty() {
        config.zones = args.zones.clone();
    }
    config.validate()?;
    Ok(config)
}

fn finish(outcome: &dyn Analysis, args: &Args) -> Result<()> {
    println!("{}", outcome.report());

    let chart = (!args.no_plot).then(|| {
        args.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(outcome.default_chart_name()))
    });
    pipeline::save_outputs(outcome, chart.as_deref(), args.export_netcdf.as_deref())?;

    if let Some(path) = &args.export_netcdf {
        println!("✅ Saved reduced series to {}", path.display());
    }
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let config = load_config(args)?;
    let threads = ParallelConfig::new(args.threads).setup_global_pool()?;
    info!("Reductions run on {} thread(s)", threads);

    match &args.command {
        Command::Chlorophyll { input } => {
            finish(&pipeline::run_chlorophyll(input, &config)?, args)
        }
        Command::Forecast { input } => finish(&pipeline::run_forecast(input, &config)?, args),
        Command::Profile {
            data_dir,
            bio,
            nut,
            prod,
        } => {
            let files = ProfileFiles::in_dir(data_dir, bio, nut, prod);
            finish(&pipeline::run_profile(&files, &config)?, args)
        }
        Command::Inspect { file, variable } => {
            pipeline::inspect(file, variable.as_deref(), &config.zones)?;
            Ok(())
        }
    }
}

fn report_error(e: &BgcError) {
    error!("{}", e);
    if let Some(hint) = e.hint() {
        eprintln!("Tip: {}", hint);
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}
