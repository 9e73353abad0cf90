//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the real entry point that:
//! - loads `.env` and parses CLI arguments
//! - installs the tracing subscriber
//! - builds a `PipelineConfig` and dispatches to the pipeline
//! - prints reports and plots to stdout

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, PipelineArgs, PlotArgs, ReportArgs, RunArgs, StageArgs, SynthArgs};
use crate::domain::{ComparisonReport, ForestParams, PipelineConfig, SvrParams};
use crate::error::PipelineError;

pub mod pipeline;
pub mod stages;

/// Entry point for the `infl` binary.
pub fn run() -> Result<(), PipelineError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Stage(args) => handle_stage(args),
        Command::Report(args) => handle_report(args),
        Command::Synth(args) => handle_synth(args),
    }
}

/// Logs go to stderr so stdout carries only reports.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_run(args: RunArgs) -> Result<(), PipelineError> {
    let config = config_from_args(&args.pipeline);
    let run = pipeline::run_pipeline(&config)?;
    print_report(&run.report, &args.plot, None);
    Ok(())
}

fn handle_stage(args: StageArgs) -> Result<(), PipelineError> {
    let config = config_from_args(&args.pipeline);
    let published = pipeline::run_stage(&config, args.stage, args.family)?;
    for locator in published {
        println!("{}", locator.path.display());
    }
    Ok(())
}

fn handle_report(args: ReportArgs) -> Result<(), PipelineError> {
    let config = config_from_args(&args.pipeline);
    let report = pipeline::load_report(&config)?;
    print_report(&report, &args.plot, Some(args.rows));
    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<(), PipelineError> {
    let table = crate::data::generate_table(&crate::data::SyntheticParams::new(args.months, args.seed))?;
    crate::io::table::write_table(&args.out, &table)?;
    tracing::info!(path = %args.out.display(), months = args.months, seed = args.seed, "wrote synthetic table");
    Ok(())
}

fn print_report(report: &ComparisonReport, plot: &PlotArgs, rows: Option<usize>) {
    println!("{}", crate::report::format_comparison(report));
    if let Some(rows) = rows {
        println!("{}", crate::report::format_predictions(report, rows));
    }
    if plot.plot {
        println!("{}", crate::plot::render_forecast_plot(report, plot.width, plot.height));
    }
}

pub fn config_from_args(args: &PipelineArgs) -> PipelineConfig {
    PipelineConfig {
        data_dir: args.data_dir.clone(),
        table_file: args.table.clone(),
        output_dir: args.output_dir.clone(),
        target: args.target.clone(),
        lags: args.lags.clone(),
        train_fraction: args.train_fraction,
        seed: args.seed,
        forest: ForestParams {
            n_trees: args.n_trees,
            max_depth: args.max_depth,
            ..ForestParams::default()
        },
        svr: SvrParams {
            c: args.svr_c,
            epsilon: args.svr_epsilon,
            gamma: args.svr_gamma,
            ..SvrParams::default()
        },
    }
}
