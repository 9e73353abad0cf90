//! Command-line parsing for the inflation forecast pipeline.
//!
//! Argument parsing and command dispatch stay separate from the modeling code;
//! `app::config_from_args` turns these structs into a `PipelineConfig`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{DEFAULT_SEED, DEFAULT_TARGET, DEFAULT_TRAIN_FRACTION, ModelFamily, StageName};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "infl", version, about = "Inflation forecast model training and evaluation")]
pub struct Cli {
    /// Log at debug level (overrides RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run every stage in order and print the model comparison.
    Run(RunArgs),
    /// Run a single stage against the artifacts already in the output directory.
    Stage(StageArgs),
    /// Print a previously published comparison report.
    Report(ReportArgs),
    /// Write a seeded synthetic monthly table (for local replay without FRED).
    Synth(SynthArgs),
}

/// Options shared by every command that runs pipeline stages.
#[derive(Debug, Args, Clone)]
pub struct PipelineArgs {
    /// Directory holding the transformed monthly table.
    #[arg(long, env = "INFL_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// File name of the transformed table inside the data directory.
    #[arg(long, default_value = "transformed_data.csv")]
    pub table: String,

    /// Directory receiving every stage artifact.
    #[arg(long, env = "INFL_OUTPUT_DIR", default_value = "data/model_output")]
    pub output_dir: PathBuf,

    /// Forecast target column.
    #[arg(long, default_value = DEFAULT_TARGET)]
    pub target: String,

    /// Lagged copies (months) added for every column, e.g. `--lags 1,12`.
    #[arg(long, value_delimiter = ',')]
    pub lags: Vec<usize>,

    /// Chronological share of rows used for training.
    #[arg(long, default_value_t = DEFAULT_TRAIN_FRACTION)]
    pub train_fraction: f64,

    /// Seed for the randomized fitters.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Number of trees in the random forest.
    #[arg(long, default_value_t = 100)]
    pub n_trees: usize,

    /// Maximum tree depth (unlimited when omitted).
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// SVR regularization strength C.
    #[arg(long = "svr-c", default_value_t = 1.0)]
    pub svr_c: f64,

    /// SVR epsilon-insensitive tube width.
    #[arg(long, default_value_t = 0.1)]
    pub svr_epsilon: f64,

    /// SVR RBF gamma (defaults to 1 / (n_features * var(X))).
    #[arg(long)]
    pub svr_gamma: Option<f64>,
}

/// Plot options.
#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    /// Render an ASCII plot of actual vs. best-model forecast.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    #[command(flatten)]
    pub plot: PlotArgs,
}

#[derive(Debug, Args, Clone)]
pub struct StageArgs {
    /// Stage to run.
    #[arg(value_enum)]
    pub stage: StageName,

    /// Restrict `train` / `evaluate` to one model family.
    #[arg(long, value_enum)]
    pub family: Option<ModelFamily>,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Debug, Args, Clone)]
pub struct ReportArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    #[command(flatten)]
    pub plot: PlotArgs,

    /// Number of most recent test months to list.
    #[arg(long, default_value_t = 12)]
    pub rows: usize,
}

#[derive(Debug, Args, Clone)]
pub struct SynthArgs {
    /// Output CSV path.
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,

    /// Number of months to generate.
    #[arg(long, default_value_t = 240)]
    pub months: usize,

    /// Random seed.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stage_with_family() {
        let cli = Cli::try_parse_from(["infl", "stage", "train", "--family", "kernel", "--output-dir", "/tmp/x"]).unwrap();
        let Command::Stage(args) = cli.command else {
            panic!("expected stage command");
        };
        assert_eq!(args.stage, StageName::Train);
        assert_eq!(args.family, Some(ModelFamily::Kernel));
        assert_eq!(args.pipeline.output_dir, PathBuf::from("/tmp/x"));
    }

    #[test]
    fn parses_comma_separated_lags() {
        let cli = Cli::try_parse_from(["infl", "-v", "run", "--lags", "1,12", "--plot"]).unwrap();
        assert!(cli.verbose);
        let Command::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.pipeline.lags, vec![1, 12]);
        assert!(args.plot.plot);
    }

    #[test]
    fn synth_requires_out() {
        assert!(Cli::try_parse_from(["infl", "synth"]).is_err());
    }

    #[test]
    fn clap_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
