// asbuilt CLI - reconcile a structural model against segmented laser scans

mod exit_codes;
mod recon;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{exit_code_for, EXIT_SUCCESS};

#[derive(Parser)]
#[command(name = "asbuilt")]
#[command(about = "Scan-vs-model structural reconciliation (headless)")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug). RUST_LOG applies otherwise.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute every decision without touching the model
    #[command(after_help = "\
Examples:
  asbuilt check site.toml --scans scans/ --model model.json
  asbuilt check site.toml --scans scans/ --model model.json --json
  asbuilt check site.toml --scans scans/ --model model.json --report report.csv --fail-on-drift
  asbuilt check roi.toml --scans scans/ --model model.json --region region.txt")]
    Check {
        #[command(flatten)]
        run: recon::RunArgs,

        /// Exit with the drift code when any element would change
        #[arg(long)]
        fail_on_drift: bool,
    },

    /// Apply decisions, synthesize new elements and save the updated model
    #[command(after_help = "\
Examples:
  asbuilt update site.toml --scans scans/ --model model.json
  asbuilt update site.toml --scans scans/ --model model.json --model-dir out/
  asbuilt update roi.toml --scans scans/ --model model.json --region region.txt --json")]
    Update {
        #[command(flatten)]
        run: recon::RunArgs,

        /// Directory for the updated model (default: [output] model_dir, else the model's directory)
        #[arg(long)]
        model_dir: Option<std::path::PathBuf>,
    },

    /// Validate a run config without running
    #[command(after_help = "\
Examples:
  asbuilt validate site.toml")]
    Validate {
        /// Path to the .toml run config
        config: std::path::PathBuf,
    },

    /// Build the region of interest from a full-area scan and print it as JSON
    #[command(after_help = "\
Examples:
  asbuilt region region.txt
  asbuilt region region.txt --config roi.toml")]
    Region {
        /// ASCII point cloud covering the scanned area
        points: std::path::PathBuf,

        /// Take [region] parameters from this config
        #[arg(long)]
        config: Option<std::path::PathBuf>,
    },
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<asbuilt_recon::ReconError> for CliError {
    fn from(err: asbuilt_recon::ReconError) -> Self {
        let hint = match &err {
            asbuilt_recon::ReconError::MissingRegion => {
                Some("pass --region with a full-area scan, or set mode = \"whole_building\"".to_string())
            }
            asbuilt_recon::ReconError::EmptyPointSet { .. } => {
                Some("check the cloud file: lines need at least three numeric fields".to_string())
            }
            _ => None,
        };
        Self { code: exit_code_for(&err), message: err.to_string(), hint }
    }
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  asbuilt-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_logging(verbose: u8) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(log::LevelFilter::Info);
        }
        _ => {
            builder.filter_level(log::LevelFilter::Debug);
        }
    }
    builder.format_timestamp(None).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Check { run, fail_on_drift } => recon::cmd_check(run, fail_on_drift),
        Commands::Update { run, model_dir } => recon::cmd_update(run, model_dir),
        Commands::Validate { config } => recon::cmd_validate(config),
        Commands::Region { points, config } => recon::cmd_region(points, config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}
