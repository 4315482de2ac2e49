//! `asbuilt check|update|validate|region` command handlers.

use std::path::{Path, PathBuf};

use clap::Args;

use asbuilt_recon::config::ReconConfig;
use asbuilt_recon::evidence::build_report;
use asbuilt_recon::model::{Action, ReconInput, ReconResult};
use asbuilt_recon::region::RegionOfInterest;
use asbuilt_recon::store::MemoryStore;

use crate::exit_codes::{EXIT_ERROR, EXIT_RECON_DRIFT, EXIT_RECON_INVALID_CONFIG, EXIT_RECON_IO};
use crate::CliError;

/// Inputs shared by `check` and `update`.
#[derive(Args)]
pub struct RunArgs {
    /// Path to the .toml run config
    pub config: PathBuf,

    /// Directory of segmented clouds (wall*, column*, ceiling*)
    #[arg(long)]
    pub scans: PathBuf,

    /// Model document (JSON)
    #[arg(long)]
    pub model: PathBuf,

    /// Full-area cloud for region_of_interest mode
    #[arg(long)]
    pub region: Option<PathBuf>,

    /// Output JSON to stdout instead of human summary
    #[arg(long)]
    pub json: bool,

    /// Write JSON output to file
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Write the CSV match report (default: [output] report)
    #[arg(long)]
    pub report: Option<PathBuf>,
}

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

fn load_config(path: &Path) -> Result<ReconConfig, CliError> {
    let config_str = std::fs::read_to_string(path)
        .map_err(|e| recon_err(EXIT_RECON_INVALID_CONFIG, format!("cannot read config: {e}")))?;
    Ok(ReconConfig::from_toml(&config_str)?)
}

/// Config-relative path: file paths inside the config resolve against the
/// config file's directory.
fn config_relative(config_path: &Path, value: &str) -> PathBuf {
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    base_dir.join(value)
}

struct Loaded {
    config: ReconConfig,
    input: ReconInput,
    store: MemoryStore,
}

fn load(args: &RunArgs) -> Result<Loaded, CliError> {
    let config = load_config(&args.config)?;
    let clouds = asbuilt_io::discover_scans(&args.scans)?;
    if clouds.is_empty() {
        log::warn!("{}: no segmented clouds found", args.scans.display());
    }
    let region = match &args.region {
        Some(path) => Some(asbuilt_io::read_points(path)?),
        None => None,
    };
    let store = asbuilt_io::load_model(&args.model)?;
    Ok(Loaded {
        config,
        input: ReconInput { clouds, region },
        store,
    })
}

fn emit(args: &RunArgs, config: &ReconConfig, result: &ReconResult) -> Result<(), CliError> {
    let json_str = serde_json::to_string_pretty(result)
        .map_err(|e| recon_err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &json_str)
            .map_err(|e| recon_err(EXIT_RECON_IO, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    let report = args.report.clone().or_else(|| {
        config
            .output
            .report
            .as_deref()
            .map(|r| config_relative(&args.config, r))
    });
    if let Some(path) = report {
        asbuilt_io::write_report_file(&build_report(result), &path)?;
        eprintln!("wrote {}", path.display());
    }

    if args.json {
        println!("{json_str}");
    }

    print_summary(result);
    Ok(())
}

/// Human summary to stderr.
fn print_summary(result: &ReconResult) {
    let s = &result.summary;
    let verb = if result.meta.applied { "update" } else { "check" };
    eprintln!(
        "{verb} ({}): {} model elements, {} scans: {} unchanged, {} repositioned, {} deleted, {} to create ({} created)",
        result.meta.mode,
        s.model_elements,
        s.scan_primitives,
        s.keep_unchanged,
        s.keep_reposition,
        s.delete,
        s.create,
        s.created,
    );
    if s.diagonal + s.embedded + s.outside_region + s.not_synthesized > 0 {
        eprintln!(
            "flagged: {} diagonal, {} embedded, {} outside region, {} not synthesized",
            s.diagonal, s.embedded, s.outside_region, s.not_synthesized,
        );
    }
    if result.meta.applied && !result.synthesis.created.is_empty() {
        eprintln!(
            "alignment: {} sweeps, {}, {} connections",
            result.synthesis.sweeps,
            if result.synthesis.converged { "converged" } else { "not converged" },
            s.connections,
        );
    }
    for advisory in &result.advisories {
        eprintln!("advisory: {advisory}");
    }
}

/// True when any model element would move, go, or be joined by a new one.
fn has_drift(result: &ReconResult) -> bool {
    result.decisions.iter().any(|d| match d.action {
        Action::KeepUnchanged => false,
        Action::KeepReposition | Action::Delete => true,
        Action::Create => d.status == asbuilt_recon::model::Status::Pending,
    })
}

pub fn cmd_check(args: RunArgs, fail_on_drift: bool) -> Result<(), CliError> {
    let Loaded { config, input, mut store } = load(&args)?;
    let result = asbuilt_recon::run(&config, &input, &mut store, false)?;
    emit(&args, &config, &result)?;

    if fail_on_drift && has_drift(&result) {
        return Err(recon_err(EXIT_RECON_DRIFT, "model differs from scans"));
    }
    Ok(())
}

pub fn cmd_update(args: RunArgs, model_dir: Option<PathBuf>) -> Result<(), CliError> {
    let Loaded { config, input, mut store } = load(&args)?;
    let result = asbuilt_recon::run(&config, &input, &mut store, true)?;

    let dir = model_dir
        .or_else(|| {
            config
                .output
                .model_dir
                .as_deref()
                .map(|d| config_relative(&args.config, d))
        })
        .unwrap_or_else(|| {
            args.model
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        });
    let saved = asbuilt_io::save_updated_model(&store, &dir)?;
    eprintln!("wrote {}", saved.display());

    emit(&args, &config, &result)
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    eprintln!("{}: valid ({}, {} assignment)", config.name, config.mode, config.assignment);
    Ok(())
}

pub fn cmd_region(points: PathBuf, config_path: Option<PathBuf>) -> Result<(), CliError> {
    let region_config = match &config_path {
        Some(path) => load_config(path)?.region,
        None => Default::default(),
    };
    let cloud = asbuilt_io::read_points(&points)?;
    let region = RegionOfInterest::build(&cloud, &region_config)
        .map_err(CliError::from)
        .map_err(|e| e.with_hint("the region cloud has no readable points"))?;

    let json_str = serde_json::to_string_pretty(&region)
        .map_err(|e| recon_err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
    println!("{json_str}");
    eprintln!(
        "region: {} hull vertices, z {:.3}..{:.3}",
        region.hull.vertices.len(),
        region.z_min,
        region.z_max,
    );
    Ok(())
}
