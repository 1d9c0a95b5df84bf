#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `gfw_alerts`: runs the deforestation alert pipeline from the command
//! line.
//!
//! Input paths can be given as flags or through the `GFW_ALERTS_PATH`,
//! `GFW_VEREDAS_PATH`, `GFW_SECCIONES_PATH` and `GFW_OUTPUT_DIR`
//! environment variables. Logging goes through
//! [`gfw_alerts_cli_utils::init_logger`] so it interleaves cleanly with
//! the progress bars.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use gfw_alerts_cli_utils::IndicatifProgress;
use gfw_alerts_pipeline::config::PipelineConfig;
use gfw_alerts_pipeline::{PipelineInputs, profiles};

const ALERTS_ENV: &str = "GFW_ALERTS_PATH";
const VEREDAS_ENV: &str = "GFW_VEREDAS_PATH";
const SECCIONES_ENV: &str = "GFW_SECCIONES_PATH";
const OUTPUT_ENV: &str = "GFW_OUTPUT_DIR";

#[derive(Parser)]
#[command(name = "gfw_alerts", about = "Deforestation alert enrichment and clustering")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write every output
    Run(RunArgs),
    /// Print the confidence summary of an alert table as JSON
    Summarize {
        /// Alert table (falls back to `GFW_ALERTS_PATH`)
        #[arg(long)]
        alerts: Option<PathBuf>,
    },
    /// Write a study area's bounding box and print its exterior ring
    StudyArea {
        /// Study area `GeoJSON`
        path: PathBuf,
        /// Output directory (falls back to `GFW_OUTPUT_DIR`, then `output`)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// List the built-in configuration profiles
    Profiles,
}

#[derive(Args)]
struct RunArgs {
    /// Alert table (falls back to `GFW_ALERTS_PATH`)
    #[arg(long)]
    alerts: Option<PathBuf>,
    /// Vereda boundaries (falls back to `GFW_VEREDAS_PATH`)
    #[arg(long)]
    veredas: Option<PathBuf>,
    /// Rural-section panel (falls back to `GFW_SECCIONES_PATH`)
    #[arg(long)]
    secciones: Option<PathBuf>,
    /// Study area whose bounding box is also written
    #[arg(long)]
    study_area: Option<PathBuf>,
    /// Output directory (falls back to `GFW_OUTPUT_DIR`, then `output`)
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Built-in profile name
    #[arg(long, default_value = profiles::DEFAULT_PROFILE)]
    profile: String,
    /// TOML configuration file, used instead of `--profile`
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the linking buffer radius (meters)
    #[arg(long)]
    buffer_radius: Option<f64>,
    /// Override the bounding-box buffer (meters)
    #[arg(long)]
    bbox_buffer: Option<f64>,
    /// Reporting quarter label
    #[arg(long)]
    quarter: Option<String>,
    /// Reporting year
    #[arg(long)]
    year: Option<i32>,
    /// Directory holding `cluster_{id}_map.png` files
    #[arg(long)]
    maps_dir: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = gfw_alerts_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let config = resolve_config(&args)?;
            let inputs = PipelineInputs {
                alerts: required_path(args.alerts, ALERTS_ENV, "--alerts")?,
                veredas: required_path(args.veredas, VEREDAS_ENV, "--veredas")?,
                sections: required_path(args.secciones, SECCIONES_ENV, "--secciones")?,
                study_area: args.study_area,
                output_dir: output_dir(args.output_dir),
            };
            let progress = IndicatifProgress::stages(&multi);
            let output = gfw_alerts_pipeline::run(&inputs, &config, &progress)?;
            println!(
                "{} alerts, {} clusters, outputs in {}",
                output.clustered.len(),
                output.clusters.len(),
                inputs.output_dir.display()
            );
        }
        Commands::Summarize { alerts } => {
            let path = required_path(alerts, ALERTS_ENV, "--alerts")?;
            let layer = gfw_alerts_ingest::load_alerts(&path)?;
            let summary = gfw_alerts_pipeline::summary::summarize_confidence(&layer.alerts);
            log::info!("Summarized {} alerts from {}", layer.len(), path.display());
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::StudyArea { path, output_dir: dir } => {
            let area = gfw_alerts_ingest::load_study_area(&path)?;
            gfw_alerts_pipeline::write_study_area(&area, &output_dir(dir))?;
            println!("{}", serde_json::to_string_pretty(&area.exterior_ring())?);
        }
        Commands::Profiles => {
            for profile in profiles::all_profiles() {
                println!(
                    "{:<10} buffer {:>6} m  bbox {:>6} m  {}",
                    profile.name,
                    profile.cluster.buffer_radius_m,
                    profile.cluster.bbox_buffer_m,
                    profile.description
                );
            }
        }
    }

    Ok(())
}

/// The configuration file or named profile, with flag overrides applied.
fn resolve_config(args: &RunArgs) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => profiles::by_name(&args.profile).ok_or_else(|| {
            format!(
                "Unknown profile '{}'. Available: {}",
                args.profile,
                profiles::profile_names().join(", ")
            )
        })?,
    };

    if args.quarter.is_some() {
        config.report.quarter.clone_from(&args.quarter);
    }
    if args.year.is_some() {
        config.report.year = args.year;
    }
    if args.maps_dir.is_some() {
        config.report.maps_dir.clone_from(&args.maps_dir);
    }

    Ok(config.with_radii(args.buffer_radius, args.bbox_buffer)?)
}

/// The flag value, else the environment variable.
fn required_path(
    arg: Option<PathBuf>,
    env_var: &str,
    flag: &str,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    arg.or_else(|| std::env::var(env_var).ok().map(PathBuf::from))
        .ok_or_else(|| format!("Missing {flag} (or set {env_var})").into())
}

fn output_dir(arg: Option<PathBuf>) -> PathBuf {
    arg.or_else(|| std::env::var(OUTPUT_ENV).ok().map(PathBuf::from))
        .unwrap_or_else(|| Path::new("output").to_path_buf())
}
