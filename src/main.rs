use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use sat_pool_planner::catalog::{load_catalog, CatalogBatch};
use sat_pool_planner::config::Config;
use sat_pool_planner::observer::GroundObserver;
use sat_pool_planner::pipeline::{Pipeline, PipelineError};

#[derive(Parser)]
#[command(name = "sat-pool-planner")]
#[command(about = "LEO visibility, handover events and satellite pool selection")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file
    Validate { config: String },
    /// Per-satellite visibility timelines and coverage summary
    Visibility(RunArgs),
    /// Handover events between visible satellites
    Events(RunArgs),
    /// Select satellite pools per constellation
    Optimize(RunArgs),
    /// Visibility, events and pools in one report
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Configuration file (YAML)
    #[arg(short, long)]
    config: String,
    /// Catalog file or directory (YAML, JSON or TLE)
    #[arg(short = 'k', long)]
    catalog: PathBuf,
    /// Write the JSON report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Observer override as "lat, lon"
    #[arg(long)]
    observer: Option<String>,
    /// Observer altitude in meters, used with --observer
    #[arg(long)]
    altitude_m: Option<f64>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => validate(&config),
        Commands::Visibility(args) => execute(&args, |p, c| p.visibility(c)),
        Commands::Events(args) => execute(&args, |p, c| p.events(c)),
        Commands::Optimize(args) => execute(&args, |p, c| p.optimize(c)),
        Commands::Run(args) => execute(&args, |p, c| p.run(c)),
    }
}

fn validate(path: &str) -> ExitCode {
    match Config::from_file(path) {
        Ok(config) => {
            println!(
                "Configuration is valid ({} constellations)",
                config.constellations.len()
            );
            for (name, target) in &config.constellations {
                println!(
                    "  {}: pool {} visible {}..={} above {} deg",
                    name,
                    target.pool_size,
                    target.visible_range.min,
                    target.visible_range.max,
                    target.min_elevation_deg
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn execute<R, F>(args: &RunArgs, stage: F) -> ExitCode
where
    R: Serialize,
    F: FnOnce(&Pipeline, &CatalogBatch) -> Result<R, PipelineError>,
{
    let config = match Config::from_file(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut pipeline = match Pipeline::new(config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(coordinates) = &args.observer {
        match GroundObserver::from_coordinates(coordinates, args.altitude_m) {
            Some(observer) => pipeline = pipeline.with_observer(observer),
            None => {
                eprintln!("Invalid observer coordinates: {}", coordinates);
                return ExitCode::FAILURE;
            }
        }
    }

    let catalog = match load_catalog(&args.catalog) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Catalog error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let report = match stage(&pipeline, &catalog) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let json = match serde_json::to_string_pretty(&report) {
        Ok(j) => j,
        Err(e) => {
            eprintln!("Failed to serialize report: {}", e);
            return ExitCode::FAILURE;
        }
    };
    match &args.output {
        Some(path) => {
            if let Err(e) = fs::write(path, json) {
                eprintln!("Failed to write {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
            log::info!("Report written to {}", path.display());
        }
        None => println!("{}", json),
    }
    ExitCode::SUCCESS
}
