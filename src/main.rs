//! gb-storage: build the GB gas storage chart.
//!
//! Usage:
//! - `gb-storage --image storage.svg` fetches the last two years and renders them
//! - `gb-storage --from-dir saved/ --json figure.json` replays saved downloads
//! - `gb-storage --verify` checks the live downloads against the facility registry

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Local;
use clap::Parser;

use gb_storage_service::chart::render::render_to_file;
use gb_storage_service::config::Config;
use gb_storage_service::logging::{self, LogLevel, Stage};
use gb_storage_service::model::{Result, StorageError};
use gb_storage_service::pipeline;
use gb_storage_service::verify::{print_report, run_full_verification, VerificationStatus};

#[derive(Parser)]
#[command(
    name = "gb-storage",
    about = "Charts GB gas storage opening stock against available capacity"
)]
struct Cli {
    /// Path to a TOML config file. Falls back to GB_STORAGE_CONFIG.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the figure as JSON to this path.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Render the chart to this path (.svg or .png).
    #[arg(long)]
    image: Option<PathBuf>,

    /// Replay saved downloads from this directory instead of calling the API.
    #[arg(long)]
    from_dir: Option<PathBuf>,

    /// Save each live download to this directory.
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Check the live downloads against the facility registry and exit.
    #[arg(long, default_value_t = false)]
    verify: bool,

    /// Override the configured log level (debug, info, warn, error).
    #[arg(long)]
    log_level: Option<LogLevel>,
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;

    if cli.json.is_some() {
        config.output.figure_json = cli.json.clone();
    }
    if cli.image.is_some() {
        config.output.image = cli.image.clone();
    }
    if cli.from_dir.is_some() {
        config.output.replay_dir = cli.from_dir.clone();
    }
    if cli.save_dir.is_some() {
        config.output.archive_dir = cli.save_dir.clone();
    }

    Ok(config)
}

fn run_chart(config: &Config) -> Result<()> {
    let output = pipeline::run(config, Local::now().date_naive())?;

    if !output.summary.unmatched_labels.is_empty() {
        logging::warn(
            Stage::Split,
            None,
            &format!("not charted: {}", output.summary.unmatched_labels.join("; ")),
        );
    }

    let json = output.figure.to_json()?;
    match &config.output.figure_json {
        Some(path) => {
            fs::write(path, json)
                .map_err(|e| StorageError::Io(format!("{}: {}", path.display(), e)))?;
            logging::info(Stage::Chart, None, &format!("figure written to {}", path.display()));
        }
        None if config.output.image.is_none() => println!("{}", json),
        None => {}
    }

    if let Some(path) = &config.output.image {
        render_to_file(&output.figure, path, config.chart.width, config.chart.height)?;
    }

    Ok(())
}

fn run_verify(config: &Config) -> Result<bool> {
    let report = run_full_verification(config, Local::now().date_naive())?;
    print_report(&report);

    Ok(report
        .results
        .iter()
        .all(|r| r.status != VerificationStatus::Failed))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            logging::init_logger(cli.log_level.unwrap_or(LogLevel::Info), None, false);
            logging::log_stage_failure(Stage::Config, "loading configuration", &e);
            return ExitCode::FAILURE;
        }
    };

    let level = match cli.log_level {
        Some(level) => level,
        None => config.logging.log_level().unwrap_or(LogLevel::Info),
    };
    logging::init_logger(level, config.logging.file.as_deref(), config.logging.timestamps);

    if cli.verify {
        return match run_verify(&config) {
            Ok(true) => ExitCode::SUCCESS,
            Ok(false) => ExitCode::FAILURE,
            Err(e) => {
                logging::log_stage_failure(Stage::System, "verification", &e);
                ExitCode::FAILURE
            }
        };
    }

    match run_chart(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logging::log_stage_failure(Stage::System, "chart run", &e);
            ExitCode::FAILURE
        }
    }
}
