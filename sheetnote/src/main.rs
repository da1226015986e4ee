//! sheetnote command-line entry point
//!
//! Resolves configuration (arguments and environment, then the TOML file),
//! initializes logging and runs the pipeline once.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sheetnote::pipeline::{self, RunOptions};
use sheetnote_common::config::{Config, ConfigOverrides, TomlConfig};
use sheetnote_common::logging::init_logging;
use tracing::{error, info, warn};

/// Command-line arguments for sheetnote
#[derive(Parser, Debug)]
#[command(name = "sheetnote")]
#[command(about = "Render music notation drawn in a spreadsheet to audio")]
#[command(version)]
struct Args {
    /// Workbook (.xlsx) holding the score
    #[arg(short = 'i', long, env = "SHEETNOTE_SPREADSHEET")]
    spreadsheet: Option<PathBuf>,

    /// Sheet to read (default: first sheet)
    #[arg(short, long, env = "SHEETNOTE_SHEET")]
    sheet: Option<String>,

    /// Directory of reference images, with optional catalog.toml
    #[arg(short, long, env = "SHEETNOTE_REFERENCE_DIR")]
    reference_dir: Option<PathBuf>,

    /// Directory of note clips
    #[arg(short, long, env = "SHEETNOTE_CLIP_DIR")]
    clip_dir: Option<PathBuf>,

    /// Output WAV file
    #[arg(short, long, env = "SHEETNOTE_OUTPUT")]
    output: Option<PathBuf>,

    /// Largest Hamming distance accepted as a match (0-64)
    #[arg(long, env = "SHEETNOTE_HASH_THRESHOLD")]
    hash_threshold: Option<u32>,

    /// Milliseconds cut from the end of every clip
    #[arg(long, env = "SHEETNOTE_CLIP_TRIM_MS")]
    clip_trim_ms: Option<u64>,

    /// Log level or filter directive
    #[arg(long, env = "SHEETNOTE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Also append logs to this file
    #[arg(long, env = "SHEETNOTE_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Config file (default: SHEETNOTE_CONFIG, then the per-user config file)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Check the score without rendering audio
    #[arg(long)]
    validate_only: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            spreadsheet_path: self.spreadsheet.clone(),
            sheet_name: self.sheet.clone(),
            reference_dir: self.reference_dir.clone(),
            clip_dir: self.clip_dir.clone(),
            output_path: self.output.clone(),
            hash_threshold: self.hash_threshold,
            clip_trim_ms: self.clip_trim_ms,
            log_level: self.log_level.clone(),
            log_file: self.log_file.clone(),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let file = TomlConfig::discover(args.config.as_deref()).context("Failed to load config file")?;
    let config = Config::resolve(args.overrides(), file).context("Invalid configuration")?;
    init_logging(&config.logging).context("Failed to initialize logging")?;

    info!("Starting sheetnote v{}", env!("CARGO_PKG_VERSION"));
    info!("Spreadsheet: {}", config.spreadsheet_path.display());
    info!("Reference images: {}", config.reference_dir.display());

    let options = RunOptions {
        validate_only: args.validate_only,
    };
    let report = match pipeline::run(&config, options) {
        Ok(report) => report,
        Err(e) => {
            match e.position() {
                Some(position) => error!(kind = %e.kind(), cell = %position, "{}", e),
                None => error!(kind = %e.kind(), "{}", e),
            }
            return Err(e).context("Processing aborted");
        }
    };

    let warnings = report.meter_warnings();
    if warnings > 0 {
        warn!("{} measure(s) do not match their time signature", warnings);
    }

    match &report.output {
        Some((path, duration)) => info!(
            "Rendered {} phrase(s) from sheet '{}' to {} ({:.2} s)",
            report.phrases.len(),
            report.sheet,
            path.display(),
            duration.as_secs_f64()
        ),
        None => info!(
            "Sheet '{}' is valid: {} phrase(s), {} token(s)",
            report.sheet,
            report.phrases.len(),
            report.tokens
        ),
    }

    Ok(())
}
