//! Configuration loading and resolution
//!
//! Settings are resolved at the program boundary, in priority order:
//! 1. Command-line argument or environment variable (clap merges the two)
//! 2. TOML config file
//! 3. Compiled default (only for settings that have one)
//!
//! Paths never have a compiled default: the spreadsheet, reference catalog,
//! clip library and output locations must always be supplied.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SHEETNOTE_CONFIG";

/// Default maximum Hamming distance for a classifier match
pub const DEFAULT_HASH_THRESHOLD: u32 = 10;

/// Number of bits in a perceptual hash; thresholds above this are meaningless
pub const HASH_BITS: u32 = 64;

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional; values given on the command line or in the
/// environment take precedence.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    pub spreadsheet_path: Option<PathBuf>,
    pub sheet_name: Option<String>,
    pub reference_dir: Option<PathBuf>,
    pub clip_dir: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub hash_threshold: Option<u32>,
    pub clip_trim_ms: Option<u64>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr only if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Locate and load the config file, if any
    ///
    /// An explicitly named file (argument or `SHEETNOTE_CONFIG`) must exist.
    /// The per-user default location is optional.
    pub fn discover(explicit: Option<&Path>) -> Result<Option<Self>> {
        if let Some(path) = explicit {
            info!("Loading config file: {}", path.display());
            return Self::load(path).map(Some);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                let path = PathBuf::from(path);
                info!("Loading config file from {}: {}", CONFIG_ENV_VAR, path.display());
                return Self::load(&path).map(Some);
            }
        }

        match default_config_path() {
            Some(path) if path.is_file() => {
                info!("Loading config file: {}", path.display());
                Self::load(&path).map(Some)
            }
            _ => {
                debug!("No config file found, using command line and environment only");
                Ok(None)
            }
        }
    }
}

/// Per-user config file location (`<config_dir>/sheetnote/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("sheetnote").join("config.toml"))
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub spreadsheet_path: Option<PathBuf>,
    pub sheet_name: Option<String>,
    pub reference_dir: Option<PathBuf>,
    pub clip_dir: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub hash_threshold: Option<u32>,
    pub clip_trim_ms: Option<u64>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
}

/// Fully resolved, read-only pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Workbook to read
    pub spreadsheet_path: PathBuf,
    /// Sheet to read; `None` selects the first sheet
    pub sheet_name: Option<String>,
    /// Directory holding the reference images (and optional `catalog.toml`)
    pub reference_dir: PathBuf,
    /// Directory holding the note clips
    pub clip_dir: PathBuf,
    /// Destination of the rendered audio
    pub output_path: PathBuf,
    /// Maximum Hamming distance accepted by the classifier
    pub hash_threshold: u32,
    /// Milliseconds removed from the end of every clip before concatenation
    pub clip_trim_ms: u64,
    pub logging: LoggingConfig,
}

impl Config {
    /// Merge overrides and file configuration into a complete configuration
    pub fn resolve(overrides: ConfigOverrides, file: Option<TomlConfig>) -> Result<Self> {
        let file = file.unwrap_or_default();

        let spreadsheet_path = required(
            overrides.spreadsheet_path.or(file.spreadsheet_path),
            "spreadsheet path",
            "--spreadsheet",
            "SHEETNOTE_SPREADSHEET",
            "spreadsheet_path",
        )?;
        let reference_dir = required(
            overrides.reference_dir.or(file.reference_dir),
            "reference image directory",
            "--reference-dir",
            "SHEETNOTE_REFERENCE_DIR",
            "reference_dir",
        )?;
        let clip_dir = required(
            overrides.clip_dir.or(file.clip_dir),
            "clip directory",
            "--clip-dir",
            "SHEETNOTE_CLIP_DIR",
            "clip_dir",
        )?;
        let output_path = required(
            overrides.output_path.or(file.output_path),
            "output path",
            "--output",
            "SHEETNOTE_OUTPUT",
            "output_path",
        )?;

        let hash_threshold = overrides
            .hash_threshold
            .or(file.hash_threshold)
            .unwrap_or(DEFAULT_HASH_THRESHOLD);
        if hash_threshold > HASH_BITS {
            return Err(Error::Config(format!(
                "hash threshold {} exceeds the {}-bit hash size",
                hash_threshold, HASH_BITS
            )));
        }

        let logging = LoggingConfig {
            level: overrides.log_level.unwrap_or(file.logging.level),
            file: overrides.log_file.or(file.logging.file),
        };

        Ok(Self {
            spreadsheet_path,
            sheet_name: overrides
                .sheet_name
                .or(file.sheet_name)
                .filter(|name| !name.trim().is_empty()),
            reference_dir,
            clip_dir,
            output_path,
            hash_threshold,
            clip_trim_ms: overrides.clip_trim_ms.or(file.clip_trim_ms).unwrap_or(0),
            logging,
        })
    }

    /// Check input locations and prepare the output directory
    pub fn validate_paths(&self) -> Result<()> {
        if !self.spreadsheet_path.is_file() {
            return Err(Error::Config(format!(
                "Spreadsheet not found: {}",
                self.spreadsheet_path.display()
            )));
        }

        for (dir, name) in [
            (&self.reference_dir, "Reference image directory"),
            (&self.clip_dir, "Clip directory"),
        ] {
            if !dir.is_dir() {
                return Err(Error::Config(format!("{} not found: {}", name, dir.display())));
            }
        }

        if let Some(parent) = self.output_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                info!("Creating output directory: {}", parent.display());
                std::fs::create_dir_all(parent)?;
            }
        }

        Ok(())
    }
}

fn required(
    value: Option<PathBuf>,
    what: &str,
    flag: &str,
    env_var: &str,
    file_key: &str,
) -> Result<PathBuf> {
    match value {
        Some(path) if !path.as_os_str().is_empty() => Ok(path),
        _ => Err(Error::Config(format!(
            "{} not configured (use {}, {} or `{}` in the config file)",
            what, flag, env_var, file_key
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_overrides() -> ConfigOverrides {
        ConfigOverrides {
            spreadsheet_path: Some(PathBuf::from("score.xlsx")),
            reference_dir: Some(PathBuf::from("refs")),
            clip_dir: Some(PathBuf::from("clips")),
            output_path: Some(PathBuf::from("out/score.wav")),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_applies_defaults() {
        let config = Config::resolve(full_overrides(), None).unwrap();
        assert_eq!(config.hash_threshold, DEFAULT_HASH_THRESHOLD);
        assert_eq!(config.clip_trim_ms, 0);
        assert_eq!(config.sheet_name, None);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_missing_path_names_flag_and_env() {
        let mut overrides = full_overrides();
        overrides.clip_dir = None;
        let err = Config::resolve(overrides, None).unwrap_err().to_string();
        assert!(err.contains("--clip-dir"), "{}", err);
        assert!(err.contains("SHEETNOTE_CLIP_DIR"), "{}", err);
    }

    #[test]
    fn test_threshold_above_hash_size_rejected() {
        let mut overrides = full_overrides();
        overrides.hash_threshold = Some(65);
        assert!(Config::resolve(overrides, None).is_err());
    }

    #[test]
    fn test_parse_logging_section() {
        let toml = r#"
            hash_threshold = 6

            [logging]
            level = "debug"
        "#;
        let config = TomlConfig::parse(toml, Path::new("inline.toml")).unwrap();
        assert_eq!(config.hash_threshold, Some(6));
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = TomlConfig::parse("root_folder = \"/tmp\"", Path::new("bad.toml")).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }
}
