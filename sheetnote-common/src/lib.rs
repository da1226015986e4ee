//! # sheetnote Common Library
//!
//! Shared code for the sheetnote crates:
//! - Pipeline configuration (CLI/environment overrides, TOML file, defaults)
//! - Logging initialization
//! - Common error type

pub mod config;
pub mod error;
pub mod logging;

pub use config::{Config, ConfigOverrides, LoggingConfig, TomlConfig};
pub use error::{Error, Result};
