//! Common error types for sheetnote

use thiserror::Error;

/// Common result type for sheetnote operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while preparing a run (configuration and logging)
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML configuration file could not be parsed
    #[error("Invalid configuration file {path}: {message}")]
    ConfigFile { path: String, message: String },

    /// Logging subscriber could not be installed
    #[error("Logging error: {0}")]
    Logging(String),
}
