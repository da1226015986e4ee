//! Error types for sheetnote
//!
//! Every variant maps onto one of four reported kinds (see [`ErrorKind`]).
//! Variants that originate from a cell carry its position.

use crate::grammar::Violation;
use crate::token::CellPosition;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Reported error category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnrecognizedSymbol,
    GrammarViolation,
    MissingClip,
    IoFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::UnrecognizedSymbol => "UnrecognizedSymbol",
            ErrorKind::GrammarViolation => "GrammarViolation",
            ErrorKind::MissingClip => "MissingClip",
            ErrorKind::IoFailure => "IOFailure",
        };
        f.write_str(name)
    }
}

/// Main error type for the sheetnote library
#[derive(Error, Debug)]
pub enum Error {
    /// A cell that matched nothing in the catalog
    ///
    /// `hint` is the raw text for text cells, or the nearest reference symbol
    /// for images (empty when the catalog offered no candidate).
    #[error("Unrecognized symbol at {position}{}", hint_suffix(.hint))]
    UnrecognizedSymbol { position: CellPosition, hint: String },

    #[error("Grammar violation: {0}")]
    GrammarViolation(#[from] Violation),

    /// No clip in the library for a note or rest value
    #[error("Missing clip for '{value}' at {position}")]
    MissingClip { value: String, position: CellPosition },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Workbook could not be opened or one of its parts is malformed
    #[error("Workbook error: {0}")]
    Workbook(String),

    /// Reference image could not be decoded
    #[error("Image error in {}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Catalog manifest errors and empty catalogs
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Clip decoding, sample format or WAV encoding errors
    #[error("Audio error: {0}")]
    Audio(String),

    #[error(transparent)]
    Config(#[from] sheetnote_common::Error),
}

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!(" (near '{}')", hint)
    }
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnrecognizedSymbol { .. } => ErrorKind::UnrecognizedSymbol,
            Error::GrammarViolation(_) => ErrorKind::GrammarViolation,
            Error::MissingClip { .. } => ErrorKind::MissingClip,
            Error::Io { .. }
            | Error::Workbook(_)
            | Error::Image { .. }
            | Error::Catalog(_)
            | Error::Audio(_)
            | Error::Config(_) => ErrorKind::IoFailure,
        }
    }

    /// Source cell of the error, when it has one
    pub fn position(&self) -> Option<CellPosition> {
        match self {
            Error::UnrecognizedSymbol { position, .. } | Error::MissingClip { position, .. } => {
                Some(*position)
            }
            Error::GrammarViolation(violation) => violation.position(),
            _ => None,
        }
    }
}

/// Convenience Result type
pub type Result<T> = std::result::Result<T, Error>;
