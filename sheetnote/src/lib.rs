//! sheetnote - spreadsheet music notation to audio
//!
//! A score is drawn in a spreadsheet: text cells carry the header and time
//! signature, pictures carry clefs, note heads, alterations, rests and bars.
//! The library recognizes the pictures by perceptual hash, checks the token
//! stream against the phrase grammar and renders the phrases by
//! concatenating recorded clips.

pub mod audio;
pub mod catalog;
pub mod classifier;
pub mod clips;
pub mod error;
pub mod grammar;
pub mod hash;
pub mod header;
pub mod phrase;
pub mod pipeline;
pub mod pitch;
pub mod synth;
pub mod token;
pub mod tokenizer;
pub mod workbook;

pub use catalog::{ReferenceCatalog, Symbol, SymbolRole};
pub use classifier::{Classification, Classifier};
pub use error::{Error, ErrorKind, Result};
pub use grammar::{ValidatedPhrase, Validator, Violation};
pub use hash::PerceptualHash;
pub use phrase::Phrase;
pub use token::{CellPosition, Token, TokenKind};
