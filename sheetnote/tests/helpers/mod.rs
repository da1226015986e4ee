//! Test helper modules for sheetnote integration tests
//!
//! - glyphs: 8×8 reference pictures with known hashes, plus a catalog on disk
//! - audio_generator: WAV clips of known length
//! - xlsx_builder: minimal workbooks with text cells and anchored pictures

#![allow(dead_code)]

pub mod audio_generator;
pub mod glyphs;
pub mod xlsx_builder;

pub use audio_generator::generate_clip;
pub use glyphs::{glyph, glyph_bits, glyph_png, upscaled, write_reference_dir, Glyph, GLYPHS, STRANGER};
pub use xlsx_builder::XlsxBuilder;
