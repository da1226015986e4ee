//! End-to-end pipeline
//!
//! check paths → read cells → classify pictures → validate phrases → render.
//! Every step runs to completion before the next starts; the first error
//! aborts the run.

use crate::catalog::ReferenceCatalog;
use crate::classifier::Classifier;
use crate::clips::ClipLibrary;
use crate::error::Result;
use crate::grammar::{ValidatedPhrase, Validator};
use crate::phrase::{split_phrases, Phrase};
use crate::synth::{SynthOptions, Synthesizer};
use crate::tokenizer::tokenize;
use crate::workbook::read_sheet;
use sheetnote_common::Config;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Stop after validation; no clips are read and nothing is written
    pub validate_only: bool,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub sheet: String,
    pub tokens: usize,
    pub phrases: Vec<ValidatedPhrase>,
    /// Written file and its length, unless validation only
    pub output: Option<(PathBuf, Duration)>,
}

impl RunReport {
    pub fn meter_warnings(&self) -> usize {
        self.phrases.iter().map(|p| p.warnings.len()).sum()
    }
}

pub fn run(config: &Config, options: RunOptions) -> Result<RunReport> {
    config.validate_paths()?;

    let catalog = ReferenceCatalog::load(&config.reference_dir)?;
    let classifier = Classifier::new(&catalog, config.hash_threshold);

    let sheet = read_sheet(&config.spreadsheet_path, config.sheet_name.as_deref())?;
    let tokens = tokenize(&sheet, &classifier);

    let mut phrases = split_phrases(&tokens);
    if phrases.is_empty() {
        // Validating the empty phrase reports what the sheet lacks
        phrases.push(Phrase::new(Vec::new()));
    }

    let validator = Validator::new(&catalog);
    let validated = phrases
        .iter()
        .map(|phrase| validator.validate(phrase))
        .collect::<Result<Vec<_>>>()?;
    info!(
        sheet = %sheet.name(),
        tokens = tokens.len(),
        phrases = validated.len(),
        "Score validated"
    );

    let mut report = RunReport {
        sheet: sheet.name().to_string(),
        tokens: tokens.len(),
        phrases: validated,
        output: None,
    };
    if options.validate_only {
        return Ok(report);
    }

    let library = ClipLibrary::open(&config.clip_dir)?;
    let mut synthesizer = Synthesizer::new(&library, SynthOptions::with_trim_ms(config.clip_trim_ms));
    let audio = synthesizer.render(&report.phrases)?;
    audio.write_wav(&config.output_path)?;

    report.output = Some((config.output_path.clone(), audio.duration()));
    Ok(report)
}
