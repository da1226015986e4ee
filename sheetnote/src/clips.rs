//! Clip library
//!
//! A flat directory of short recordings named by the value they play
//! (`C4.wav`, `F#4_piano.mp3`, `rest.wav`). Files are indexed by stem.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Extensions the decoder understands, in preference order for equal stems
pub const CLIP_EXTENSIONS: &[&str] = &["wav", "flac", "ogg", "mp3", "m4a"];

fn extension_rank(path: &Path) -> Option<usize> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    CLIP_EXTENSIONS.iter().position(|e| *e == ext)
}

#[derive(Debug, Clone, Default)]
pub struct ClipLibrary {
    clips: HashMap<String, PathBuf>,
}

impl ClipLibrary {
    /// Index every supported audio file in `dir`
    pub fn open(dir: &Path) -> Result<Self> {
        let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;

        let mut library = Self::default();
        for entry in entries {
            let path = entry.map_err(|e| Error::io(dir, e))?.path();
            if !path.is_file() {
                continue;
            }
            library.insert(path);
        }

        if library.is_empty() {
            warn!(dir = %dir.display(), "Clip directory holds no supported audio files");
        }
        info!(dir = %dir.display(), clips = library.len(), "Clip library indexed");
        Ok(library)
    }

    /// Add one file; ignored when the extension is not supported
    pub fn insert(&mut self, path: PathBuf) {
        let Some(rank) = extension_rank(&path) else {
            debug!(path = %path.display(), "Skipping non-audio file");
            return;
        };
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
            return;
        };

        match self.clips.get(&stem) {
            Some(existing) if extension_rank(existing).is_some_and(|r| r <= rank) => {
                warn!(
                    kept = %existing.display(),
                    ignored = %path.display(),
                    "Two clips share a name"
                );
            }
            _ => {
                self.clips.insert(stem, path);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.clips.get(name).map(PathBuf::as_path)
    }

    /// Clip for a note value, preferring the instrument-specific recording
    pub fn resolve(&self, value: &str, instrument: Option<&str>) -> Option<&Path> {
        instrument
            .and_then(|instrument| self.get(&format!("{}_{}", value, instrument)))
            .or_else(|| self.get(value))
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}
