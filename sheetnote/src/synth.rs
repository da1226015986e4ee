//! Audio synthesis by clip concatenation
//!
//! Every note or rest event is rendered by its recorded clip, optionally
//! trimmed at the tail and stretched or cut to its duration factor. All clip
//! lookups happen before any decoding so a missing clip fails the render
//! before work is done or output is written.
//!
//! Phrases written under the same clef form one voice and play one after
//! another. Voices play together: a treble staff and a bass staff are mixed
//! into the output, the shorter voice padded with silence.

use crate::audio::{decode_clip, AudioStream};
use crate::catalog::DurationFactor;
use crate::clips::ClipLibrary;
use crate::error::{Error, Result};
use crate::grammar::ValidatedPhrase;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SynthOptions {
    /// Removed from the end of every clip before its duration is applied
    pub clip_trim: Duration,
}

impl SynthOptions {
    pub fn with_trim_ms(ms: u64) -> Self {
        Self {
            clip_trim: Duration::from_millis(ms),
        }
    }
}

/// One resolved event: which clip to play, for how long, in which voice
#[derive(Debug, Clone, PartialEq, Eq)]
struct PlannedClip {
    voice: usize,
    path: PathBuf,
    duration: DurationFactor,
}

/// Voice key of a phrase: its clef, or the clef symbol when the clef is unknown
fn voice_key(phrase: &ValidatedPhrase) -> String {
    match phrase.clef {
        Some(clef) => clef.to_string(),
        None => phrase.clef_symbol.clone(),
    }
}

/// `round(frames × factor)` in integer arithmetic
fn scaled_frames(frames: usize, factor: DurationFactor) -> usize {
    let numer = *factor.numer() as u128;
    let denom = *factor.denom() as u128;
    ((frames as u128 * numer * 2 + denom) / (denom * 2)) as usize
}

pub struct Synthesizer<'l> {
    library: &'l ClipLibrary,
    options: SynthOptions,
    cache: HashMap<PathBuf, AudioStream>,
}

impl<'l> Synthesizer<'l> {
    pub fn new(library: &'l ClipLibrary, options: SynthOptions) -> Self {
        Self {
            library,
            options,
            cache: HashMap::new(),
        }
    }

    /// Look up every clip; fails on the first event without one
    ///
    /// Returns the voice keys in order of first appearance with the plan.
    fn plan(&self, phrases: &[ValidatedPhrase]) -> Result<(Vec<String>, Vec<PlannedClip>)> {
        let mut voices: Vec<String> = Vec::new();
        let mut plan = Vec::new();
        for phrase in phrases {
            let key = voice_key(phrase);
            let voice = match voices.iter().position(|v| *v == key) {
                Some(index) => index,
                None => {
                    voices.push(key);
                    voices.len() - 1
                }
            };
            let instrument = phrase.header.instrument.as_deref();
            for event in &phrase.events {
                let path = self
                    .library
                    .resolve(&event.value, instrument)
                    .ok_or_else(|| Error::MissingClip {
                        value: event.value.clone(),
                        position: event.position,
                    })?;
                debug!(value = %event.value, clip = %path.display(), "Clip resolved");
                plan.push(PlannedClip {
                    voice,
                    path: path.to_path_buf(),
                    duration: event.duration,
                });
            }
        }
        Ok((voices, plan))
    }

    fn clip(&mut self, path: &Path) -> Result<&AudioStream> {
        if !self.cache.contains_key(path) {
            let mut clip = decode_clip(path)?;
            let trim = clip.frames_in(self.options.clip_trim);
            if trim > 0 {
                if trim >= clip.frames() {
                    warn!(
                        clip = %path.display(),
                        trim_ms = self.options.clip_trim.as_millis() as u64,
                        "Trim removes the whole clip"
                    );
                }
                clip.set_frames(clip.frames().saturating_sub(trim));
            }
            self.cache.insert(path.to_path_buf(), clip);
        }
        self.cache
            .get(path)
            .ok_or_else(|| Error::Audio(format!("clip cache lost {}", path.display())))
    }

    /// Render phrases into a single stream, one voice per clef
    pub fn render(&mut self, phrases: &[ValidatedPhrase]) -> Result<AudioStream> {
        let (keys, plan) = self.plan(phrases)?;

        let mut voices: Vec<Option<AudioStream>> = vec![None; keys.len()];
        for planned in &plan {
            let mut clip = self.clip(&planned.path)?.clone();
            if planned.duration != DurationFactor::from_integer(1) {
                clip.set_frames(scaled_frames(clip.frames(), planned.duration));
            }

            match voices[planned.voice].as_mut() {
                Some(stream) => stream
                    .append(&clip)
                    .map_err(|e| with_clip_path(e, &planned.path))?,
                None => voices[planned.voice] = Some(clip),
            }
        }

        let mut output: Option<AudioStream> = None;
        for (key, voice) in keys.iter().zip(voices) {
            let Some(voice) = voice else {
                continue;
            };
            debug!(voice = %key, frames = voice.frames(), "Voice rendered");
            match output.as_mut() {
                Some(stream) => stream.mix(&voice)?,
                None => output = Some(voice),
            }
        }

        let output = output.ok_or_else(|| Error::Audio("no notes to render".to_string()))?;
        info!(
            events = plan.len(),
            voices = keys.len(),
            clips = self.cache.len(),
            seconds = format!("{:.2}", output.duration().as_secs_f64()),
            "Rendering complete"
        );
        Ok(output)
    }

    pub fn render_phrase(&mut self, phrase: &ValidatedPhrase) -> Result<AudioStream> {
        self.render(std::slice::from_ref(phrase))
    }
}

fn with_clip_path(error: Error, path: &Path) -> Error {
    match error {
        Error::Audio(message) => Error::Audio(format!("{} ({})", message, path.display())),
        other => other,
    }
}

/// Render one phrase with default options
pub fn synthesize(phrase: &ValidatedPhrase, library: &ClipLibrary) -> Result<AudioStream> {
    Synthesizer::new(library, SynthOptions::default()).render_phrase(phrase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_rational::Ratio;

    #[test]
    fn test_scaled_frames_rounds() {
        assert_eq!(scaled_frames(100, Ratio::from_integer(2)), 200);
        assert_eq!(scaled_frames(101, Ratio::new(1, 2)), 51);
        assert_eq!(scaled_frames(100, Ratio::new(1, 3)), 33);
        assert_eq!(scaled_frames(0, Ratio::new(3, 2)), 0);
    }

    #[test]
    fn test_trim_options() {
        assert_eq!(SynthOptions::default().clip_trim, Duration::ZERO);
        assert_eq!(
            SynthOptions::with_trim_ms(1300).clip_trim,
            Duration::from_millis(1300)
        );
    }
}
