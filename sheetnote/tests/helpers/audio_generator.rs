//! Clip fixtures
//!
//! Deterministic WAV files with a known frame count, so rendered lengths can
//! be checked exactly.

use hound::{WavSpec, WavWriter};
use std::f32::consts::PI;
use std::path::Path;

/// Sample rate used by every generated clip
pub const CLIP_SAMPLE_RATE: u32 = 8000;

/// Generate a mono 16-bit sine clip of `frames` frames
pub fn generate_clip(path: &Path, frames: u32, frequency_hz: f32) {
    generate_clip_at(path, frames, frequency_hz, CLIP_SAMPLE_RATE);
}

pub fn generate_clip_at(path: &Path, frames: u32, frequency_hz: f32, sample_rate: u32) {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    for n in 0..frames {
        let t = n as f32 / sample_rate as f32;
        let value = (2.0 * PI * frequency_hz * t).sin() * 0.5;
        writer.write_sample((value * i16::MAX as f32) as i16).unwrap();
    }
    writer.finalize().unwrap();
}
