//! Audio decoding and encoding
//!
//! Clips are decoded with symphonia into interleaved stereo `f32`. Mono
//! sources are duplicated to both channels; channels past the second are
//! dropped. The rendered stream is written as 16-bit PCM WAV.

use crate::error::{Error, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::BufWriter;
use std::path::Path;
use std::time::Duration;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Channels of every stream
pub const CHANNELS: usize = 2;

/// Interleaved stereo samples at a fixed rate
#[derive(Debug, Clone, PartialEq)]
pub struct AudioStream {
    sample_rate: u32,
    samples: Vec<f32>,
}

impl AudioStream {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            samples: Vec::new(),
        }
    }

    /// Wrap interleaved stereo samples; a trailing half frame is dropped
    pub fn from_interleaved(sample_rate: u32, mut samples: Vec<f32>) -> Self {
        samples.truncate(samples.len() - samples.len() % CHANNELS);
        Self {
            sample_rate,
            samples,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / CHANNELS
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Frames spanned by `duration` at this stream's rate
    pub fn frames_in(&self, duration: Duration) -> usize {
        (duration.as_secs_f64() * self.sample_rate as f64).round() as usize
    }

    /// Cut or pad with silence to exactly `frames`
    pub fn set_frames(&mut self, frames: usize) {
        self.samples.resize(frames * CHANNELS, 0.0);
    }

    /// Append another stream of the same rate
    pub fn append(&mut self, other: &AudioStream) -> Result<()> {
        if other.sample_rate != self.sample_rate {
            return Err(Error::Audio(format!(
                "sample rate mismatch: {} Hz after {} Hz",
                other.sample_rate, self.sample_rate
            )));
        }
        self.samples.extend_from_slice(&other.samples);
        Ok(())
    }

    /// Sum another stream of the same rate into this one, sample by sample
    ///
    /// The shorter stream is padded with silence; sums are clamped to ±1.
    pub fn mix(&mut self, other: &AudioStream) -> Result<()> {
        if other.sample_rate != self.sample_rate {
            return Err(Error::Audio(format!(
                "sample rate mismatch: {} Hz mixed into {} Hz",
                other.sample_rate, self.sample_rate
            )));
        }
        if other.samples.len() > self.samples.len() {
            self.samples.resize(other.samples.len(), 0.0);
        }
        for (mixed, &sample) in self.samples.iter_mut().zip(&other.samples) {
            *mixed = (*mixed + sample).clamp(-1.0, 1.0);
        }
        Ok(())
    }

    /// Write 16-bit stereo WAV; the file appears only once complete
    pub fn write_wav(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;

        let spec = WavSpec {
            channels: CHANNELS as u16,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let encode_error = |e: hound::Error| Error::Audio(format!("{}: {}", path.display(), e));

        {
            let mut writer =
                WavWriter::new(BufWriter::new(temp.as_file_mut()), spec).map_err(encode_error)?;
            for &sample in &self.samples {
                writer
                    .write_sample(to_i16(sample))
                    .map_err(encode_error)?;
            }
            writer.finalize().map_err(encode_error)?;
        }

        temp.persist(path).map_err(|e| Error::io(path, e.error))?;
        info!(
            path = %path.display(),
            frames = self.frames(),
            seconds = format!("{:.2}", self.duration().as_secs_f64()),
            "Audio written"
        );
        Ok(())
    }
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

/// Decode an audio file into a stereo stream at its native rate
pub fn decode_clip(path: &Path) -> Result<AudioStream> {
    debug!(path = %path.display(), "Decoding clip");
    let audio_error = |what: &str, e: SymphoniaError| {
        Error::Audio(format!("{} {}: {}", what, path.display(), e))
    };

    let file = std::fs::File::open(path).map_err(|e| Error::io(path, e))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| audio_error("Failed to probe", e))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::Audio(format!("No audio track in {}", path.display())))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| Error::Audio(format!("Sample rate unknown for {}", path.display())))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| audio_error("Failed to create decoder for", e))?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(audio_error("Failed to read packet from", e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                warn!(path = %path.display(), error = %e, "Decode error in packet, skipping");
                continue;
            }
            Err(e) => return Err(audio_error("Failed to decode", e)),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count();
        if channels == 0 {
            continue;
        }

        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);

        for frame in buf.samples().chunks_exact(channels) {
            let left = frame[0];
            let right = if channels > 1 { frame[1] } else { left };
            samples.push(left);
            samples.push(right);
        }
    }

    let stream = AudioStream::from_interleaved(sample_rate, samples);
    debug!(
        path = %path.display(),
        sample_rate,
        frames = stream.frames(),
        "Clip decoded"
    );
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_mono_wav(path: &Path, rate: u32, values: &[i16]) {
        let spec = WavSpec {
            channels: 1,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for &v in values {
            writer.write_sample(v).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_mono_clip_is_duplicated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("C4.wav");
        write_mono_wav(&path, 8000, &[0, 16384, -16384, 0]);

        let stream = decode_clip(&path).unwrap();
        assert_eq!(stream.sample_rate(), 8000);
        assert_eq!(stream.frames(), 4);
        let s = stream.samples();
        assert_eq!(s[2], s[3]);
        assert!((s[2] - 0.5).abs() < 0.01);
        assert!((s[4] + 0.5).abs() < 0.01);
    }

    #[test]
    fn test_decode_missing_file_is_io_failure() {
        let err = decode_clip(Path::new("/nonexistent/C4.wav")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::IoFailure);
    }

    #[test]
    fn test_set_frames_truncates_and_pads() {
        let mut stream = AudioStream::from_interleaved(100, vec![0.5; 20]);
        assert_eq!(stream.frames(), 10);
        stream.set_frames(4);
        assert_eq!(stream.samples().len(), 8);
        stream.set_frames(6);
        assert_eq!(stream.samples()[8..], [0.0; 4]);
        assert_eq!(stream.frames(), 6);
        assert!((stream.duration().as_secs_f64() - 0.06).abs() < 1e-9);
    }

    #[test]
    fn test_append_rejects_other_rate() {
        let mut a = AudioStream::from_interleaved(44100, vec![0.0; 4]);
        let b = AudioStream::from_interleaved(48000, vec![0.0; 4]);
        assert!(a.append(&b).is_err());
        assert_eq!(a.frames(), 2);
    }

    #[test]
    fn test_mix_pads_and_clamps() {
        let mut a = AudioStream::from_interleaved(100, vec![0.5, -0.5, 0.75, 0.75]);
        let b = AudioStream::from_interleaved(100, vec![0.25, -0.75, 0.5, 0.0, 0.1, 0.2]);
        a.mix(&b).unwrap();
        assert_eq!(a.frames(), 3);
        assert_eq!(a.samples(), &[0.75, -1.0, 1.0, 0.75, 0.1, 0.2]);

        let c = AudioStream::from_interleaved(200, vec![0.0; 2]);
        assert!(a.mix(&c).is_err());
    }

    #[test]
    fn test_write_wav_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.wav");
        let stream = AudioStream::from_interleaved(22050, vec![0.25, -0.25, 1.5, -1.5]);
        stream.write_wav(&path).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().sample_rate, 22050);
        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![8192, -8192, i16::MAX, -i16::MAX]);
    }
}
