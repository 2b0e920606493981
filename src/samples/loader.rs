// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Loading of audio files into the mixer's output layout.
//!
//! Everything is converted once at load time (channel count, sample rate and
//! sample width) so the mix tick only ever adds samples together.

use std::path::Path;

use tracing::{debug, info};

use super::pcm::Pcm;
use crate::audio::decode::{decode_file, Decoded};
use crate::error::MixerError;

/// Converts decoded files into buffers matching the output stream.
#[derive(Debug, Clone)]
pub struct SampleLoader {
    /// Output sample rate every buffer is resampled to.
    target_sample_rate: u32,
    /// Output channel count every buffer is remapped to.
    target_channels: u16,
}

impl SampleLoader {
    /// Creates a new sample loader.
    pub fn new(target_sample_rate: u32, target_channels: u16) -> Self {
        Self {
            target_sample_rate,
            target_channels,
        }
    }

    /// Decodes the file at `path` and converts it to the output layout.
    /// Blocks on file I/O, so callers must not hold any mixer lock.
    pub fn load(&self, path: &Path) -> Result<Pcm, MixerError> {
        info!(path = ?path, "Loading audio into memory");

        let decoded = decode_file(path)?;
        let source_rate = decoded.sample_rate;
        let source_channels = decoded.channels;
        let pcm = self.convert(decoded);

        info!(
            path = ?path,
            source_channels,
            source_rate,
            duration_ms = pcm.duration().as_millis(),
            memory_kb = pcm.memory_size() / 1024,
            "Audio loaded"
        );

        Ok(pcm)
    }

    /// Converts decoded samples to the target channel count, rate and width.
    pub fn convert(&self, decoded: Decoded) -> Pcm {
        let remapped = remap_channels(&decoded.samples, decoded.channels, self.target_channels);

        let resampled = if decoded.sample_rate != self.target_sample_rate {
            debug!(
                source_rate = decoded.sample_rate,
                target_rate = self.target_sample_rate,
                "Resampling"
            );
            transcode_samples(
                &remapped,
                self.target_channels,
                decoded.sample_rate,
                self.target_sample_rate,
            )
        } else {
            remapped
        };

        Pcm::new(
            resampled.into_iter().map(quantize).collect(),
            self.target_channels,
            self.target_sample_rate,
        )
    }
}

/// Maps interleaved samples from one channel count to another. Mono is
/// duplicated into every output channel, anything folded down to mono is
/// averaged, and other layouts copy matching channels and pad with silence.
fn remap_channels(samples: &[f32], from: u16, to: u16) -> Vec<f32> {
    if from == to || from == 0 {
        return samples.to_vec();
    }

    let from = from as usize;
    let to = to as usize;
    let frames = samples.len() / from;
    let mut output = Vec::with_capacity(frames * to);

    for frame in samples.chunks_exact(from) {
        if from == 1 {
            output.extend(std::iter::repeat(frame[0]).take(to));
        } else if to == 1 {
            output.push(frame.iter().sum::<f32>() / from as f32);
        } else {
            for channel in 0..to {
                output.push(frame.get(channel).copied().unwrap_or(0.0));
            }
        }
    }

    output
}

/// Resamples interleaved samples using linear interpolation. Good enough for
/// one-shot effects and background music at game-audio quality.
fn transcode_samples(
    samples: &[f32],
    channel_count: u16,
    source_rate: u32,
    target_rate: u32,
) -> Vec<f32> {
    if source_rate == 0 || channel_count == 0 {
        return Vec::new();
    }

    let ratio = target_rate as f64 / source_rate as f64;
    let channels = channel_count as usize;
    let source_frames = samples.len() / channels;
    let target_frames = (source_frames as f64 * ratio).ceil() as usize;

    let mut output = Vec::with_capacity(target_frames * channels);

    for target_frame in 0..target_frames {
        let source_pos = target_frame as f64 / ratio;
        let source_frame = source_pos.floor() as usize;
        let frac = source_pos.fract() as f32;

        for channel in 0..channels {
            let idx0 = source_frame * channels + channel;
            let idx1 = (source_frame + 1) * channels + channel;

            let s0 = samples.get(idx0).copied().unwrap_or(0.0);
            let s1 = samples.get(idx1).copied().unwrap_or(s0);

            output.push(s0 + (s1 - s0) * frac);
        }
    }

    output
}

/// Converts a float sample in [-1.0, 1.0] to i16, saturating out-of-range input.
#[inline]
fn quantize(sample: f32) -> i16 {
    (sample * 32768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::write_wav;

    #[test]
    fn test_remap_mono_to_stereo() {
        let result = remap_channels(&[0.25, -0.5], 1, 2);
        assert_eq!(result, vec![0.25, 0.25, -0.5, -0.5]);
    }

    #[test]
    fn test_remap_stereo_to_mono() {
        let result = remap_channels(&[0.5, 0.25, -1.0, 1.0], 2, 1);
        assert_eq!(result, vec![0.375, 0.0]);
    }

    #[test]
    fn test_remap_surround_to_stereo() {
        let result = remap_channels(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6], 3, 2);
        assert_eq!(result, vec![0.1, 0.2, 0.4, 0.5]);
    }

    #[test]
    fn test_transcode_length() {
        let source_samples: Vec<f32> = (0..4410)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin())
            .collect();

        let result = transcode_samples(&source_samples, 1, 44100, 48000);

        let expected_len = (4410.0_f64 * 48000.0 / 44100.0).ceil() as usize;
        assert_eq!(result.len(), expected_len);
    }

    #[test]
    fn test_transcode_stereo_preserves_channels() {
        let source_samples = vec![1.0f32, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0];

        let result = transcode_samples(&source_samples, 2, 22050, 44100);

        assert_eq!(result.len(), 16);
        for frame in result.chunks_exact(2) {
            assert!((frame[0] - 1.0).abs() < 1e-6);
            assert!((frame[1] + 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_quantize_saturates() {
        assert_eq!(quantize(0.0), 0);
        assert_eq!(quantize(0.5), 16384);
        assert_eq!(quantize(-1.0), i16::MIN);
        assert_eq!(quantize(1.0), i16::MAX);
        assert_eq!(quantize(3.0), i16::MAX);
        assert_eq!(quantize(-3.0), i16::MIN);
    }

    #[test]
    fn test_load_converts_to_output_layout() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("mono.wav");
        write_wav(&path, &[1000, -2000, 3000], 1, 44100).unwrap();

        let loader = SampleLoader::new(44100, 2);
        let pcm = loader.load(&path).unwrap();

        assert_eq!(pcm.channels(), 2);
        assert_eq!(pcm.sample_rate(), 44100);
        assert_eq!(pcm.samples(), &[1000, 1000, -2000, -2000, 3000, 3000]);
    }

    #[test]
    fn test_load_missing_file() {
        let loader = SampleLoader::new(44100, 2);
        let result = loader.load(Path::new("nonexistent.wav"));
        assert!(matches!(result, Err(MixerError::AssetNotFound(_))));
    }
}
