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
//! Whole-file decoding through symphonia.
//!
//! Decoding may block on I/O and is never called from a mix thread; the loaders
//! in [`crate::samples`] run it on the caller's thread before any mixer lock is
//! taken.

use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::debug;

use crate::error::MixerError;

/// Interleaved f32 samples as they came out of the decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl Decoded {
    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }
}

/// Decodes an entire audio file (WAV, MP3, FLAC, OGG, ...) into memory.
pub fn decode_file(path: &Path) -> Result<Decoded, MixerError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(MixerError::AssetNotFound(path.to_path_buf()))
        }
        Err(e) => return Err(MixerError::decode(path, e)),
    };
    if !file.metadata().map(|m| m.is_file()).unwrap_or(false) {
        return Err(MixerError::AssetNotFound(path.to_path_buf()));
    }

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let probed = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| MixerError::decode(path, e))?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| MixerError::decode(path, "no audio track found"))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| MixerError::decode(path, "sample rate not specified"))?;
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);

    let mut decoder = get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| MixerError::decode(path, e))?;

    let mut samples = Vec::new();
    while let Some(packet) = next_packet(format_reader.as_mut(), decoder.as_mut(), track_id)
        .map_err(|e| MixerError::decode(path, e))?
    {
        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // A corrupt packet is skipped rather than failing the whole file.
            Err(SymphoniaError::DecodeError(e)) => {
                debug!(path = ?path, error = e, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(MixerError::decode(path, e)),
        };

        let spec = *decoded.spec();
        if channels == 0 {
            channels = spec.channels.count() as u16;
        }
        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buffer.samples());
    }

    if channels == 0 {
        return Err(MixerError::decode(path, "channel count not specified"));
    }
    if samples.is_empty() {
        return Err(MixerError::decode(path, "file contains no audio"));
    }

    Ok(Decoded {
        samples,
        channels,
        sample_rate,
    })
}

/// Reads the next packet belonging to `track_id`. `Ok(None)` marks the end of
/// the stream.
fn next_packet(
    format_reader: &mut dyn FormatReader,
    decoder: &mut dyn Decoder,
    track_id: u32,
) -> Result<Option<Packet>, SymphoniaError> {
    loop {
        match format_reader.next_packet() {
            Ok(packet) if packet.track_id() == track_id => return Ok(Some(packet)),
            Ok(_) => continue,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                return Ok(None)
            }
            // Some demuxers report a truncated tail as a decode error.
            Err(SymphoniaError::DecodeError(_)) => return Ok(None),
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::write_wav;

    #[test]
    fn test_decode_missing_file() {
        let result = decode_file(Path::new("nonexistent.wav"));
        assert!(matches!(result, Err(MixerError::AssetNotFound(_))));
    }

    #[test]
    fn test_decode_directory_is_not_found() {
        let tempdir = tempfile::tempdir().unwrap();
        let result = decode_file(tempdir.path());
        assert!(matches!(result, Err(MixerError::AssetNotFound(_))));
    }

    #[test]
    fn test_decode_garbage() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("garbage.wav");
        std::fs::write(&path, b"this is definitely not a riff header").unwrap();

        let result = decode_file(&path);
        assert!(matches!(result, Err(MixerError::Decode { .. })));
    }

    #[test]
    fn test_decode_stereo_wav() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("stereo.wav");
        write_wav(&path, &[100, -100, 200, -200, 300, -300], 2, 22050).unwrap();

        let decoded = decode_file(&path).unwrap();
        assert_eq!(decoded.channels, 2);
        assert_eq!(decoded.sample_rate, 22050);
        assert_eq!(decoded.frames(), 3);
        assert!((decoded.samples[0] - 100.0 / 32768.0).abs() < 1e-6);
        assert!((decoded.samples[1] + 100.0 / 32768.0).abs() < 1e-6);
    }
}
