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
use std::{error::Error, fmt, path::Path, str::FromStr};

use config::{Config, File, FileFormat};
use serde::Deserialize;

use super::error::ConfigError;
use crate::audio::{SampleFormat, TargetFormat};
use crate::mixer::{
    MixerConfig, DEFAULT_CHANNELS, DEFAULT_FRAMES_PER_TICK, DEFAULT_OUTPUT_CHANNELS,
};

const DEFAULT_DEVICE: &str = "default";
const DEFAULT_SAMPLE_RATE: u32 = 44100;
const DEFAULT_BITS_PER_SAMPLE: u16 = 16;
const DEFAULT_THREAD_PRIORITY: u8 = 70;

/// How to choose the cpal stream buffer size (period size). Affects latency
/// against underrun tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamBufferSize {
    /// Use the backend's default. Ticks then follow whatever period size the
    /// backend picks.
    Default,
    /// Use the device's minimum supported period size.
    Min,
    /// Use a fixed size in frames.
    Fixed(u32),
}

impl FromStr for StreamBufferSize {
    type Err = Box<dyn Error>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "default" => Ok(StreamBufferSize::Default),
            "min" => Ok(StreamBufferSize::Min),
            frames => match frames.parse::<u32>() {
                Ok(0) | Err(_) => Err(format!("Invalid stream buffer size: {}", s).into()),
                Ok(frames) => Ok(StreamBufferSize::Fixed(frames)),
            },
        }
    }
}

impl fmt::Display for StreamBufferSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamBufferSize::Default => write!(f, "default"),
            StreamBufferSize::Min => write!(f, "min"),
            StreamBufferSize::Fixed(frames) => write!(f, "{} frames", frames),
        }
    }
}

/// A YAML representation of the mixer configuration.
#[derive(Deserialize, Clone, Debug)]
pub struct Mixer {
    /// The output device. Names starting with "mock" select the mock device.
    device: Option<String>,

    /// Number of sound effect channels (default: 16).
    channels: Option<usize>,

    /// Number of interleaved output channels (default: 2).
    output_channels: Option<u16>,

    /// Output sample rate in Hz (default: 44100).
    sample_rate: Option<u32>,

    /// Device sample format (default: "int").
    sample_format: Option<String>,

    /// Device bits per sample (default: 16).
    bits_per_sample: Option<u16>,

    /// Frames rendered per tick (default: 1024).
    frames_per_tick: Option<usize>,

    /// cpal stream buffer: "default", "min" or a number of frames. When unset,
    /// uses frames_per_tick.
    stream_buffer_size: Option<String>,

    /// Priority (0-99) of the audio callback thread (default: 70).
    thread_priority: Option<u8>,

    /// Whether to attempt SCHED_FIFO for the callback thread (default: true).
    rt_audio: Option<bool>,
}

impl Mixer {
    /// Creates a configuration with every setting at its default.
    pub fn new(device: &str) -> Mixer {
        Mixer {
            device: Some(device.to_string()),
            channels: None,
            output_channels: None,
            sample_rate: None,
            sample_format: None,
            bits_per_sample: None,
            frames_per_tick: None,
            stream_buffer_size: None,
            thread_priority: None,
            rt_audio: None,
        }
    }

    /// Reads a mixer configuration from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Mixer, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Mixer>()?)
    }

    /// Reads a mixer configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Mixer, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize::<Mixer>()?)
    }

    /// Overrides the device, e.g. from the command line.
    pub fn with_device(mut self, device: &str) -> Mixer {
        self.device = Some(device.to_string());
        self
    }

    pub fn device(&self) -> &str {
        self.device.as_deref().unwrap_or(DEFAULT_DEVICE)
    }

    pub fn channels(&self) -> usize {
        self.channels.unwrap_or(DEFAULT_CHANNELS)
    }

    pub fn output_channels(&self) -> u16 {
        self.output_channels.unwrap_or(DEFAULT_OUTPUT_CHANNELS)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    /// Returns the device sample format (default: Int).
    pub fn sample_format(&self) -> Result<SampleFormat, Box<dyn Error>> {
        match self.sample_format.as_deref() {
            Some(format) => SampleFormat::from_str(format),
            None => Ok(SampleFormat::Int),
        }
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample.unwrap_or(DEFAULT_BITS_PER_SAMPLE)
    }

    pub fn frames_per_tick(&self) -> usize {
        self.frames_per_tick.unwrap_or(DEFAULT_FRAMES_PER_TICK)
    }

    /// Returns the stream buffer size choice for cpal. When unset, the stream
    /// asks for one tick of frames per callback.
    pub fn stream_buffer_size(&self) -> Result<StreamBufferSize, Box<dyn Error>> {
        match self.stream_buffer_size.as_deref() {
            Some(size) => StreamBufferSize::from_str(size),
            None => Ok(StreamBufferSize::Fixed(
                u32::try_from(self.frames_per_tick()).unwrap_or(u32::MAX),
            )),
        }
    }

    pub fn thread_priority(&self) -> u8 {
        self.thread_priority.unwrap_or(DEFAULT_THREAD_PRIORITY)
    }

    pub fn rt_audio(&self) -> bool {
        self.rt_audio.unwrap_or(true)
    }

    /// Validates the settings and builds the mixer configuration from them.
    pub fn to_mixer_config(&self) -> Result<MixerConfig, ConfigError> {
        let invalid = |e: Box<dyn Error>| ConfigError::Invalid(e.to_string());

        let format = TargetFormat::new(
            self.sample_rate(),
            self.sample_format().map_err(invalid)?,
            self.bits_per_sample(),
        )
        .map_err(invalid)?;
        self.stream_buffer_size().map_err(invalid)?;
        if self.thread_priority() > 99 {
            return Err(ConfigError::Invalid(format!(
                "Thread priority must be between 0 and 99, got {}",
                self.thread_priority()
            )));
        }

        MixerConfig::new(
            self.channels(),
            self.output_channels(),
            format,
            self.frames_per_tick(),
        )
        .map_err(invalid)
    }
}
