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
use std::time::Duration;

/// An immutable, fully decoded buffer of interleaved signed 16-bit samples.
///
/// Buffers are shared between the store and any playback through an `Arc`,
/// so a chunk playing on several channels is held in memory only once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pcm {
    data: Vec<i16>,
    channels: u16,
    sample_rate: u32,
}

impl Pcm {
    /// Creates a buffer from interleaved samples.
    pub fn new(data: Vec<i16>, channels: u16, sample_rate: u32) -> Pcm {
        Pcm {
            data,
            channels,
            sample_rate,
        }
    }

    /// The interleaved sample data.
    pub fn samples(&self) -> &[i16] {
        &self.data
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn bits_per_sample(&self) -> u16 {
        16
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.data.len() / self.channels as usize
    }

    /// Length of one pass through the buffer.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<i16>()
    }
}
