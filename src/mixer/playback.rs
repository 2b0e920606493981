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
use std::sync::Arc;

use crate::samples::Pcm;

/// Unity gain.
pub const MAX_VOLUME: u8 = 255;

/// Clamps a caller-supplied volume into [0, 255].
pub fn clamp_volume(volume: i32) -> u8 {
    volume.clamp(0, MAX_VOLUME as i32) as u8
}

/// Scales a sample by `volume / 255` in i32 so the accumulator never overflows
/// before the final clip.
#[inline]
pub fn scale(sample: i16, volume: u8) -> i32 {
    sample as i32 * volume as i32 / MAX_VOLUME as i32
}

/// How many more passes a playback has left after the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCount {
    Finite(u32),
    Infinite,
}

impl From<i32> for LoopCount {
    /// 0 plays once, N plays N+1 times, any negative value loops forever.
    fn from(loops: i32) -> Self {
        if loops < 0 {
            LoopCount::Infinite
        } else {
            LoopCount::Finite(loops as u32)
        }
    }
}

impl LoopCount {
    /// Consumes one loop at the end of a pass. Returns false when playback is over.
    fn next_pass(&mut self) -> bool {
        match self {
            LoopCount::Infinite => true,
            LoopCount::Finite(0) => false,
            LoopCount::Finite(remaining) => {
                *remaining -= 1;
                true
            }
        }
    }
}

/// A buffer bound to a channel or the music stream, with its own cursor.
#[derive(Debug, Clone)]
pub struct Playback {
    pcm: Arc<Pcm>,
    /// Index of the next interleaved sample to read.
    cursor: usize,
    loops: LoopCount,
}

impl Playback {
    pub fn new(pcm: Arc<Pcm>, loops: LoopCount) -> Self {
        Self {
            pcm,
            cursor: 0,
            loops,
        }
    }

    pub fn pcm(&self) -> &Arc<Pcm> {
        &self.pcm
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn loops(&self) -> LoopCount {
        self.loops
    }

    /// Adds the next `acc.len()` samples, scaled by `volume`, into `acc`,
    /// wrapping or finishing at the end of each pass.
    ///
    /// Returns false once the playback is over; the caller deactivates it.
    /// An empty buffer or a cursor past the end also reports false so a
    /// broken playback is dropped instead of stalling the tick.
    pub fn mix_into(&mut self, acc: &mut [i32], volume: u8) -> bool {
        let data = self.pcm.samples();
        if data.is_empty() || self.cursor >= data.len() {
            return false;
        }

        let mut written = 0;
        while written < acc.len() {
            let count = (data.len() - self.cursor).min(acc.len() - written);
            let source = &data[self.cursor..self.cursor + count];

            if volume == MAX_VOLUME {
                for (out, &sample) in acc[written..written + count].iter_mut().zip(source) {
                    *out += sample as i32;
                }
            } else if volume > 0 {
                for (out, &sample) in acc[written..written + count].iter_mut().zip(source) {
                    *out += scale(sample, volume);
                }
            }

            written += count;
            self.cursor += count;

            if self.cursor == data.len() {
                self.cursor = 0;
                if !self.loops.next_pass() {
                    return false;
                }
            }
        }

        true
    }
}
