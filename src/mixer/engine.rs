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

//! The per-tick render.
//!
//! Every tick sums all active channels and the music stream into an `i32`
//! accumulator and then saturates the result to `i16`. The controller and the
//! output thread share a single [`MixState`] lock, so a halt or volume change
//! is observed by the next tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::channel::ChannelPool;
use super::music::MusicState;
use super::MixerConfig;

/// Everything the mix tick reads and advances.
#[derive(Debug)]
pub struct MixState {
    pub(crate) channels: ChannelPool,
    pub(crate) music: MusicState,
}

impl MixState {
    pub fn new(channel_count: usize) -> Self {
        Self {
            channels: ChannelPool::new(channel_count),
            music: MusicState::new(),
        }
    }

    pub fn channels(&self) -> &ChannelPool {
        &self.channels
    }

    pub fn music(&self) -> &MusicState {
        &self.music
    }

    fn mix_into(&mut self, acc: &mut [i32]) {
        self.channels.mix_into(acc);
        self.music.mix_into(acc);
    }
}

/// A render handle for one output thread.
///
/// Rendering advances the shared cursors, so a mixer hands out at most one
/// engine at a time. Dropping the engine releases the claim.
pub struct MixEngine {
    state: Arc<Mutex<MixState>>,
    /// Reused between ticks so rendering does not allocate once warmed up.
    accumulator: Vec<i32>,
    config: MixerConfig,
    /// Set while this engine exists; cleared on drop.
    claimed: Arc<AtomicBool>,
}

impl MixEngine {
    pub(crate) fn new(
        state: Arc<Mutex<MixState>>,
        config: MixerConfig,
        claimed: Arc<AtomicBool>,
    ) -> Self {
        let accumulator = vec![0; config.frames_per_tick() * config.output_channels() as usize];
        Self {
            state,
            accumulator,
            config,
            claimed,
        }
    }

    pub fn config(&self) -> &MixerConfig {
        &self.config
    }

    /// Renders one tick into `out`, which holds interleaved frames in the
    /// output channel layout. Never fails.
    ///
    /// Only whole frames are mixed. Trailing samples of a partial frame are
    /// written as silence so every cursor stays frame aligned.
    pub fn render(&mut self, out: &mut [i16]) {
        let channels = self.config.output_channels() as usize;
        let len = out.len() - out.len() % channels;

        if self.accumulator.len() < len {
            self.accumulator.resize(len, 0);
        }
        let acc = &mut self.accumulator[..len];
        acc.fill(0);

        self.state.lock().mix_into(acc);

        let (frames, partial) = out.split_at_mut(len);
        for (sample, &mixed) in frames.iter_mut().zip(acc.iter()) {
            *sample = mixed.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        }
        partial.fill(0);
    }
}

impl Drop for MixEngine {
    fn drop(&mut self) {
        self.claimed.store(false, Ordering::Release);
    }
}
