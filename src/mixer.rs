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

//! The mixer: a fixed pool of sound effect channels plus one music stream.
//!
//! [`Mixer`] is the control surface. It owns every loaded buffer and the
//! shared mix state. The output thread obtains the [`MixEngine`] through
//! [`Mixer::engine`] and renders ticks from the same state.

use std::error::Error;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::audio::format::TargetFormat;
use crate::error::MixerError;
use crate::samples::{ChunkHandle, MusicHandle, SampleLoader, SampleStore};

mod channel;
mod engine;
mod music;
mod playback;
#[cfg(test)]
mod tests;

pub use channel::{Channel, ChannelPool};
pub use engine::{MixEngine, MixState};
pub use music::MusicState;
pub use playback::{LoopCount, Playback, MAX_VOLUME};

/// Default number of sound effect channels.
pub const DEFAULT_CHANNELS: usize = 16;

/// Default number of interleaved output channels.
pub const DEFAULT_OUTPUT_CHANNELS: u16 = 2;

/// Default number of frames rendered per tick.
pub const DEFAULT_FRAMES_PER_TICK: usize = 1024;

/// The negotiated output format and channel layout. Fixed once the mixer is created.
#[derive(Debug, Clone, PartialEq)]
pub struct MixerConfig {
    channels: usize,
    output_channels: u16,
    format: TargetFormat,
    frames_per_tick: usize,
}

impl MixerConfig {
    pub fn new(
        channels: usize,
        output_channels: u16,
        format: TargetFormat,
        frames_per_tick: usize,
    ) -> Result<MixerConfig, Box<dyn Error>> {
        if channels == 0 {
            return Err("Mixer must have at least one channel".into());
        }
        if output_channels == 0 {
            return Err("Output must have at least one channel".into());
        }
        if frames_per_tick == 0 {
            return Err("Frames per tick must be greater than 0".into());
        }

        Ok(MixerConfig {
            channels,
            output_channels,
            format,
            frames_per_tick,
        })
    }

    /// Number of sound effect channels.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of interleaved output channels.
    pub fn output_channels(&self) -> u16 {
        self.output_channels
    }

    pub fn format(&self) -> &TargetFormat {
        &self.format
    }

    pub fn sample_rate(&self) -> u32 {
        self.format.sample_rate
    }

    pub fn frames_per_tick(&self) -> usize {
        self.frames_per_tick
    }
}

impl Default for MixerConfig {
    fn default() -> Self {
        MixerConfig {
            channels: DEFAULT_CHANNELS,
            output_channels: DEFAULT_OUTPUT_CHANNELS,
            format: TargetFormat::default(),
            frames_per_tick: DEFAULT_FRAMES_PER_TICK,
        }
    }
}

impl fmt::Display for MixerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {} output channels, {} mixer channels",
            self.format, self.output_channels, self.channels
        )
    }
}

/// Loads audio and controls playback.
///
/// Decoding happens on the calling thread before any lock is taken. The
/// store and the mix state are guarded separately and never locked at the
/// same time, so a load never stalls the output thread.
pub struct Mixer {
    config: MixerConfig,
    loader: SampleLoader,
    store: Mutex<SampleStore>,
    state: Arc<Mutex<MixState>>,
    engine_claimed: Arc<AtomicBool>,
}

impl Mixer {
    pub fn new(config: MixerConfig) -> Mixer {
        info!(
            sample_rate = config.sample_rate(),
            format = %config.format(),
            output_channels = config.output_channels(),
            channels = config.channels(),
            frames_per_tick = config.frames_per_tick(),
            "Mixer initialized"
        );

        Mixer {
            loader: SampleLoader::new(config.sample_rate(), config.output_channels()),
            store: Mutex::new(SampleStore::new()),
            state: Arc::new(Mutex::new(MixState::new(config.channels()))),
            engine_claimed: Arc::new(AtomicBool::new(false)),
            config,
        }
    }

    /// The output settings the mixer was created with.
    pub fn spec(&self) -> &MixerConfig {
        &self.config
    }

    /// Hands out the render handle for the output thread. Only one engine
    /// exists at a time; this fails with [`MixerError::EngineInUse`] until the
    /// previous one is dropped.
    pub fn engine(&self) -> Result<MixEngine, MixerError> {
        self.engine_claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| MixerError::EngineInUse)?;
        Ok(MixEngine::new(
            self.state.clone(),
            self.config.clone(),
            self.engine_claimed.clone(),
        ))
    }

    /// Loads a sound effect.
    pub fn load_wav(&self, path: &Path) -> Result<ChunkHandle, MixerError> {
        let pcm = self.loader.load(path)?;
        Ok(self.store.lock().insert_chunk(pcm))
    }

    /// Loads a music track.
    pub fn load_music(&self, path: &Path) -> Result<MusicHandle, MixerError> {
        let pcm = self.loader.load(path)?;
        Ok(self.store.lock().insert_music(pcm))
    }

    /// Frees a chunk. Fails with [`MixerError::InUse`] while it is playing.
    pub fn release_chunk(&self, chunk: ChunkHandle) -> Result<(), MixerError> {
        self.store.lock().release_chunk(chunk)
    }

    /// Frees a music track. Fails with [`MixerError::InUse`] while it is playing.
    pub fn release_music(&self, track: MusicHandle) -> Result<(), MixerError> {
        self.store.lock().release_music(track)
    }

    /// Plays a chunk on a channel, replacing whatever the channel was playing.
    /// `loops` of 0 plays once, N plays N+1 times and -1 loops until halted.
    pub fn play_channel(
        &self,
        chunk: ChunkHandle,
        channel: usize,
        loops: i32,
    ) -> Result<(), MixerError> {
        let pcm = self.store.lock().chunk(chunk)?;
        self.state
            .lock()
            .channels
            .allocate(channel, pcm, loops.into())?;
        debug!(%chunk, channel, loops, "Playing chunk");
        Ok(())
    }

    /// Plays a chunk on the lowest-numbered idle channel and returns it.
    pub fn play_any(&self, chunk: ChunkHandle, loops: i32) -> Result<usize, MixerError> {
        let pcm = self.store.lock().chunk(chunk)?;
        let mut state = self.state.lock();
        let channel = state
            .channels
            .find_free_channel()
            .ok_or(MixerError::NoFreeChannel)?;
        state.channels.allocate(channel, pcm, loops.into())?;
        debug!(%chunk, channel, loops, "Playing chunk on free channel");
        Ok(channel)
    }

    /// Like [`Mixer::play_any`], but sets the channel volume under the same
    /// lock so the first tick already plays at `volume`.
    pub fn play_any_with_volume(
        &self,
        chunk: ChunkHandle,
        loops: i32,
        volume: i32,
    ) -> Result<usize, MixerError> {
        let pcm = self.store.lock().chunk(chunk)?;
        let mut state = self.state.lock();
        let channel = state
            .channels
            .find_free_channel()
            .ok_or(MixerError::NoFreeChannel)?;
        state.channels.set_volume(channel, volume)?;
        state.channels.allocate(channel, pcm, loops.into())?;
        debug!(%chunk, channel, loops, volume, "Playing chunk on free channel");
        Ok(channel)
    }

    /// Stops a channel. Halting an idle channel is not an error.
    pub fn halt_channel(&self, channel: usize) -> Result<(), MixerError> {
        self.state.lock().channels.halt(channel)
    }

    pub fn halt_all_channels(&self) {
        self.state.lock().channels.halt_all();
    }

    /// Plays a music track, replacing the current one.
    pub fn play_music(&self, track: MusicHandle, loops: i32) -> Result<(), MixerError> {
        let pcm = self.store.lock().music(track)?;
        self.state.lock().music.play(track, pcm, loops.into());
        debug!(%track, loops, "Playing music");
        Ok(())
    }

    pub fn halt_music(&self) {
        self.state.lock().music.halt();
    }

    /// Sets a channel's volume (clamped to [0, 255]) and returns the previous one.
    pub fn volume_chunk(&self, channel: usize, volume: i32) -> Result<u8, MixerError> {
        self.state.lock().channels.set_volume(channel, volume)
    }

    pub fn chunk_volume(&self, channel: usize) -> Result<u8, MixerError> {
        self.state.lock().channels.volume(channel)
    }

    /// Sets the music volume (clamped to [0, 255]) and returns the previous one.
    pub fn volume_music(&self, volume: i32) -> u8 {
        self.state.lock().music.set_volume(volume)
    }

    pub fn music_volume(&self) -> u8 {
        self.state.lock().music.volume()
    }

    pub fn is_playing(&self, channel: usize) -> Result<bool, MixerError> {
        self.state.lock().channels.is_playing(channel)
    }

    /// Number of channels currently playing.
    pub fn playing_count(&self) -> usize {
        self.state.lock().channels.playing_count()
    }

    pub fn music_playing(&self) -> bool {
        self.state.lock().music.is_playing()
    }
}

impl fmt::Debug for Mixer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let loaded = self.store.lock().len();
        f.debug_struct("Mixer")
            .field("config", &self.config)
            .field("loaded", &loaded)
            .field("playing", &self.playing_count())
            .field("music_playing", &self.music_playing())
            .finish()
    }
}
