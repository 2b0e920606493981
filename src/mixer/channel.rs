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

//! The fixed pool of sound effect channels.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::playback::{clamp_volume, LoopCount, Playback, MAX_VOLUME};
use crate::error::MixerError;
use crate::samples::Pcm;

/// One playback slot. Volume survives across plays; the playback does not.
#[derive(Debug, Clone)]
pub struct Channel {
    volume: u8,
    /// `None` while the channel is idle, so an idle channel never holds a
    /// buffer reference or a stale cursor.
    playback: Option<Playback>,
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            volume: MAX_VOLUME,
            playback: None,
        }
    }
}

impl Channel {
    pub fn is_active(&self) -> bool {
        self.playback.is_some()
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn playback(&self) -> Option<&Playback> {
        self.playback.as_ref()
    }
}

/// Channels addressed by index in `[0, len)`. The size is fixed when the
/// mixer is created.
pub struct ChannelPool {
    channels: Vec<Channel>,
}

impl ChannelPool {
    pub fn new(count: usize) -> Self {
        Self {
            channels: vec![Channel::default(); count],
        }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channel(&self, index: usize) -> Result<&Channel, MixerError> {
        let channels = self.channels.len();
        self.channels
            .get(index)
            .ok_or(MixerError::InvalidChannel {
                channel: index,
                channels,
            })
    }

    fn channel_mut(&mut self, index: usize) -> Result<&mut Channel, MixerError> {
        let channels = self.channels.len();
        self.channels
            .get_mut(index)
            .ok_or(MixerError::InvalidChannel {
                channel: index,
                channels,
            })
    }

    /// Binds a buffer to a channel, replacing whatever it was playing.
    pub fn allocate(
        &mut self,
        index: usize,
        pcm: Arc<Pcm>,
        loops: LoopCount,
    ) -> Result<(), MixerError> {
        let channel = self.channel_mut(index)?;
        if channel.playback.is_some() {
            debug!(channel = index, "Replacing active playback");
        }
        channel.playback = Some(Playback::new(pcm, loops));
        Ok(())
    }

    /// Stops a channel. Halting an idle channel is a no-op.
    pub fn halt(&mut self, index: usize) -> Result<(), MixerError> {
        self.channel_mut(index)?.playback = None;
        Ok(())
    }

    pub fn halt_all(&mut self) {
        for channel in self.channels.iter_mut() {
            channel.playback = None;
        }
    }

    /// Sets a channel's volume, clamped to [0, 255], and returns the previous one.
    pub fn set_volume(&mut self, index: usize, volume: i32) -> Result<u8, MixerError> {
        let channel = self.channel_mut(index)?;
        let previous = channel.volume;
        channel.volume = clamp_volume(volume);
        Ok(previous)
    }

    pub fn volume(&self, index: usize) -> Result<u8, MixerError> {
        Ok(self.channel(index)?.volume)
    }

    pub fn is_playing(&self, index: usize) -> Result<bool, MixerError> {
        Ok(self.channel(index)?.is_active())
    }

    pub fn playing_count(&self) -> usize {
        self.channels.iter().filter(|c| c.is_active()).count()
    }

    /// The lowest-numbered idle channel, if any.
    pub fn find_free_channel(&self) -> Option<usize> {
        self.channels.iter().position(|c| !c.is_active())
    }

    /// Mixes every active channel into `acc`, deactivating those that finish.
    pub(crate) fn mix_into(&mut self, acc: &mut [i32]) {
        for channel in self.channels.iter_mut() {
            let volume = channel.volume;
            let finished = match channel.playback.as_mut() {
                Some(playback) => !playback.mix_into(acc, volume),
                None => false,
            };
            if finished {
                channel.playback = None;
            }
        }
    }
}

impl fmt::Debug for ChannelPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelPool")
            .field("channels", &self.channels.len())
            .field("playing", &self.playing_count())
            .finish()
    }
}
