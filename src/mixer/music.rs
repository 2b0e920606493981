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

use tracing::debug;

use super::playback::{clamp_volume, LoopCount, Playback, MAX_VOLUME};
use crate::samples::{MusicHandle, Pcm};

/// The single background music slot. Starting a track replaces the previous one.
#[derive(Debug)]
pub struct MusicState {
    volume: u8,
    current: Option<(MusicHandle, Playback)>,
}

impl Default for MusicState {
    fn default() -> Self {
        Self {
            volume: MAX_VOLUME,
            current: None,
        }
    }
}

impl MusicState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn play(&mut self, handle: MusicHandle, pcm: Arc<Pcm>, loops: LoopCount) {
        if let Some((previous, _)) = &self.current {
            debug!(%previous, next = %handle, "Replacing music");
        }
        self.current = Some((handle, Playback::new(pcm, loops)));
    }

    /// Stops the music. A no-op when nothing is playing.
    pub fn halt(&mut self) {
        self.current = None;
    }

    /// Sets the music volume, clamped to [0, 255], and returns the previous one.
    pub fn set_volume(&mut self, volume: i32) -> u8 {
        let previous = self.volume;
        self.volume = clamp_volume(volume);
        previous
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn is_playing(&self) -> bool {
        self.current.is_some()
    }

    /// The handle of the track currently playing.
    pub fn current(&self) -> Option<MusicHandle> {
        self.current.as_ref().map(|(handle, _)| *handle)
    }

    pub(crate) fn mix_into(&mut self, acc: &mut [i32]) {
        let volume = self.volume;
        let finished = match self.current.as_mut() {
            Some((_, playback)) => !playback.mix_into(acc, volume),
            None => false,
        };
        if finished {
            self.current = None;
        }
    }
}
