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
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use super::pcm::Pcm;
use crate::error::MixerError;

/// Global handle counter, shared by chunks and music so handles from
/// different mixers never collide.
static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies a loaded sound effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkHandle(u64);

/// Identifies a loaded music track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MusicHandle(u64);

impl fmt::Display for ChunkHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunk#{}", self.0)
    }
}

impl fmt::Display for MusicHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "music#{}", self.0)
    }
}

fn next_id() -> u64 {
    NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Owns every loaded buffer until it is explicitly released.
///
/// The store keeps one reference to each buffer. Playbacks hold the others,
/// so a strong count above one means the buffer is bound to a channel or the
/// music stream and cannot be released yet.
#[derive(Default)]
pub struct SampleStore {
    chunks: HashMap<ChunkHandle, Arc<Pcm>>,
    music: HashMap<MusicHandle, Arc<Pcm>>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of a converted chunk.
    pub fn insert_chunk(&mut self, pcm: Pcm) -> ChunkHandle {
        let handle = ChunkHandle(next_id());
        self.chunks.insert(handle, Arc::new(pcm));
        debug!(%handle, "Chunk stored");
        handle
    }

    /// Takes ownership of a converted music track.
    pub fn insert_music(&mut self, pcm: Pcm) -> MusicHandle {
        let handle = MusicHandle(next_id());
        self.music.insert(handle, Arc::new(pcm));
        debug!(%handle, "Music stored");
        handle
    }

    pub fn chunk(&self, handle: ChunkHandle) -> Result<Arc<Pcm>, MixerError> {
        self.chunks
            .get(&handle)
            .cloned()
            .ok_or(MixerError::UnknownHandle)
    }

    pub fn music(&self, handle: MusicHandle) -> Result<Arc<Pcm>, MixerError> {
        self.music
            .get(&handle)
            .cloned()
            .ok_or(MixerError::UnknownHandle)
    }

    /// Frees a chunk. Fails with `InUse` while any channel is playing it.
    pub fn release_chunk(&mut self, handle: ChunkHandle) -> Result<(), MixerError> {
        let pcm = self.chunks.get(&handle).ok_or(MixerError::UnknownHandle)?;
        if Arc::strong_count(pcm) > 1 {
            warn!(%handle, "Refusing to release chunk that is still playing");
            return Err(MixerError::InUse);
        }
        self.chunks.remove(&handle);
        debug!(%handle, "Chunk released");
        Ok(())
    }

    /// Frees a music track. Fails with `InUse` while it is the playing track.
    pub fn release_music(&mut self, handle: MusicHandle) -> Result<(), MixerError> {
        let pcm = self.music.get(&handle).ok_or(MixerError::UnknownHandle)?;
        if Arc::strong_count(pcm) > 1 {
            warn!(%handle, "Refusing to release music that is still playing");
            return Err(MixerError::InUse);
        }
        self.music.remove(&handle);
        debug!(%handle, "Music released");
        Ok(())
    }

    /// Number of loaded chunks and music tracks.
    pub fn len(&self) -> usize {
        self.chunks.len() + self.music.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the total memory used by stored buffers.
    pub fn memory_usage(&self) -> usize {
        self.chunks
            .values()
            .chain(self.music.values())
            .map(|pcm| pcm.memory_size())
            .sum()
    }
}

impl fmt::Debug for SampleStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleStore")
            .field("chunks", &self.chunks.len())
            .field("music", &self.music.len())
            .field("total_memory_kb", &(self.memory_usage() / 1024))
            .finish()
    }
}
