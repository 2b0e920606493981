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

//! A small real-time channel mixer for sound effects and background music.
//!
//! Load chunks and music tracks into a [`Mixer`], play them on numbered
//! channels or the music stream, and drive the mix from an output
//! [`audio::Device`].

pub mod audio;
pub mod config;
pub mod error;
pub mod mixer;
pub mod samples;
#[cfg(test)]
mod testutil;

pub use error::MixerError;
pub use mixer::{LoopCount, MixEngine, Mixer, MixerConfig};
pub use samples::{ChunkHandle, MusicHandle};
