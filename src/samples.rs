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

//! Loaded audio assets.
//!
//! This module provides:
//! - Conversion of decoded files into the mixer's output layout
//! - Handle-keyed storage of chunks and music tracks
//! - The release policy for buffers that are still playing

mod loader;
mod pcm;
mod store;

pub use loader::SampleLoader;
pub use pcm::Pcm;
pub use store::{ChunkHandle, MusicHandle, SampleStore};
