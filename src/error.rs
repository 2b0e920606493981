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
use std::path::PathBuf;

/// Errors surfaced by mixer operations. The mix tick itself never produces one.
#[derive(Debug, thiserror::Error)]
pub enum MixerError {
    #[error("Audio asset not found: {}", .0.display())]
    AssetNotFound(PathBuf),

    #[error("Unable to decode '{}': {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("Channel {channel} is out of range (mixer has {channels} channels)")]
    InvalidChannel { channel: usize, channels: usize },

    #[error("Audio buffer is still referenced by an active playback")]
    InUse,

    #[error("Unknown or released audio handle")]
    UnknownHandle,

    #[error("No free channel available")]
    NoFreeChannel,

    #[error("The mixer's render engine is already in use")]
    EngineInUse,
}

impl MixerError {
    /// Convenience constructor for decode failures.
    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> MixerError {
        MixerError::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
