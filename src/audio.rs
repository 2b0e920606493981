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
use std::{
    error::Error,
    fmt,
    sync::{
        atomic::{AtomicU32, AtomicU64, Ordering},
        Arc,
    },
    thread,
};

use tracing::{debug, error};

use crate::config;
use crate::mixer::MixEngine;

pub mod cpal;
pub mod decode;
pub mod format;
pub mod mock;
mod thread_priority;

pub use format::{SampleFormat, TargetFormat};

/// An output sink that drives a mix engine on its own thread.
pub trait Device: fmt::Display + std::marker::Send + std::marker::Sync {
    /// Starts rendering ticks from `engine`. Rendering continues until the
    /// returned stream is dropped.
    fn start(&self, engine: MixEngine) -> Result<OutputStream, Box<dyn Error>>;
}

/// Counters updated by the output thread after every tick.
#[derive(Debug, Default)]
pub(crate) struct StreamStats {
    ticks: AtomicU64,
    last_peak: AtomicU32,
}

impl StreamStats {
    /// Records a rendered block.
    #[inline]
    pub(crate) fn record(&self, block: &[i16]) {
        let peak = block
            .iter()
            .map(|sample| sample.unsigned_abs())
            .max()
            .unwrap_or(0);
        self.last_peak.store(peak as u32, Ordering::Relaxed);
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }
}

/// A running output. Dropping it stops the output thread and waits for it.
pub struct OutputStream {
    stop: Option<crossbeam_channel::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
    stats: Arc<StreamStats>,
}

impl OutputStream {
    pub(crate) fn new(
        stop: crossbeam_channel::Sender<()>,
        thread: thread::JoinHandle<()>,
        stats: Arc<StreamStats>,
    ) -> OutputStream {
        OutputStream {
            stop: Some(stop),
            thread: Some(thread),
            stats,
        }
    }

    /// Number of ticks rendered so far.
    pub fn ticks(&self) -> u64 {
        self.stats.ticks.load(Ordering::Relaxed)
    }

    /// Largest absolute sample value of the most recent tick.
    pub fn last_peak(&self) -> u32 {
        self.stats.last_peak.load(Ordering::Relaxed)
    }
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        // The sender is dropped here too, so a disconnect also stops the thread.
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Output thread panicked");
            }
        }
        debug!(ticks = self.ticks(), "Output stream stopped");
    }
}

/// Lists devices known to cpal.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, Box<dyn Error>> {
    cpal::Device::list()
}

/// Gets the device named in the mixer configuration. Names starting with
/// `mock` select the headless mock device.
pub fn get_device(config: &config::Mixer) -> Result<Arc<dyn Device>, Box<dyn Error>> {
    let device = config.device();
    if device.starts_with("mock") {
        return Ok(Arc::new(mock::Device::new(device)));
    };

    Ok(Arc::new(cpal::Device::get(config)?))
}
