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
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::TryRecvError;
use tracing::{info, span, Level};

use super::{OutputStream, StreamStats};
use crate::mixer::MixEngine;

/// A mock device. Renders ticks at the real-time pace and discards them.
#[derive(Clone)]
pub struct Device {
    name: String,
}

impl Device {
    pub fn new(name: &str) -> Device {
        Device {
            name: name.to_string(),
        }
    }
}

impl super::Device for Device {
    fn start(&self, mut engine: MixEngine) -> Result<OutputStream, Box<dyn Error>> {
        let config = engine.config().clone();
        let block_samples = config.frames_per_tick() * config.output_channels() as usize;
        let period = Duration::from_secs_f64(
            config.frames_per_tick() as f64 / config.sample_rate() as f64,
        );

        info!(
            device = self.name,
            period = ?period,
            "Starting mock output."
        );

        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let stats = Arc::new(StreamStats::default());
        let thread_stats = stats.clone();
        let name = self.name.clone();

        let handle = thread::Builder::new()
            .name(format!("mock-output-{}", name))
            .spawn(move || {
                let span = span!(Level::INFO, "mock output", device = name);
                let _enter = span.enter();

                let mut block = vec![0i16; block_samples];
                let mut next_tick = Instant::now();
                loop {
                    match stop_rx.try_recv() {
                        Err(TryRecvError::Empty) => {}
                        Ok(()) | Err(TryRecvError::Disconnected) => break,
                    }

                    engine.render(&mut block);
                    thread_stats.record(&block);

                    // Ticks are scheduled on an absolute clock.
                    next_tick += period;
                    let now = Instant::now();
                    if next_tick > now {
                        spin_sleep::sleep(next_tick - now);
                    } else {
                        next_tick = now;
                    }
                }
            })?;

        Ok(OutputStream::new(stop_tx, handle, stats))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name,)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Device as _;
    use crate::mixer::{Mixer, MixerConfig};
    use crate::testutil::eventually;

    #[test]
    fn test_mock_renders_until_dropped() -> Result<(), Box<dyn Error>> {
        let config = MixerConfig::new(4, 2, Default::default(), 256)?;
        let mixer = Mixer::new(config);
        let device = Device::new("mock");

        let stream = device.start(mixer.engine()?)?;
        eventually(|| stream.ticks() >= 3, "Mock device never ticked");
        assert_eq!(stream.last_peak(), 0);

        drop(stream);
        Ok(())
    }
}
