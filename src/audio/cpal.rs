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
use std::{error::Error, fmt, sync::Arc, thread};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thread_priority::ThreadPriorityValue;
use tracing::{error, info, span, Level};

use super::thread_priority::{callback_thread_priority, configure_audio_thread_priority};
use super::{OutputStream, SampleFormat, StreamStats};
use crate::config::{self, StreamBufferSize};
use crate::mixer::MixEngine;

/// Device name that selects the default output of the default host.
const DEFAULT_DEVICE: &str = "default";

/// A small wrapper around a cpal::Device with the stream settings from the
/// mixer configuration.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The maximum number of channels the device supports.
    max_channels: u16,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
    /// How the stream buffer size is chosen.
    buffer_size: StreamBufferSize,
    /// Priority of the callback thread.
    thread_priority: u8,
    /// Whether to attempt SCHED_FIFO for the callback thread.
    rt_audio: bool,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}

/// Builds the data callback for one sample type. The engine renders into an
/// i16 scratch block which is then converted to the device type.
fn create_callback<T>(
    mut engine: MixEngine,
    stats: Arc<StreamStats>,
    priority: ThreadPriorityValue,
    rt_audio: bool,
) -> impl FnMut(&mut [T], &cpal::OutputCallbackInfo) + Send + 'static
where
    T: cpal::SizedSample + cpal::FromSample<i16>,
{
    let config = engine.config();
    let mut scratch = vec![0i16; config.frames_per_tick() * config.output_channels() as usize];
    let mut priority_set = false;

    move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
        configure_audio_thread_priority(priority, rt_audio, &mut priority_set);

        // Only grows if the backend hands us a larger buffer than expected.
        if scratch.len() < data.len() {
            scratch.resize(data.len(), 0);
        }
        let block = &mut scratch[..data.len()];
        engine.render(block);

        for (dst, &src) in data.iter_mut().zip(block.iter()) {
            *dst = T::from_sample(src);
        }
        stats.record(block);
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    stream_config: &cpal::StreamConfig,
    engine: MixEngine,
    stats: Arc<StreamStats>,
    priority: ThreadPriorityValue,
    rt_audio: bool,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + cpal::FromSample<i16>,
{
    let mut callback = create_callback::<T>(engine, stats, priority, rt_audio);
    device.build_output_stream(
        stream_config,
        move |data: &mut [T], info: &cpal::OutputCallbackInfo| {
            callback(data, info);
        },
        |err| error!("CPAL output stream error: {}", err),
        None,
    )
}

impl Device {
    /// Lists cpal devices and produces the Device trait.
    pub fn list() -> Result<Vec<Box<dyn super::Device>>, Box<dyn Error>> {
        Ok(Device::list_cpal_devices()?
            .into_iter()
            .map(|device| {
                let device: Box<dyn super::Device> = Box::new(device);
                device
            })
            .collect())
    }

    fn from_cpal(host_id: cpal::HostId, device: cpal::Device) -> Option<Device> {
        let max_channels = device
            .supported_output_configs()
            .ok()?
            .map(|config| config.channels())
            .max()
            .unwrap_or(0);
        if max_channels == 0 {
            return None;
        }

        Some(Device {
            name: device.name().ok()?,
            max_channels,
            host_id,
            device,
            buffer_size: StreamBufferSize::Default,
            thread_priority: 70,
            rt_audio: true,
        })
    }

    /// Lists cpal output devices.
    fn list_cpal_devices() -> Result<Vec<Device>, Box<dyn Error>> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices: Vec<Device> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.output_devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            devices.extend(
                host_devices.filter_map(|device| Device::from_cpal(host_id, device)),
            );
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    /// Gets the cpal device named in the configuration. "default" selects the
    /// default output device of the default host.
    pub fn get(config: &config::Mixer) -> Result<Device, Box<dyn Error>> {
        let name = config.device();
        let device = if name == DEFAULT_DEVICE {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or("no default output device available")?;
            Device::from_cpal(host.id(), device)
        } else {
            Device::list_cpal_devices()?
                .into_iter()
                .find(|device| device.name.trim() == name)
        };

        match device {
            Some(mut device) => {
                device.buffer_size = config.stream_buffer_size()?;
                device.thread_priority = config.thread_priority();
                device.rt_audio = config.rt_audio();
                Ok(device)
            }
            None => Err(format!("no device found with name {}", name).into()),
        }
    }

    fn cpal_buffer_size(&self) -> Result<cpal::BufferSize, Box<dyn Error>> {
        Ok(match self.buffer_size {
            StreamBufferSize::Default => cpal::BufferSize::Default,
            StreamBufferSize::Fixed(frames) => cpal::BufferSize::Fixed(frames),
            StreamBufferSize::Min => match self.device.default_output_config()?.buffer_size() {
                cpal::SupportedBufferSize::Range { min, .. } => cpal::BufferSize::Fixed(*min),
                cpal::SupportedBufferSize::Unknown => cpal::BufferSize::Default,
            },
        })
    }
}

impl super::Device for Device {
    /// Opens an output stream on its own thread. cpal streams are not Send on
    /// every platform, so the stream lives and dies on that thread.
    fn start(&self, engine: MixEngine) -> Result<OutputStream, Box<dyn Error>> {
        let span = span!(Level::INFO, "start output (cpal)");
        let _enter = span.enter();

        let config = engine.config().clone();
        if self.max_channels < config.output_channels() {
            return Err(format!(
                "{} output channels requested, audio device {} only has {}",
                config.output_channels(),
                self.name,
                self.max_channels
            )
            .into());
        }

        let stream_config = cpal::StreamConfig {
            channels: config.output_channels(),
            sample_rate: cpal::SampleRate(config.sample_rate()),
            buffer_size: self.cpal_buffer_size()?,
        };
        let format = config.format().clone();
        let priority = callback_thread_priority(self.thread_priority)?;
        let rt_audio = self.rt_audio;

        info!(
            device = self.name,
            format = %format,
            channels = config.output_channels(),
            buffer_size = %self.buffer_size,
            "Opening output stream."
        );

        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), String>>(1);
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let stats = Arc::new(StreamStats::default());
        let thread_stats = stats.clone();
        let device = self.device.clone();

        let handle = thread::Builder::new()
            .name(format!("cpal-output-{}", self.name))
            .spawn(move || {
                let stream_result = match (format.sample_format, format.bits_per_sample) {
                    (SampleFormat::Float, _) => build_stream::<f32>(
                        &device,
                        &stream_config,
                        engine,
                        thread_stats,
                        priority,
                        rt_audio,
                    ),
                    (SampleFormat::Int, 32) => build_stream::<i32>(
                        &device,
                        &stream_config,
                        engine,
                        thread_stats,
                        priority,
                        rt_audio,
                    ),
                    (SampleFormat::Int, _) => build_stream::<i16>(
                        &device,
                        &stream_config,
                        engine,
                        thread_stats,
                        priority,
                        rt_audio,
                    ),
                };

                let stream = match stream_result {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(format!("Failed to create CPAL stream: {}", e)));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(format!("Failed to start CPAL stream: {}", e)));
                    return;
                }
                let _ = ready_tx.send(Ok(()));
                info!("CPAL output stream started successfully");

                // Keep the stream alive until asked to stop or the handle is gone.
                let _ = stop_rx.recv();
                drop(stream);
                info!("CPAL output stream stopped");
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(OutputStream::new(stop_tx, handle, stats)),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e.into())
            }
            Err(_) => {
                let _ = handle.join();
                Err("CPAL output thread exited before the stream started".into())
            }
        }
    }
}
