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
use std::error::Error;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use chunkmix::{audio, config, Mixer};
use clap::{crate_version, Args, Parser, Subcommand};
use duration_string::DurationString;
use tracing::info;

/// How often the CLI checks whether playback has finished.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A small real-time channel mixer."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

/// Options shared by every command that opens an output.
#[derive(Args)]
struct OutputArgs {
    /// The path to a YAML mixer configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// The output device. Overrides the configuration.
    #[arg(short, long)]
    device: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Plays one or more sound effects, each on its own channel.
    Play {
        #[command(flatten)]
        output: OutputArgs,
        /// How many extra passes each file plays.
        #[arg(short, long, default_value_t = 0)]
        loops: u32,
        /// Channel volume from 0 to 255.
        #[arg(short, long, default_value_t = 255)]
        volume: i32,
        /// The files to play.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Plays a music track.
    Music {
        #[command(flatten)]
        output: OutputArgs,
        /// How many extra passes to play. Negative values loop until the duration elapses.
        #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
        loops: i32,
        /// Music volume from 0 to 255.
        #[arg(short, long, default_value_t = 255)]
        volume: i32,
        /// Stops playback after this long, e.g. "30s" or "2m".
        #[arg(short = 't', long)]
        duration: Option<String>,
        /// The file to play.
        path: PathBuf,
    },
}

/// Builds the mixer and its output from the command line options.
fn open_output(
    args: &OutputArgs,
) -> Result<(Mixer, std::sync::Arc<dyn audio::Device>), Box<dyn Error>> {
    let mut mixer_config = match &args.config {
        Some(path) => config::Mixer::deserialize(path)?,
        None => config::Mixer::new("default"),
    };
    if let Some(device) = &args.device {
        mixer_config = mixer_config.with_device(device);
    }

    let mixer = Mixer::new(mixer_config.to_mixer_config()?);
    let device = audio::get_device(&mixer_config)?;
    Ok((mixer, device))
}

fn wait_until<F>(deadline: Option<Instant>, mut done: F)
where
    F: FnMut() -> bool,
{
    while !done() {
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return;
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Play {
            output,
            loops,
            volume,
            files,
        } => {
            let (mixer, device) = open_output(&output)?;

            let chunks = files
                .iter()
                .map(|path| mixer.load_wav(path))
                .collect::<Result<Vec<_>, _>>()?;

            let stream = device.start(mixer.engine()?)?;
            for (chunk, path) in chunks.iter().zip(files.iter()) {
                let loops = i32::try_from(loops)?;
                let channel = mixer.play_any_with_volume(*chunk, loops, volume)?;
                info!(path = ?path, channel, "Playing.");
            }

            wait_until(None, || mixer.playing_count() == 0);
            drop(stream);

            for chunk in chunks {
                mixer.release_chunk(chunk)?;
            }
        }
        Commands::Music {
            output,
            loops,
            volume,
            duration,
            path,
        } => {
            let duration: Option<Duration> = match duration {
                Some(duration) => Some(DurationString::from_string(duration)?.into()),
                None => None,
            };
            if loops < 0 && duration.is_none() {
                return Err("infinite music loops need a --duration".into());
            }

            let (mixer, device) = open_output(&output)?;
            let track = mixer.load_music(&path)?;
            mixer.volume_music(volume);

            let stream = device.start(mixer.engine()?)?;
            mixer.play_music(track, loops)?;
            info!(path = ?path, loops, "Playing music.");

            let deadline = duration.map(|duration| Instant::now() + duration);
            wait_until(deadline, || !mixer.music_playing());
            mixer.halt_music();
            drop(stream);

            mixer.release_music(track)?;
        }
    }

    Ok(())
}
