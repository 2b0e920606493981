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
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::*;
use crate::audio::{self, Device as _};
use crate::testutil::{eventually, write_constant_wav, write_wav};

/// Frames in every fixture written by `fixture`. Tests render blocks of the
/// same size so one tick is exactly one pass.
const FIXTURE_FRAMES: usize = 4;

fn fixture(dir: &TempDir, name: &str, value: i16) -> Result<PathBuf, Box<dyn Error>> {
    let path = dir.path().join(name);
    write_constant_wav(&path, value, FIXTURE_FRAMES, 44100)?;
    Ok(path)
}

fn small_mixer(channels: usize) -> Mixer {
    let config = MixerConfig::new(channels, 2, Default::default(), FIXTURE_FRAMES)
        .expect("valid mixer config");
    Mixer::new(config)
}

/// Renders one pass-length block.
fn tick(engine: &mut MixEngine) -> Vec<i16> {
    let mut out = vec![0; FIXTURE_FRAMES * 2];
    engine.render(&mut out);
    out
}

#[test]
fn test_explosion_scenario() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let mixer = small_mixer(8);
    let mut engine = mixer.engine()?;
    let explosion = mixer.load_wav(&fixture(&dir, "explosion.wav", 1000)?)?;

    mixer.volume_chunk(0, 128)?;
    mixer.play_channel(explosion, 0, 0)?;
    assert!(mixer.is_playing(0)?);
    assert_eq!(tick(&mut engine), vec![501; 8]);

    assert_eq!(mixer.volume_chunk(0, 255)?, 128);
    mixer.play_channel(explosion, 0, -1)?;
    assert_eq!(tick(&mut engine), vec![1000; 8]);

    mixer.halt_channel(0)?;
    assert!(!mixer.is_playing(0)?);
    assert_eq!(tick(&mut engine), vec![0; 8]);
    Ok(())
}

#[test]
fn test_halt_every_channel() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let mixer = small_mixer(4);
    let mut engine = mixer.engine()?;
    let chunk = mixer.load_wav(&fixture(&dir, "blip.wav", 100)?)?;

    for channel in 0..4 {
        mixer.play_channel(chunk, channel, -1)?;
        tick(&mut engine);
        mixer.halt_channel(channel)?;
        tick(&mut engine);
        assert!(!mixer.is_playing(channel)?);
    }

    // Halting twice, or halting an idle channel, is fine.
    mixer.halt_channel(0)?;
    mixer.halt_channel(0)?;
    assert!(matches!(
        mixer.halt_channel(4),
        Err(MixerError::InvalidChannel { channel: 4, .. })
    ));
    Ok(())
}

#[test]
fn test_volume_query_and_clamp() -> Result<(), Box<dyn Error>> {
    let mixer = small_mixer(2);

    for volume in [0, 1, 64, 128, 254, 255] {
        mixer.volume_chunk(1, volume)?;
        assert_eq!(mixer.chunk_volume(1)? as i32, volume);
    }

    mixer.volume_chunk(1, 1000)?;
    assert_eq!(mixer.chunk_volume(1)?, 255);
    mixer.volume_chunk(1, -1)?;
    assert_eq!(mixer.chunk_volume(1)?, 0);

    assert_eq!(mixer.music_volume(), 255);
    assert_eq!(mixer.volume_music(300), 255);
    assert_eq!(mixer.volume_music(12), 255);
    assert_eq!(mixer.music_volume(), 12);

    assert!(mixer.volume_chunk(2, 10).is_err());
    assert!(mixer.chunk_volume(2).is_err());
    Ok(())
}

#[test]
fn test_missing_assets() {
    let mixer = small_mixer(2);
    let missing = Path::new("/definitely/not/here/explosion.wav");

    assert!(matches!(
        mixer.load_wav(missing),
        Err(MixerError::AssetNotFound(_))
    ));
    assert!(matches!(
        mixer.load_music(missing),
        Err(MixerError::AssetNotFound(_))
    ));
}

#[test]
fn test_corrupt_asset() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("corrupt.wav");
    std::fs::write(&path, b"this is not audio at all")?;

    let mixer = small_mixer(2);
    assert!(matches!(
        mixer.load_wav(&path),
        Err(MixerError::Decode { .. })
    ));
    Ok(())
}

#[test]
fn test_loop_passes() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let mixer = small_mixer(2);
    let mut engine = mixer.engine()?;
    let chunk = mixer.load_wav(&fixture(&dir, "loop.wav", 300)?)?;

    for loops in [0, 1, 3] {
        mixer.play_channel(chunk, 0, loops)?;
        let mut passes = 0;
        while mixer.is_playing(0)? {
            assert_eq!(tick(&mut engine), vec![300; 8]);
            passes += 1;
            assert!(passes <= 10, "playback with {} loops never ended", loops);
        }
        assert_eq!(passes, loops + 1);
        assert_eq!(tick(&mut engine), vec![0; 8]);
    }

    mixer.play_channel(chunk, 0, -1)?;
    for _ in 0..200 {
        assert_eq!(tick(&mut engine), vec![300; 8]);
    }
    assert!(mixer.is_playing(0)?);
    Ok(())
}

#[test]
fn test_independent_cursors() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("ramp.wav");
    write_wav(&path, &[1, 2, 3, 4, 5, 6, 7, 8], 1, 44100)?;

    let config = MixerConfig::new(2, 1, Default::default(), 2)?;
    let mixer = Mixer::new(config);
    let mut engine = mixer.engine()?;
    let chunk = mixer.load_wav(&path)?;

    mixer.play_channel(chunk, 0, 0)?;
    let mut out = vec![0; 2];
    engine.render(&mut out);
    assert_eq!(out, vec![1, 2]);

    mixer.play_channel(chunk, 1, 0)?;
    engine.render(&mut out);
    assert_eq!(out, vec![3 + 1, 4 + 2]);

    mixer.halt_channel(0)?;
    assert!(mixer.is_playing(1)?);
    engine.render(&mut out);
    assert_eq!(out, vec![3, 4]);
    Ok(())
}

#[test]
fn test_infinite_music_halt() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let mixer = small_mixer(2);
    let mut engine = mixer.engine()?;
    let track = mixer.load_music(&fixture(&dir, "theme.wav", 2000)?)?;
    let chunk = mixer.load_wav(&fixture(&dir, "step.wav", 5)?)?;

    mixer.play_channel(chunk, 1, -1)?;
    mixer.play_music(track, -1)?;
    for _ in 0..25 {
        assert_eq!(tick(&mut engine), vec![2005; 8]);
    }

    mixer.halt_music();
    assert!(!mixer.music_playing());
    assert!(mixer.is_playing(1)?);
    assert_eq!(tick(&mut engine), vec![5; 8]);

    // Music volume applies only to the music stream.
    mixer.play_music(track, 0)?;
    mixer.volume_music(0);
    assert_eq!(tick(&mut engine), vec![5; 8]);
    assert!(!mixer.music_playing());
    Ok(())
}

#[test]
fn test_release_policy() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let mixer = small_mixer(2);
    let chunk = mixer.load_wav(&fixture(&dir, "release.wav", 1)?)?;
    let track = mixer.load_music(&fixture(&dir, "release_music.wav", 1)?)?;

    mixer.play_channel(chunk, 0, -1)?;
    mixer.play_music(track, -1)?;
    assert!(matches!(mixer.release_chunk(chunk), Err(MixerError::InUse)));
    assert!(matches!(mixer.release_music(track), Err(MixerError::InUse)));

    mixer.halt_channel(0)?;
    mixer.halt_music();
    mixer.release_chunk(chunk)?;
    mixer.release_music(track)?;

    assert!(matches!(
        mixer.play_channel(chunk, 0, 0),
        Err(MixerError::UnknownHandle)
    ));
    assert!(matches!(
        mixer.play_music(track, 0),
        Err(MixerError::UnknownHandle)
    ));
    assert!(matches!(
        mixer.release_chunk(chunk),
        Err(MixerError::UnknownHandle)
    ));
    Ok(())
}

#[test]
fn test_release_after_natural_end() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let mixer = small_mixer(1);
    let mut engine = mixer.engine()?;
    let chunk = mixer.load_wav(&fixture(&dir, "once.wav", 1)?)?;

    mixer.play_channel(chunk, 0, 0)?;
    tick(&mut engine);
    assert!(!mixer.is_playing(0)?);
    mixer.release_chunk(chunk)?;
    Ok(())
}

#[test]
fn test_play_any() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let mixer = small_mixer(3);
    let chunk = mixer.load_wav(&fixture(&dir, "any.wav", 1)?)?;

    assert_eq!(mixer.play_any(chunk, -1)?, 0);
    mixer.play_channel(chunk, 2, -1)?;
    assert_eq!(mixer.play_any(chunk, -1)?, 1);
    assert!(matches!(
        mixer.play_any(chunk, -1),
        Err(MixerError::NoFreeChannel)
    ));
    assert_eq!(mixer.playing_count(), 3);

    mixer.halt_all_channels();
    assert_eq!(mixer.playing_count(), 0);
    assert_eq!(mixer.play_any(chunk, 0)?, 0);
    Ok(())
}

#[test]
fn test_play_any_with_volume_first_tick() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let mixer = small_mixer(2);
    let mut engine = mixer.engine()?;
    let chunk = mixer.load_wav(&fixture(&dir, "quiet.wav", 1000)?)?;

    let channel = mixer.play_any_with_volume(chunk, 0, 128)?;
    assert_eq!(channel, 0);
    assert_eq!(mixer.chunk_volume(channel)?, 128);
    assert_eq!(tick(&mut engine), vec![501; 8]);

    // The volume is clamped the same way as volume_chunk.
    let channel = mixer.play_any_with_volume(chunk, -1, 900)?;
    assert_eq!(channel, 0);
    assert_eq!(mixer.chunk_volume(channel)?, 255);

    mixer.play_channel(chunk, 1, -1)?;
    assert!(matches!(
        mixer.play_any_with_volume(chunk, 0, 10),
        Err(MixerError::NoFreeChannel)
    ));
    // A failed play leaves the busy channels' volumes alone.
    assert_eq!(mixer.chunk_volume(1)?, 255);
    Ok(())
}

#[test]
fn test_single_engine() -> Result<(), Box<dyn Error>> {
    let mixer = small_mixer(1);

    let engine = mixer.engine()?;
    assert!(matches!(mixer.engine(), Err(MixerError::EngineInUse)));

    drop(engine);
    let _engine = mixer.engine()?;
    Ok(())
}

#[test]
fn test_full_scale_channels_clip() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let mixer = small_mixer(4);
    let mut engine = mixer.engine()?;
    let high = mixer.load_wav(&fixture(&dir, "high.wav", i16::MAX)?)?;
    let low = mixer.load_wav(&fixture(&dir, "low.wav", i16::MIN)?)?;

    mixer.play_channel(high, 0, 0)?;
    mixer.play_channel(high, 1, 0)?;
    assert_eq!(tick(&mut engine), vec![i16::MAX; 8]);

    mixer.play_channel(low, 0, 0)?;
    mixer.play_channel(low, 1, 0)?;
    mixer.play_channel(low, 2, 0)?;
    assert_eq!(tick(&mut engine), vec![i16::MIN; 8]);
    Ok(())
}

#[test]
fn test_mixer_config_validation() {
    assert!(MixerConfig::new(0, 2, Default::default(), 1024).is_err());
    assert!(MixerConfig::new(16, 0, Default::default(), 1024).is_err());
    assert!(MixerConfig::new(16, 2, Default::default(), 0).is_err());

    let config = MixerConfig::default();
    assert_eq!(config.channels(), 16);
    assert_eq!(config.output_channels(), 2);
    assert_eq!(config.sample_rate(), 44100);
    assert_eq!(config.frames_per_tick(), 1024);
    assert_eq!(Mixer::new(config.clone()).spec(), &config);
}

#[test]
fn test_mock_device_observes_halt() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let mixer = small_mixer(2);
    let chunk = mixer.load_wav(&fixture(&dir, "hum.wav", 700)?)?;

    let device = audio::mock::Device::new("mock-device");
    let stream = device.start(mixer.engine()?)?;

    mixer.play_channel(chunk, 0, -1)?;
    eventually(
        || stream.last_peak() == 700,
        "Mock device never rendered the playing channel",
    );

    mixer.halt_channel(0)?;
    let halted_at = stream.ticks();
    eventually(
        || stream.ticks() > halted_at + 1 && stream.last_peak() == 0,
        "Mock device kept rendering a halted channel",
    );
    assert!(!mixer.is_playing(0)?);

    drop(stream);
    Ok(())
}
