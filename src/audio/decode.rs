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

//! Decoding of sound files into memory.
//!
//! Sounds are short, so the whole file is decoded up front and handed to the
//! mixer as interleaved f32 samples.

use std::fs::File;
use std::io;
use std::path::Path;
use std::time::Duration;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, warn};

/// Errors raised while decoding a sound file.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("audio file error: {0}")]
    Audio(#[from] SymphoniaError),

    #[error("no audio track found")]
    NoTrack,

    #[error("unknown sample rate")]
    UnknownSampleRate,
}

/// A fully decoded sound.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedSound {
    /// Interleaved samples.
    samples: Vec<f32>,
    channel_count: u16,
    sample_rate: u32,
}

impl DecodedSound {
    /// Creates a decoded sound from interleaved samples.
    pub fn new(samples: Vec<f32>, channel_count: u16, sample_rate: u32) -> DecodedSound {
        DecodedSound {
            samples,
            channel_count,
            sample_rate,
        }
    }

    #[cfg(test)]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channel_count == 0 {
            return 0;
        }
        self.samples.len() / self.channel_count as usize
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Converts the sound to the target sample rate using linear interpolation.
    /// Good enough for one-shots; no filtering is applied.
    pub fn resample(self, target_rate: u32) -> DecodedSound {
        if self.sample_rate == target_rate || self.sample_rate == 0 || self.channel_count == 0 {
            return self;
        }

        let ratio = target_rate as f64 / self.sample_rate as f64;
        let channels = self.channel_count as usize;
        let target_frames = (self.frames() as f64 * ratio).ceil() as usize;
        let mut output = Vec::with_capacity(target_frames * channels);

        for target_frame in 0..target_frames {
            let source_pos = target_frame as f64 / ratio;
            let source_frame = source_pos.floor() as usize;
            let frac = source_pos.fract() as f32;

            for channel in 0..channels {
                let s0 = self
                    .samples
                    .get(source_frame * channels + channel)
                    .copied()
                    .unwrap_or(0.0);
                let s1 = self
                    .samples
                    .get((source_frame + 1) * channels + channel)
                    .copied()
                    .unwrap_or(s0);
                output.push(s0 + (s1 - s0) * frac);
            }
        }

        DecodedSound {
            samples: output,
            channel_count: self.channel_count,
            sample_rate: target_rate,
        }
    }

    /// Maps the sound onto `target` channels. Mono is copied to every output,
    /// anything going to mono is averaged, otherwise channels map one to one and
    /// extra outputs stay silent.
    pub fn remap_channels(self, target: u16) -> DecodedSound {
        if self.channel_count == target || self.channel_count == 0 || target == 0 {
            return self;
        }

        let from = self.channel_count as usize;
        let to = target as usize;
        let mut output = Vec::with_capacity(self.frames() * to);
        for frame in self.samples.chunks_exact(from) {
            if from == 1 {
                output.extend(std::iter::repeat(frame[0]).take(to));
            } else if to == 1 {
                output.push(frame.iter().sum::<f32>() / from as f32);
            } else {
                output.extend((0..to).map(|ch| frame.get(ch).copied().unwrap_or(0.0)));
            }
        }

        DecodedSound {
            samples: output,
            channel_count: target,
            sample_rate: self.sample_rate,
        }
    }
}

/// Decodes the file at `path` (WAV, MP3, FLAC, AAC/M4A and anything else
/// symphonia supports) into memory.
pub fn decode_file(path: &Path) -> Result<DecodedSound, DecodeError> {
    let file = File::open(path)
        .map_err(|e| io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let probed = get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoTrack)?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(DecodeError::UnknownSampleRate)?;
    let mut channel_count = track
        .codec_params
        .channels
        .map(|channels| channels.count() as u16)
        .unwrap_or(0);
    let mut decoder = get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                channel_count = spec.channels.count() as u16;
                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                warn!(path = ?path, err = e, "Skipping undecodable packet");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let sound = DecodedSound::new(samples, channel_count, sample_rate);
    debug!(
        path = ?path,
        channels = sound.channel_count(),
        sample_rate = sound.sample_rate(),
        duration_ms = sound.duration().as_millis(),
        "Decoded sound"
    );
    Ok(sound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::write_sine_wav;

    #[test]
    fn test_decode_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_sine_wav(&path, 44100, 2, 4410).unwrap();

        let sound = decode_file(&path).unwrap();
        assert_eq!(2, sound.channel_count());
        assert_eq!(44100, sound.sample_rate());
        assert_eq!(4410, sound.frames());
        assert_eq!(100, sound.duration().as_millis());
    }

    #[test]
    fn test_decode_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = decode_file(&dir.path().join("gone.wav"));
        assert!(matches!(result, Err(DecodeError::Io(_))));
    }

    #[test]
    fn test_decode_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.wav");
        std::fs::write(&path, b"definitely not audio").unwrap();
        assert!(decode_file(&path).is_err());
    }

    #[test]
    fn test_resample_length() {
        let samples: Vec<f32> = (0..4410)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin())
            .collect();
        let sound = DecodedSound::new(samples, 1, 44100).resample(48000);

        let expected_len = (4410.0_f64 * 48000.0 / 44100.0).ceil() as usize;
        assert_eq!(expected_len, sound.samples().len());
        assert_eq!(48000, sound.sample_rate());
    }

    #[test]
    fn test_resample_keeps_channels() {
        let samples = vec![1.0f32, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
        let sound = DecodedSound::new(samples, 2, 44100).resample(48000);

        assert_eq!(2, sound.channel_count());
        assert!((sound.samples()[0] - 1.0).abs() < 0.1);
        assert!((sound.samples()[1] + 1.0).abs() < 0.1);
    }

    #[test]
    fn test_remap_channels() {
        let mono = DecodedSound::new(vec![0.5, 0.25], 1, 48000).remap_channels(2);
        assert_eq!(vec![0.5, 0.5, 0.25, 0.25], mono.samples());

        let stereo = DecodedSound::new(vec![1.0, 0.0, 0.5, 0.5], 2, 48000).remap_channels(1);
        assert_eq!(vec![0.5, 0.5], stereo.samples());

        let wide = DecodedSound::new(vec![0.1, 0.2], 2, 48000).remap_channels(4);
        assert_eq!(vec![0.1, 0.2, 0.0, 0.0], wide.samples());
    }
}
