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
// Mixing of concurrently playing sounds, independent of the audio backend.
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use super::decode::DecodedSound;

static NEXT_VOICE_ID: AtomicU64 = AtomicU64::new(1);

/// A sound that is currently playing.
struct Voice {
    id: u64,
    /// Interleaved samples already in the mixer's layout.
    samples: Vec<f32>,
    /// Next sample index to read.
    position: usize,
}

impl Voice {
    fn is_finished(&self) -> bool {
        self.position >= self.samples.len()
    }
}

/// Sums all active voices into the output buffer.
pub struct Mixer {
    voices: Mutex<Vec<Voice>>,
    num_channels: u16,
    sample_rate: u32,
    max_voices: usize,
}

impl Mixer {
    /// Creates a new mixer for the given output layout.
    pub fn new(num_channels: u16, sample_rate: u32, max_voices: usize) -> Mixer {
        Mixer {
            voices: Mutex::new(Vec::new()),
            num_channels,
            sample_rate,
            max_voices: max_voices.max(1),
        }
    }

    /// Converts a sound to the mixer's rate and channel count. Walks every
    /// sample, so keep it off the audio callback and async worker threads.
    pub fn convert(&self, sound: DecodedSound) -> DecodedSound {
        sound
            .resample(self.sample_rate)
            .remap_channels(self.num_channels)
    }

    /// Adds a sound already converted with [`Mixer::convert`]. When the voice
    /// limit is reached the oldest voice is dropped. Returns the voice ID.
    pub fn add(&self, sound: DecodedSound) -> u64 {
        debug_assert_eq!(self.num_channels, sound.channel_count());
        debug_assert_eq!(self.sample_rate, sound.sample_rate());
        let id = NEXT_VOICE_ID.fetch_add(1, Ordering::SeqCst);

        let mut voices = self.voices.lock();
        while voices.len() >= self.max_voices {
            let stolen = voices.remove(0);
            debug!(voice = stolen.id, "Voice limit reached, stopping oldest voice");
        }
        voices.push(Voice {
            id,
            samples: sound.into_samples(),
            position: 0,
        });
        id
    }

    /// Fills `output` (interleaved, in the mixer's layout) with the next block
    /// of mixed audio and drops voices that have finished.
    pub fn mix(&self, output: &mut [f32]) {
        output.fill(0.0);

        let mut voices = self.voices.lock();
        voices.retain_mut(|voice| {
            let remaining = &voice.samples[voice.position..];
            let count = remaining.len().min(output.len());
            for (out, sample) in output.iter_mut().zip(&remaining[..count]) {
                *out += sample;
            }
            voice.position += count;
            !voice.is_finished()
        });

        for out in output.iter_mut() {
            *out = out.clamp(-1.0, 1.0);
        }
    }

    /// Returns the number of voices still playing.
    #[cfg(test)]
    pub fn active_voices(&self) -> usize {
        self.voices.lock().len()
    }

    pub fn num_channels(&self) -> u16 {
        self.num_channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
