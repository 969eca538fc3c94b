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
use std::f32::consts::PI;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use hound::{SampleFormat, WavSpec, WavWriter};
use parking_lot::Mutex;

use crate::session::Prompter;

/// Writes an interleaved 440Hz sine wave with the given number of frames.
pub fn write_sine_wav(
    path: &Path,
    sample_rate: u32,
    channels: u16,
    frames: usize,
) -> Result<(), Box<dyn Error>> {
    let mut writer = WavWriter::create(
        path,
        WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        },
    )?;

    for frame in 0..frames {
        let sample = (2.0 * PI * 440.0 * frame as f32 / sample_rate as f32).sin() * 0.5;
        for _ in 0..channels {
            writer.write_sample(sample)?;
        }
    }
    writer.finalize()?;

    Ok(())
}

/// A prompter that answers from a script and records what it was asked.
pub struct ScriptedPrompter {
    confirm: bool,
    name: Option<String>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(confirm: bool, name: Option<&str>) -> Arc<ScriptedPrompter> {
        Arc::new(ScriptedPrompter {
            confirm,
            name: name.map(str::to_string),
            asked: Mutex::new(Vec::new()),
        })
    }

    /// Every question and prompt seen so far, in order.
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().clone()
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn confirm(&self, question: &str) -> bool {
        self.asked.lock().push(question.to_string());
        self.confirm
    }

    async fn name(&self, prompt: &str) -> Option<String> {
        self.asked.lock().push(prompt.to_string());
        self.name.clone()
    }
}
