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
use serde::Deserialize;

const DEFAULT_DEVICE: &str = "default";
const DEFAULT_MAX_VOICES: usize = 32;

/// A YAML representation of the audio configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Audio {
    /// The output device. "default" uses the host default; names starting with
    /// "mock" play nothing.
    device: Option<String>,

    /// The input device used for recording. Same naming rules as `device`.
    input_device: Option<String>,

    /// Maximum number of sounds playing at once (default: 32). The oldest sound
    /// is cut when the limit is reached.
    max_voices: Option<usize>,

    /// Fixed output stream buffer size in frames. Uses the backend default when unset.
    buffer_size: Option<u32>,
}

impl Audio {
    /// Returns the output device from the configuration.
    pub fn device(&self) -> &str {
        self.device.as_deref().unwrap_or(DEFAULT_DEVICE)
    }

    /// Returns the input device from the configuration.
    pub fn input_device(&self) -> &str {
        self.input_device.as_deref().unwrap_or(DEFAULT_DEVICE)
    }

    /// Returns the voice limit (default: 32).
    pub fn max_voices(&self) -> usize {
        self.max_voices.unwrap_or(DEFAULT_MAX_VOICES).max(1)
    }

    /// Returns the fixed stream buffer size, if any.
    pub fn buffer_size(&self) -> Option<u32> {
        self.buffer_size
    }
}
