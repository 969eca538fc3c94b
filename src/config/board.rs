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
use std::path::{Path, PathBuf};

use config::{Config, File};
use serde::Deserialize;

use super::audio::Audio;
use super::error::ConfigError;
use crate::library::{DeletePolicy, Origin, SoundEntry, Source};

const DEFAULT_RECORDINGS_DIR: &str = "recordings";

/// How microphone permission is decided.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PermissionSetting {
    /// Ask the user the first time a recording starts.
    #[default]
    Prompt,
    /// Always allowed.
    Granted,
    /// Always refused.
    Denied,
}

/// A sound bundled with the board.
#[derive(Deserialize, Clone, Debug)]
pub struct SoundDefinition {
    /// The display label. Defaults to "Preloaded Sound N".
    name: Option<String>,

    /// The audio file, relative to the board file unless absolute.
    file: String,
}

/// The configuration for a soundboard.
#[derive(Deserialize, Clone, Debug)]
pub struct Board {
    /// The audio configuration.
    #[serde(default)]
    audio: Audio,

    /// The bundled sounds, in display order.
    #[serde(default)]
    sounds: Vec<SoundDefinition>,

    /// Where new recordings are written, relative to the board file unless absolute.
    recordings: Option<String>,

    /// How microphone permission is decided.
    #[serde(default)]
    permission: PermissionSetting,

    /// Which sounds may be deleted.
    #[serde(default)]
    delete_policy: DeletePolicy,

    /// The directory relative paths are resolved against.
    #[serde(skip)]
    base_path: PathBuf,
}

impl Board {
    /// Parse a board from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Board, ConfigError> {
        let mut board = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Board>()?;
        board.base_path = path
            .canonicalize()?
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(board)
    }

    /// Sets the directory that relative paths resolve against.
    #[cfg(test)]
    pub fn with_base_path(mut self, base_path: &Path) -> Board {
        self.base_path = base_path.to_path_buf();
        self
    }

    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    pub fn permission(&self) -> PermissionSetting {
        self.permission
    }

    pub fn delete_policy(&self) -> DeletePolicy {
        self.delete_policy
    }

    /// Returns the directory recordings are written to.
    pub fn recordings_dir(&self) -> PathBuf {
        self.resolve(
            self.recordings
                .as_deref()
                .unwrap_or(DEFAULT_RECORDINGS_DIR),
        )
    }

    /// Builds the preloaded library entries from the bundled sounds.
    pub fn preloaded(&self) -> Vec<SoundEntry> {
        self.sounds
            .iter()
            .enumerate()
            .map(|(i, sound)| {
                let name = match &sound.name {
                    Some(name) => name.clone(),
                    None => format!("Preloaded Sound {}", i + 1),
                };
                SoundEntry::new(Source::new(self.resolve(&sound.file)), &name, Origin::Preloaded)
            })
            .collect()
    }

    fn resolve(&self, file: &str) -> PathBuf {
        if Path::new(file).is_absolute() {
            PathBuf::from(file)
        } else {
            self.base_path.join(file)
        }
    }
}
