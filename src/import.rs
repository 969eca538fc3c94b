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

//! Importing sounds picked from the filesystem.

use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use crate::library::{Origin, SoundEntry, Source};

/// The label used when a picked file has no usable stem.
pub const DEFAULT_IMPORT_NAME: &str = "Imported Sound";

/// File extensions of the containers and codecs the decoder understands.
const AUDIO_EXTENSIONS: &[&str] = &[
    "aac", "aif", "aifc", "aiff", "alac", "caf", "flac", "m4a", "mka", "mp1", "mp2", "mp3",
    "mp4", "oga", "ogg", "wav", "wave", "webm",
];

/// What kind of file the picker should offer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PickFilter {
    Audio,
}

impl PickFilter {
    /// Whether a file at `path` matches the filter, judged by its extension.
    pub fn accepts(&self, path: &Path) -> bool {
        match self {
            PickFilter::Audio => path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str())),
        }
    }
}

/// Errors raised by the file picker itself. Cancelling is not an error.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("file picker failed: {0}")]
    Picker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Lets the user choose a file.
#[async_trait]
pub trait FilePicker: Send + Sync {
    /// Returns the chosen file, or `None` if the user cancelled.
    async fn pick(&self, filter: PickFilter) -> Result<Option<Source>, ImportError>;
}

/// Asks the picker for an audio file and wraps it in an imported entry. The
/// file itself is not checked; a bad file is reported when played.
pub async fn import(picker: &dyn FilePicker) -> Result<Option<SoundEntry>, ImportError> {
    let Some(source) = picker.pick(PickFilter::Audio).await? else {
        info!("Import cancelled.");
        return Ok(None);
    };

    let name = source
        .path()
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.trim().is_empty())
        .unwrap_or(DEFAULT_IMPORT_NAME)
        .to_string();

    info!(name, source = %source, "Imported sound.");
    Ok(Some(SoundEntry::new(source, &name, Origin::Imported)))
}
