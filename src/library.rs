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

//! The sound library: an ordered list of playable entries.
//!
//! Entries come from three places (bundled with the board, captured from the
//! microphone, or imported from disk) but share one shape. Entries are never
//! mutated once created; the library only appends and removes.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

/// A reference to playable audio data.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Source(PathBuf);

impl Source {
    /// Creates a new source from the given path.
    pub fn new<P: Into<PathBuf>>(path: P) -> Source {
        Source(path.into())
    }

    /// Returns the path backing this source.
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Where a sound entry came from. Informational only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    Preloaded,
    Recorded,
    Imported,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Origin::Preloaded => "preloaded",
            Origin::Recorded => "recorded",
            Origin::Imported => "imported",
        })
    }
}

/// A single sound on the board.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SoundEntry {
    source: Source,
    name: String,
    origin: Origin,
}

impl SoundEntry {
    /// Creates a new sound entry.
    pub fn new(source: Source, name: &str, origin: Origin) -> SoundEntry {
        SoundEntry {
            source,
            name: name.to_string(),
            origin,
        }
    }

    /// The audio backing this entry.
    pub fn source(&self) -> &Source {
        &self.source
    }

    /// The display label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the entry came from.
    pub fn origin(&self) -> Origin {
        self.origin
    }
}

/// Which entries `delete` is allowed to remove.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Preloaded entries stay on the board for the whole process.
    #[default]
    ProtectPreloaded,
    /// Any entry may be deleted.
    AllowAll,
}

/// Errors for out-of-range or forbidden library access.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    #[error("no sound at index {index} (library has {len})")]
    OutOfBounds { index: usize, len: usize },

    #[error("sound at index {index} is preloaded and cannot be deleted")]
    Preloaded { index: usize },
}

/// An ordered collection of sound entries.
#[derive(Debug, Default)]
pub struct SoundLibrary {
    entries: Vec<SoundEntry>,
    policy: DeletePolicy,
}

impl SoundLibrary {
    /// Creates an empty library with the default delete policy.
    pub fn new() -> SoundLibrary {
        SoundLibrary::default()
    }

    /// Creates a library seeded with the given preloaded entries.
    pub fn with_preloaded(preloaded: Vec<SoundEntry>, policy: DeletePolicy) -> SoundLibrary {
        info!(
            sounds = preloaded.len(),
            policy = ?policy,
            "Seeding sound library"
        );
        SoundLibrary {
            entries: preloaded,
            policy,
        }
    }

    /// Adds the entry to the end of the library. The source is not checked here;
    /// an unreachable source surfaces when it is played.
    pub fn append(&mut self, entry: SoundEntry) {
        debug!(
            name = entry.name(),
            origin = %entry.origin(),
            index = self.entries.len(),
            "Appending sound"
        );
        self.entries.push(entry);
    }

    /// Removes the entry at `index`, shifting later entries down by one.
    pub fn delete(&mut self, index: usize) -> Result<SoundEntry, IndexError> {
        let entry = self.get(index)?;
        if self.policy == DeletePolicy::ProtectPreloaded && entry.origin() == Origin::Preloaded {
            return Err(IndexError::Preloaded { index });
        }

        let removed = self.entries.remove(index);
        debug!(name = removed.name(), index, "Deleted sound");
        Ok(removed)
    }

    /// Looks up the entry at `index`.
    pub fn get(&self, index: usize) -> Result<&SoundEntry, IndexError> {
        self.entries.get(index).ok_or(IndexError::OutOfBounds {
            index,
            len: self.entries.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the entries in display order.
    pub fn iter(&self) -> impl Iterator<Item = &SoundEntry> {
        self.entries.iter()
    }
}
