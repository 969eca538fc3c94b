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

//! Playback dispatch. Every call loads the entry's source and starts an
//! independent instance; overlapping calls play over each other.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info};

use crate::audio::DecodeError;
use crate::library::{SoundEntry, Source};

/// Errors raised while loading or starting a sound.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("sound source {sound} is unreachable: {reason}")]
    Unreachable { sound: Source, reason: String },

    #[error("unable to decode sound: {0}")]
    Decode(#[from] DecodeError),

    #[error("playback device error: {0}")]
    Device(String),
}

/// Loads sources into playable instances.
#[async_trait]
pub trait PlaybackEngine: fmt::Display + Send + Sync {
    async fn load(&self, source: &Source) -> Result<Box<dyn PlaybackInstance>, PlaybackError>;
}

/// A loaded sound, ready to start.
#[async_trait]
pub trait PlaybackInstance: Send {
    /// Starts the sound and returns how long it will play for.
    async fn play(self: Box<Self>) -> Result<Duration, PlaybackError>;
}

/// Plays the given entry through the engine, returning the sound's length.
pub async fn play(
    engine: &dyn PlaybackEngine,
    entry: &SoundEntry,
) -> Result<Duration, PlaybackError> {
    let result = match engine.load(entry.source()).await {
        Ok(instance) => instance.play().await,
        Err(e) => Err(e),
    };

    match &result {
        Ok(duration) => info!(
            name = entry.name(),
            source = %entry.source(),
            duration_ms = duration.as_millis(),
            "Playing sound."
        ),
        Err(e) => error!(name = entry.name(), err = %e, "Unable to play sound"),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::mock;
    use crate::library::{Origin, SoundLibrary};
    use crate::testutil::write_sine_wav;

    #[tokio::test]
    async fn test_play_existing_sound() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bop.wav");
        write_sine_wav(&path, 44100, 1, 441).unwrap();

        let engine = mock::Playback::get("mock-out");
        let entry = SoundEntry::new(Source::new(&path), "Bop", Origin::Preloaded);
        play(&engine, &entry).await.unwrap();
        play(&engine, &entry).await.unwrap();

        // Overlapping plays are not deduplicated.
        assert_eq!(vec![Source::new(&path), Source::new(&path)], engine.played());
    }

    #[tokio::test]
    async fn test_play_unreachable_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("imported.wav");
        write_sine_wav(&path, 44100, 1, 441).unwrap();

        let mut library = SoundLibrary::new();
        library.append(SoundEntry::new(Source::new(&path), "imported", Origin::Imported));
        std::fs::remove_file(&path).unwrap();

        let engine = mock::Playback::get("mock-out");
        let result = play(&engine, library.get(0).unwrap()).await;
        assert!(matches!(result, Err(PlaybackError::Unreachable { .. })));
        assert!(engine.played().is_empty());
        assert_eq!(1, library.len());
        assert_eq!("imported", library.get(0).unwrap().name());
    }
}
