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

//! The soundboard: the library and recording session behind every user action.

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::audio;
use crate::config::{self, PermissionSetting};
use crate::import::{self, FilePicker};
use crate::library::SoundLibrary;
use crate::playback::{self, PlaybackEngine};
use crate::session::{
    FixedPermissions, PermissionStatus, Permissions, Prompter, RecordingSession, SessionState,
};

/// What the user should be told after an action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    /// The action did something, or deliberately did nothing.
    Info(String),
    /// The action failed. The library is unchanged; a failed stop still leaves
    /// the session idle.
    Error(String),
}

impl Notice {
    #[cfg(test)]
    pub fn is_error(&self) -> bool {
        matches!(self, Notice::Error(_))
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Info(message) => write!(f, "{}", message),
            Notice::Error(message) => write!(f, "Error: {}", message),
        }
    }
}

/// The soundboard owns the library and recording session for the lifetime of
/// the process. Every user action ends in a notice; no error is fatal.
pub struct Soundboard {
    library: SoundLibrary,
    session: RecordingSession,
    playback: Arc<dyn PlaybackEngine>,
    picker: Arc<dyn FilePicker>,
}

impl Soundboard {
    /// Creates a new soundboard.
    pub fn new(
        library: SoundLibrary,
        session: RecordingSession,
        playback: Arc<dyn PlaybackEngine>,
        picker: Arc<dyn FilePicker>,
    ) -> Soundboard {
        Soundboard {
            library,
            session,
            playback,
            picker,
        }
    }

    /// Builds a soundboard from its configuration. `ask_permission` is only used
    /// when the board is configured to prompt for microphone access.
    pub fn from_config(
        config: &config::Board,
        prompter: Arc<dyn Prompter>,
        ask_permission: Arc<dyn Permissions>,
        picker: Arc<dyn FilePicker>,
    ) -> Result<Soundboard, Box<dyn Error>> {
        let playback = audio::get_playback_engine(config.audio())?;
        let capture = audio::get_capture_engine(config.audio(), &config.recordings_dir());
        let permissions: Arc<dyn Permissions> = match config.permission() {
            PermissionSetting::Prompt => ask_permission,
            PermissionSetting::Granted => {
                Arc::new(FixedPermissions::new(PermissionStatus::Granted))
            }
            PermissionSetting::Denied => Arc::new(FixedPermissions::new(PermissionStatus::Denied)),
        };

        let library = SoundLibrary::with_preloaded(config.preloaded(), config.delete_policy());
        info!(
            sounds = library.len(),
            playback = %playback,
            recordings = %config.recordings_dir().display(),
            "Soundboard ready."
        );

        Ok(Soundboard::new(
            library,
            RecordingSession::new(permissions, capture, prompter),
            playback,
            picker,
        ))
    }

    /// The sounds on the board, in display order.
    pub fn library(&self) -> &SoundLibrary {
        &self.library
    }

    pub fn recording_state(&self) -> SessionState {
        self.session.state()
    }

    /// Plays the sound at `index`.
    pub async fn play(&self, index: usize) -> Notice {
        match self.start(index).await {
            Ok((notice, _)) => notice,
            Err(notice) => notice,
        }
    }

    /// Plays the sound at `index` and waits until it has finished.
    pub async fn play_to_end(&self, index: usize) -> Notice {
        match self.start(index).await {
            Ok((notice, duration)) => {
                tokio::time::sleep(duration).await;
                notice
            }
            Err(notice) => notice,
        }
    }

    async fn start(&self, index: usize) -> Result<(Notice, Duration), Notice> {
        let entry = self.library.get(index).map_err(|e| failed("play", e))?;
        let duration = playback::play(self.playback.as_ref(), entry)
            .await
            .map_err(|e| failed("play", e))?;
        Ok((Notice::Info(format!("Playing {}", entry.name())), duration))
    }

    /// Starts a recording when idle, otherwise stops it and keeps the result if
    /// the user names it.
    pub async fn toggle_recording(&mut self) -> Notice {
        match self.session.state() {
            SessionState::Idle => match self.session.begin().await {
                Ok(()) => Notice::Info("Recording...".to_string()),
                Err(e) => failed("start recording", e),
            },
            SessionState::Capturing => match self.session.end().await {
                Ok(Some(entry)) => {
                    let message = format!("Added {}", entry.name());
                    self.library.append(entry);
                    Notice::Info(message)
                }
                Ok(None) => Notice::Info("Recording discarded".to_string()),
                Err(e) => failed("stop recording", e),
            },
        }
    }

    /// Asks the picker for a file and adds it to the board.
    pub async fn import(&mut self) -> Notice {
        match import::import(self.picker.as_ref()).await {
            Ok(Some(entry)) => {
                let message = format!("Added {}", entry.name());
                self.library.append(entry);
                Notice::Info(message)
            }
            Ok(None) => Notice::Info("Nothing added".to_string()),
            Err(e) => failed("pick sound from file", e),
        }
    }

    /// Removes the sound at `index`.
    pub fn delete(&mut self, index: usize) -> Notice {
        match self.library.delete(index) {
            Ok(entry) => Notice::Info(format!("Deleted {}", entry.name())),
            Err(e) => failed("delete", e),
        }
    }

    /// Releases any in-progress recording. Must be called before the process exits.
    pub async fn shutdown(&mut self) {
        info!(state = %self.session.state(), "Shutting down soundboard.");
        self.session.force_release().await;
    }
}

fn failed<E: fmt::Display>(action: &str, e: E) -> Notice {
    error!(action, err = %e, "Action failed");
    Notice::Error(format!("Failed to {}: {}", action, e))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use async_trait::async_trait;

    use super::*;
    use crate::audio::mock::{CaptureDevice, Playback};
    use crate::import::{ImportError, PickFilter};
    use crate::library::{DeletePolicy, Origin, SoundEntry, Source};
    use crate::session::{FixedPermissions, PermissionStatus};
    use crate::testutil::{write_sine_wav, ScriptedPrompter};

    struct FixedPicker(Option<Source>);

    #[async_trait]
    impl FilePicker for FixedPicker {
        async fn pick(&self, _: PickFilter) -> Result<Option<Source>, ImportError> {
            Ok(self.0.clone())
        }
    }

    struct Fixture {
        board: Soundboard,
        playback: Playback,
        capture: CaptureDevice,
        _dir: tempfile::TempDir,
    }

    fn fixture(confirm: bool, name: Option<&str>, picked: Option<&str>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let bop = dir.path().join("bop.wav");
        write_sine_wav(&bop, 44100, 1, 441).unwrap();

        let library = SoundLibrary::with_preloaded(
            vec![SoundEntry::new(Source::new(&bop), "Bop", Origin::Preloaded)],
            DeletePolicy::ProtectPreloaded,
        );
        let capture = CaptureDevice::new(Path::new("/tmp/recordings"));
        let session = RecordingSession::new(
            Arc::new(FixedPermissions::new(PermissionStatus::Granted)),
            Arc::new(capture.clone()),
            ScriptedPrompter::new(confirm, name),
        );
        let playback = Playback::get("mock-out");
        let board = Soundboard::new(
            library,
            session,
            Arc::new(playback.clone()),
            Arc::new(FixedPicker(picked.map(Source::new))),
        );

        Fixture {
            board,
            playback,
            capture,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_play() {
        let fixture = fixture(true, None, None);
        assert_eq!(
            Notice::Info("Playing Bop".to_string()),
            fixture.board.play(0).await
        );
        assert_eq!(1, fixture.playback.played().len());
        assert!(fixture.board.play(5).await.is_error());
    }

    #[tokio::test]
    async fn test_play_to_end() {
        let fixture = fixture(true, None, None);
        assert_eq!(
            Notice::Info("Playing Bop".to_string()),
            fixture.board.play_to_end(0).await
        );
        assert_eq!(1, fixture.playback.played().len());
        assert!(fixture.board.play_to_end(3).await.is_error());
    }

    #[tokio::test]
    async fn test_record_and_keep() {
        let mut fixture = fixture(true, Some("Bop2"), None);

        assert!(!fixture.board.toggle_recording().await.is_error());
        assert_eq!(SessionState::Capturing, fixture.board.recording_state());

        assert_eq!(
            Notice::Info("Added Bop2".to_string()),
            fixture.board.toggle_recording().await
        );
        assert_eq!(SessionState::Idle, fixture.board.recording_state());
        assert_eq!(2, fixture.board.library().len());
        assert_eq!(
            Origin::Recorded,
            fixture.board.library().get(1).unwrap().origin()
        );

        // The recorded file was never written by the mock, so playing it fails
        // without touching the library.
        assert!(fixture.board.play(1).await.is_error());
        assert_eq!(2, fixture.board.library().len());
    }

    #[tokio::test]
    async fn test_record_and_discard() {
        let mut fixture = fixture(false, None, None);

        fixture.board.toggle_recording().await;
        assert_eq!(
            Notice::Info("Recording discarded".to_string()),
            fixture.board.toggle_recording().await
        );
        assert_eq!(1, fixture.board.library().len());
    }

    #[tokio::test]
    async fn test_record_failure_is_reported() {
        let mut fixture = fixture(true, Some("x"), None);
        fixture.capture.fail_prepare(true);

        assert!(fixture.board.toggle_recording().await.is_error());
        assert_eq!(SessionState::Idle, fixture.board.recording_state());
    }

    #[tokio::test]
    async fn test_import() {
        let mut fixture = fixture(true, None, Some("/music/airhorn.mp3"));
        assert_eq!(
            Notice::Info("Added airhorn".to_string()),
            fixture.board.import().await
        );
        assert_eq!(2, fixture.board.library().len());

        let mut cancelled = self::fixture(true, None, None);
        assert!(!cancelled.board.import().await.is_error());
        assert_eq!(1, cancelled.board.library().len());
    }

    #[tokio::test]
    async fn test_delete() {
        let mut fixture = fixture(true, None, Some("/music/airhorn.mp3"));
        fixture.board.import().await;

        assert!(fixture.board.delete(0).is_error());
        assert!(fixture.board.delete(9).is_error());
        assert_eq!(2, fixture.board.library().len());

        assert_eq!(
            Notice::Info("Deleted airhorn".to_string()),
            fixture.board.delete(1)
        );
        assert_eq!(1, fixture.board.library().len());
    }

    #[tokio::test]
    async fn test_from_config() {
        let dir = tempfile::tempdir().unwrap();
        write_sine_wav(&dir.path().join("bop.wav"), 44100, 1, 441).unwrap();
        std::fs::write(
            dir.path().join("board.yaml"),
            r#"
            audio:
              device: mock-out
              input_device: mock-in
            sounds:
              - name: Bop
                file: bop.wav
            permission: denied
            "#,
        )
        .unwrap();

        let config = crate::config::Board::deserialize(&dir.path().join("board.yaml")).unwrap();
        let mut board = Soundboard::from_config(
            &config,
            ScriptedPrompter::new(true, Some("x")),
            Arc::new(FixedPermissions::new(PermissionStatus::Granted)),
            Arc::new(FixedPicker(None)),
        )
        .unwrap();

        assert_eq!(1, board.library().len());
        assert_eq!(Notice::Info("Playing Bop".to_string()), board.play(0).await);
        // The configured denial wins over the prompting authority.
        assert!(board.toggle_recording().await.is_error());
        assert_eq!(SessionState::Idle, board.recording_state());
    }

    #[tokio::test]
    async fn test_shutdown_releases_recording() {
        let mut fixture = fixture(true, Some("x"), None);
        fixture.board.toggle_recording().await;
        assert_eq!(1, fixture.capture.open_captures());

        fixture.board.shutdown().await;
        assert_eq!(0, fixture.capture.open_captures());
        assert_eq!(SessionState::Idle, fixture.board.recording_state());
        assert_eq!(1, fixture.board.library().len());
    }
}
