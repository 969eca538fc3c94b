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

//! The recording session state machine.
//!
//! A session is created once per process and reused across many capture
//! cycles:
//!
//! ```text
//! Idle --begin(ok)--> Capturing
//! Idle --begin(err)--> Idle
//! Capturing --end()--> Idle
//! * --force_release()--> Idle
//! ```
//!
//! The capture resource is always released before `end` reports anything,
//! including errors.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::library::{Origin, SoundEntry};

mod collaborators;

pub use collaborators::{
    AudioMode, Capture, CaptureEngine, PermissionStatus, Permissions, Prompter,
};

/// The question asked before a finished capture is kept.
pub const SAVE_QUESTION: &str = "Save this recording?";

/// The prompt used to name a kept capture.
pub const NAME_PROMPT: &str = "Name for the new sound";

/// Errors raised by the capture engine or the permission authority.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("microphone permission was denied")]
    PermissionDenied,

    #[error("capture device error: {0}")]
    Device(String),

    #[error("failed to finalize capture: {0}")]
    Finalize(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

/// Errors returned by session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("cannot {operation} while {state}")]
    Precondition {
        operation: &'static str,
        state: SessionState,
    },

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// The observable state of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Capturing,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Idle => "idle",
            SessionState::Capturing => "capturing",
        })
    }
}

/// Drives microphone captures and turns kept captures into sound entries.
pub struct RecordingSession {
    permissions: Arc<dyn Permissions>,
    engine: Arc<dyn CaptureEngine>,
    prompter: Arc<dyn Prompter>,
    /// The in-progress capture. Present exactly while capturing.
    active: Option<Box<dyn Capture>>,
}

impl RecordingSession {
    /// Creates a new idle session.
    pub fn new(
        permissions: Arc<dyn Permissions>,
        engine: Arc<dyn CaptureEngine>,
        prompter: Arc<dyn Prompter>,
    ) -> RecordingSession {
        RecordingSession {
            permissions,
            engine,
            prompter,
            active: None,
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> SessionState {
        match self.active {
            Some(_) => SessionState::Capturing,
            None => SessionState::Idle,
        }
    }

    /// Starts a new capture.
    pub async fn begin(&mut self) -> Result<(), SessionError> {
        if self.active.is_some() {
            return Err(SessionError::Precondition {
                operation: "begin recording",
                state: self.state(),
            });
        }

        if self.permissions.status().await != PermissionStatus::Granted {
            info!("Requesting microphone permission.");
            if self.permissions.request().await != PermissionStatus::Granted {
                warn!("Microphone permission denied.");
                return Err(CaptureError::PermissionDenied.into());
            }
        }

        self.engine.set_mode(&AudioMode::recording()).await?;

        let mut capture = self.engine.prepare().await?;
        if let Err(e) = capture.start().await {
            // The prepared capture still holds the device; release it before reporting.
            match capture.stop().await {
                Ok(source) => self.engine.discard(&source).await,
                Err(stop_err) => debug!(err = %stop_err, "Releasing unstarted capture failed"),
            }
            return Err(e.into());
        }

        self.active = Some(capture);
        info!("Recording.");
        Ok(())
    }

    /// Finishes the current capture and asks the user whether to keep it.
    ///
    /// Returns `Ok(None)` if the user declines to save, cancels naming, or
    /// gives an empty name. Declining the name discards the capture even though
    /// saving was accepted; there is no placeholder name.
    pub async fn end(&mut self) -> Result<Option<SoundEntry>, SessionError> {
        let capture = self.active.take().ok_or(SessionError::Precondition {
            operation: "stop recording",
            state: SessionState::Idle,
        })?;

        // The session is idle from here on regardless of what follows.
        let source = capture.stop().await?;
        info!(source = %source, "Recording stopped.");

        if !self.prompter.confirm(SAVE_QUESTION).await {
            info!("Recording discarded.");
            self.engine.discard(&source).await;
            return Ok(None);
        }

        let name = match self.prompter.name(NAME_PROMPT).await {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => {
                info!("No name given, recording discarded.");
                self.engine.discard(&source).await;
                return Ok(None);
            }
        };

        info!(name, "Recording kept.");
        Ok(Some(SoundEntry::new(source, &name, Origin::Recorded)))
    }

    /// Releases any in-progress capture without prompting. A no-op when idle.
    pub async fn force_release(&mut self) {
        let Some(capture) = self.active.take() else {
            return;
        };

        warn!("Releasing in-progress recording.");
        match capture.stop().await {
            Ok(source) => self.engine.discard(&source).await,
            Err(e) => warn!(err = %e, "Error while releasing recording"),
        }
    }
}

impl fmt::Debug for RecordingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingSession")
            .field("state", &self.state())
            .finish()
    }
}

/// Permissions that never change: either always granted or always denied.
pub struct FixedPermissions(PermissionStatus);

impl FixedPermissions {
    pub fn new(status: PermissionStatus) -> FixedPermissions {
        FixedPermissions(status)
    }
}

#[async_trait]
impl Permissions for FixedPermissions {
    async fn status(&self) -> PermissionStatus {
        self.0
    }

    async fn request(&self) -> PermissionStatus {
        self.0
    }
}
