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
use async_trait::async_trait;

use super::CaptureError;
use crate::library::Source;

/// Whether the user has allowed microphone access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

/// Grants or denies microphone access. `request` may wait on the user.
#[async_trait]
pub trait Permissions: Send + Sync {
    async fn status(&self) -> PermissionStatus;

    async fn request(&self) -> PermissionStatus;
}

/// How the audio route should be configured while capturing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioMode {
    /// Route the microphone to the capture engine.
    pub allow_recording: bool,
    /// Keep output audible when the device is muted.
    pub audible_in_silent_mode: bool,
}

impl AudioMode {
    /// The mode used for every foreground recording.
    pub fn recording() -> AudioMode {
        AudioMode {
            allow_recording: true,
            audible_in_silent_mode: true,
        }
    }
}

/// Allocates captures.
#[async_trait]
pub trait CaptureEngine: Send + Sync {
    /// Configures the audio route before a capture is prepared.
    async fn set_mode(&self, mode: &AudioMode) -> Result<(), CaptureError>;

    /// Allocates a capture resource without starting it.
    async fn prepare(&self) -> Result<Box<dyn Capture>, CaptureError>;

    /// Disposes of a finished capture nobody kept.
    async fn discard(&self, _source: &Source) {}
}

/// A single capture resource.
#[async_trait]
pub trait Capture: Send {
    async fn start(&mut self) -> Result<(), CaptureError>;

    /// Finalizes the capture and releases the underlying device, returning the
    /// captured audio.
    async fn stop(self: Box<Self>) -> Result<Source, CaptureError>;
}

/// Modal questions put to the user.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Asks a yes/no question.
    async fn confirm(&self, question: &str) -> bool;

    /// Asks for a name. `None` means the user cancelled; an empty string means
    /// they submitted nothing.
    async fn name(&self, prompt: &str) -> Option<String>;
}
