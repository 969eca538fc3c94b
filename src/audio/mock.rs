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
use std::{
    fmt,
    path::PathBuf,
    time::Duration,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::info;

use crate::library::Source;
use crate::playback::{PlaybackEngine, PlaybackError, PlaybackInstance};
use crate::session::{AudioMode, Capture, CaptureEngine, CaptureError};

/// A mock playback device. Doesn't actually play anything, but refuses
/// sources that don't exist on disk.
#[derive(Clone)]
pub struct Playback {
    name: String,
    played: Arc<Mutex<Vec<Source>>>,
}

impl Playback {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Playback {
        Playback {
            name: name.to_string(),
            played: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns every source that has been started, in order.
    pub fn played(&self) -> Vec<Source> {
        self.played.lock().clone()
    }
}

#[async_trait]
impl PlaybackEngine for Playback {
    async fn load(&self, source: &Source) -> Result<Box<dyn PlaybackInstance>, PlaybackError> {
        if !source.path().exists() {
            return Err(PlaybackError::Unreachable {
                sound: source.clone(),
                reason: "file does not exist".to_string(),
            });
        }

        Ok(Box::new(MockInstance {
            device: self.name.clone(),
            source: source.clone(),
            played: self.played.clone(),
        }))
    }
}

struct MockInstance {
    device: String,
    source: Source,
    played: Arc<Mutex<Vec<Source>>>,
}

#[async_trait]
impl PlaybackInstance for MockInstance {
    async fn play(self: Box<Self>) -> Result<Duration, PlaybackError> {
        let MockInstance {
            device,
            source,
            played,
        } = *self;
        info!(device, source = %source, "Playing sound (mock).");
        played.lock().push(source);
        Ok(Duration::ZERO)
    }
}

impl fmt::Display for Playback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}

/// Ways a mock capture can be told to fail.
#[derive(Default)]
struct Failures {
    set_mode: AtomicBool,
    prepare: AtomicBool,
    start: AtomicBool,
    stop: AtomicBool,
}

/// A mock capture engine. Captures produce paths under a directory without
/// touching the disk, and the engine tracks how many captures are holding the
/// "device" so tests can check nothing leaks.
#[derive(Clone)]
pub struct CaptureDevice {
    recordings: PathBuf,
    captures: Arc<AtomicUsize>,
    open: Arc<AtomicUsize>,
    modes: Arc<Mutex<Vec<AudioMode>>>,
    discarded: Arc<Mutex<Vec<Source>>>,
    failures: Arc<Failures>,
}

impl CaptureDevice {
    /// Creates a mock capture engine "writing" into `recordings`.
    pub fn new(recordings: &std::path::Path) -> CaptureDevice {
        CaptureDevice {
            recordings: recordings.to_path_buf(),
            captures: Arc::new(AtomicUsize::new(0)),
            open: Arc::new(AtomicUsize::new(0)),
            modes: Arc::new(Mutex::new(Vec::new())),
            discarded: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Failures::default()),
        }
    }

    /// The number of captures currently holding the device.
    pub fn open_captures(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    /// Every audio mode applied so far.
    pub fn modes(&self) -> Vec<AudioMode> {
        self.modes.lock().clone()
    }

    /// Every source handed back for disposal.
    pub fn discarded(&self) -> Vec<Source> {
        self.discarded.lock().clone()
    }

    pub fn fail_set_mode(&self, fail: bool) {
        self.failures.set_mode.store(fail, Ordering::SeqCst);
    }

    pub fn fail_prepare(&self, fail: bool) {
        self.failures.prepare.store(fail, Ordering::SeqCst);
    }

    pub fn fail_start(&self, fail: bool) {
        self.failures.start.store(fail, Ordering::SeqCst);
    }

    pub fn fail_stop(&self, fail: bool) {
        self.failures.stop.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CaptureEngine for CaptureDevice {
    async fn set_mode(&self, mode: &AudioMode) -> Result<(), CaptureError> {
        if self.failures.set_mode.load(Ordering::SeqCst) {
            return Err(CaptureError::Device("mock audio mode failure".to_string()));
        }
        self.modes.lock().push(*mode);
        Ok(())
    }

    async fn prepare(&self) -> Result<Box<dyn Capture>, CaptureError> {
        if self.failures.prepare.load(Ordering::SeqCst) {
            return Err(CaptureError::Device("mock prepare failure".to_string()));
        }

        let number = self.captures.fetch_add(1, Ordering::SeqCst) + 1;
        self.open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockCapture {
            path: self.recordings.join(format!("mock-recording-{}.wav", number)),
            open: self.open.clone(),
            failures: self.failures.clone(),
        }))
    }

    async fn discard(&self, source: &Source) {
        self.discarded.lock().push(source.clone());
    }
}

struct MockCapture {
    path: PathBuf,
    open: Arc<AtomicUsize>,
    failures: Arc<Failures>,
}

#[async_trait]
impl Capture for MockCapture {
    async fn start(&mut self) -> Result<(), CaptureError> {
        if self.failures.start.load(Ordering::SeqCst) {
            return Err(CaptureError::Device("mock start failure".to_string()));
        }
        info!(path = ?self.path, "Capture started (mock).");
        Ok(())
    }

    async fn stop(self: Box<Self>) -> Result<Source, CaptureError> {
        // The device is released whether or not finalizing succeeds.
        self.open.fetch_sub(1, Ordering::SeqCst);
        if self.failures.stop.load(Ordering::SeqCst) {
            return Err(CaptureError::Finalize("mock finalize failure".to_string()));
        }
        Ok(Source::new(self.path))
    }
}
