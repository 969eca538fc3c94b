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

//! Microphone capture to WAV files through cpal.

use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, StreamTrait};
use crossbeam_channel::{bounded, Receiver, Sender};
use hound::{WavSpec, WavWriter};
use parking_lot::Mutex;
use tracing::{debug, error, info, span, warn, Level};

use super::cpal::find_input_device;
use crate::library::Source;
use crate::session::{AudioMode, Capture, CaptureEngine, CaptureError};

static NEXT_CAPTURE: AtomicU64 = AtomicU64::new(1);

type SharedWriter = Arc<Mutex<Option<WavWriter<BufWriter<fs::File>>>>>;

/// Records from a cpal input device into WAV files under a directory.
pub struct Engine {
    device_name: String,
    recordings: PathBuf,
}

impl Engine {
    /// Creates a capture engine writing into `recordings`.
    pub fn new(device_name: &str, recordings: &Path) -> Engine {
        Engine {
            device_name: device_name.to_string(),
            recordings: recordings.to_path_buf(),
        }
    }

    /// Picks a new, unused output path.
    fn next_path(&self) -> PathBuf {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or_default();
        let sequence = NEXT_CAPTURE.fetch_add(1, Ordering::SeqCst);
        self.recordings
            .join(format!("recording-{}-{}.wav", millis, sequence))
    }
}

#[async_trait]
impl CaptureEngine for Engine {
    async fn set_mode(&self, mode: &AudioMode) -> Result<(), CaptureError> {
        // Desktop hosts have no silent switch and always route the microphone.
        debug!(
            allow_recording = mode.allow_recording,
            audible_in_silent_mode = mode.audible_in_silent_mode,
            "Audio mode set"
        );
        Ok(())
    }

    async fn prepare(&self) -> Result<Box<dyn Capture>, CaptureError> {
        fs::create_dir_all(&self.recordings)?;

        // Fail early if the device is missing rather than at start.
        let device_name = self.device_name.clone();
        tokio::task::spawn_blocking(move || {
            find_input_device(&device_name)
                .map(|_| ())
                .map_err(|e| CaptureError::Device(e.to_string()))
        })
        .await
        .map_err(|e| CaptureError::Device(e.to_string()))??;

        Ok(Box::new(CpalCapture {
            device_name: self.device_name.clone(),
            path: self.next_path(),
            stop_tx: None,
            handle: None,
        }))
    }

    async fn discard(&self, source: &Source) {
        match fs::remove_file(source.path()) {
            Ok(()) => debug!(source = %source, "Removed discarded recording"),
            Err(e) => warn!(source = %source, err = %e, "Unable to remove discarded recording"),
        }
    }
}

/// An in-progress capture. The input stream lives on its own thread.
struct CpalCapture {
    device_name: String,
    path: PathBuf,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<Result<(), CaptureError>>>,
}

#[async_trait]
impl Capture for CpalCapture {
    async fn start(&mut self) -> Result<(), CaptureError> {
        let (ready_tx, ready_rx) = bounded::<Result<(), CaptureError>>(1);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let device_name = self.device_name.clone();
        let path = self.path.clone();

        let handle = thread::spawn(move || {
            let span = span!(Level::INFO, "input stream (cpal)");
            let _enter = span.enter();
            record(&device_name, &path, ready_tx, stop_rx)
        });

        let ready = tokio::task::spawn_blocking(move || ready_rx.recv())
            .await
            .map_err(|e| CaptureError::Device(e.to_string()))?;

        self.stop_tx = Some(stop_tx);
        self.handle = Some(handle);

        match ready {
            Ok(result) => result,
            Err(_) => Err(CaptureError::Device(
                "capture thread exited before the stream started".to_string(),
            )),
        }
    }

    async fn stop(self: Box<Self>) -> Result<Source, CaptureError> {
        let CpalCapture {
            path,
            stop_tx,
            handle,
            ..
        } = *self;
        let (Some(stop_tx), Some(handle)) = (stop_tx, handle) else {
            return Err(CaptureError::Finalize("capture was never started".to_string()));
        };

        let _ = stop_tx.send(());
        tokio::task::spawn_blocking(move || handle.join())
            .await
            .map_err(|e| CaptureError::Finalize(e.to_string()))?
            .map_err(|_| CaptureError::Finalize("capture thread panicked".to_string()))??;

        Ok(Source::new(path))
    }
}

/// Runs one capture: opens the stream, writes samples until told to stop, then
/// finalizes the WAV file.
fn record(
    device_name: &str,
    path: &Path,
    ready_tx: Sender<Result<(), CaptureError>>,
    stop_rx: Receiver<()>,
) -> Result<(), CaptureError> {
    let opened = open_stream(device_name, path);
    let (stream, writer) = match opened {
        Ok(opened) => {
            let _ = ready_tx.send(Ok(()));
            opened
        }
        Err(e) => {
            let message = e.to_string();
            let _ = fs::remove_file(path);
            let _ = ready_tx.send(Err(e));
            return Err(CaptureError::Device(message));
        }
    };

    info!(path = ?path, "Capture started.");
    let _ = stop_rx.recv();
    drop(stream);

    let writer = writer.lock().take();
    match writer {
        Some(writer) => writer.finalize()?,
        None => return Err(CaptureError::Finalize("WAV writer already closed".to_string())),
    }
    info!(path = ?path, "Capture finalized.");
    Ok(())
}

fn open_stream(
    device_name: &str,
    path: &Path,
) -> Result<(cpal::Stream, SharedWriter), CaptureError> {
    let device =
        find_input_device(device_name).map_err(|e| CaptureError::Device(e.to_string()))?;
    let supported = device
        .default_input_config()
        .map_err(|e| CaptureError::Device(e.to_string()))?;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();

    let spec = WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate.0,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let writer: SharedWriter = Arc::new(Mutex::new(Some(WavWriter::create(path, spec)?)));

    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_input_stream::<f32>(&device, &config, writer.clone()),
        cpal::SampleFormat::I16 => build_input_stream::<i16>(&device, &config, writer.clone()),
        cpal::SampleFormat::I32 => build_input_stream::<i32>(&device, &config, writer.clone()),
        cpal::SampleFormat::U16 => build_input_stream::<u16>(&device, &config, writer.clone()),
        other => {
            return Err(CaptureError::Device(format!(
                "unsupported input sample format {}",
                other
            )))
        }
    }
    .map_err(|e| CaptureError::Device(e.to_string()))?;

    stream
        .play()
        .map_err(|e| CaptureError::Device(e.to_string()))?;

    Ok((stream, writer))
}

fn build_input_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    writer: SharedWriter,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample,
    f32: cpal::FromSample<T>,
{
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let mut guard = writer.lock();
            let Some(writer) = guard.as_mut() else {
                return;
            };
            for &sample in data {
                if let Err(e) = writer.write_sample(sample.to_sample::<f32>()) {
                    error!(err = %e, "Failed to write captured audio");
                    return;
                }
            }
        },
        |err| error!("CPAL input stream error: {}", err),
        None,
    )
}
