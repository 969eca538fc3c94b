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
use std::{error::Error, fmt, sync::Arc, thread, time::Duration};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, Sender};
use tracing::{error, info, span, Level};

use super::decode::{decode_file, DecodedSound};
use super::mixer::Mixer;
use crate::config;
use crate::library::Source;
use crate::playback::{PlaybackEngine, PlaybackError, PlaybackInstance};

/// Lists the names of every output device known to cpal.
pub fn list_output_devices() -> Result<Vec<String>, Box<dyn Error>> {
    // Suppress noisy output here.
    let _shh_stdout = shh::stdout()?;
    let _shh_stderr = shh::stderr()?;

    let mut names = Vec::new();
    for host_id in cpal::available_hosts() {
        let devices = match cpal::host_from_id(host_id)?.output_devices() {
            Ok(devices) => devices,
            Err(e) => {
                error!(
                    err = e.to_string(),
                    host = host_id.name(),
                    "Unable to list devices for host"
                );
                continue;
            }
        };

        for device in devices {
            names.push(format!("{} ({})", device.name()?, host_id.name()));
        }
    }

    names.sort();
    Ok(names)
}

/// Finds an output device by name. "default" selects the host default.
fn find_output_device(name: &str) -> Result<cpal::Device, Box<dyn Error>> {
    let host = cpal::default_host();
    if name == "default" {
        return host
            .default_output_device()
            .ok_or_else(|| "no default output device available".into());
    }

    for host_id in cpal::available_hosts() {
        let Ok(devices) = cpal::host_from_id(host_id)?.output_devices() else {
            continue;
        };
        for device in devices {
            if device.name().is_ok_and(|device_name| device_name.trim() == name) {
                return Ok(device);
            }
        }
    }

    Err(format!("no device found with name {}", name).into())
}

/// Finds an input device by name. "default" selects the host default.
pub(super) fn find_input_device(name: &str) -> Result<cpal::Device, Box<dyn Error>> {
    let host = cpal::default_host();
    if name == "default" {
        return host
            .default_input_device()
            .ok_or_else(|| "no default input device available".into());
    }

    for host_id in cpal::available_hosts() {
        let Ok(devices) = cpal::host_from_id(host_id)?.input_devices() else {
            continue;
        };
        for device in devices {
            if device.name().is_ok_and(|device_name| device_name.trim() == name) {
                return Ok(device);
            }
        }
    }

    Err(format!("no input device found with name {}", name).into())
}

/// Plays sounds through a cpal output device. All sounds share one output
/// stream and are summed by the mixer.
pub struct Engine {
    name: String,
    mixer: Arc<Mixer>,
    /// Dropping this stops the output thread.
    stop_tx: Sender<()>,
}

impl Engine {
    /// Opens the configured output device and starts its stream.
    pub fn get(config: &config::Audio) -> Result<Engine, Box<dyn Error>> {
        let device = find_output_device(config.device())?;
        let name = device.name()?;
        let supported = device.default_output_config()?;
        let sample_format = supported.sample_format();
        let stream_config = cpal::StreamConfig {
            channels: supported.channels(),
            sample_rate: supported.sample_rate(),
            buffer_size: match config.buffer_size() {
                Some(frames) => cpal::BufferSize::Fixed(frames),
                None => cpal::BufferSize::Default,
            },
        };

        let mixer = Arc::new(Mixer::new(
            stream_config.channels,
            stream_config.sample_rate.0,
            config.max_voices(),
        ));

        // cpal streams can't move between threads, so the stream lives on its own.
        let (ready_tx, ready_rx) = bounded::<Result<(), String>>(1);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        {
            let mixer = mixer.clone();
            thread::spawn(move || {
                let span = span!(Level::INFO, "output stream (cpal)");
                let _enter = span.enter();

                let stream = match build_output_stream(&device, &stream_config, sample_format, mixer)
                    .and_then(|stream| {
                        stream.play().map_err(|e| e.to_string())?;
                        Ok(stream)
                    }) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                // Block until the engine is dropped.
                let _ = stop_rx.recv();
                drop(stream);
                info!("Output stream stopped.");
            });
        }

        ready_rx
            .recv()
            .map_err(|_| "output thread exited before the stream started")??;

        info!(
            device = name,
            channels = mixer.num_channels(),
            sample_rate = mixer.sample_rate(),
            "Output stream started."
        );

        Ok(Engine {
            name,
            mixer,
            stop_tx,
        })
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let _ = self.stop_tx.try_send(());
    }
}

fn build_output_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    mixer: Arc<Mixer>,
) -> Result<cpal::Stream, String> {
    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_typed_stream::<f32>(device, config, mixer),
        cpal::SampleFormat::I16 => build_typed_stream::<i16>(device, config, mixer),
        cpal::SampleFormat::I32 => build_typed_stream::<i32>(device, config, mixer),
        cpal::SampleFormat::U16 => build_typed_stream::<u16>(device, config, mixer),
        other => return Err(format!("unsupported output sample format {}", other)),
    };
    stream.map_err(|e| e.to_string())
}

fn build_typed_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mixer: Arc<Mixer>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let mut scratch: Vec<f32> = Vec::new();
    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            scratch.resize(data.len(), 0.0);
            mixer.mix(&mut scratch);
            for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
                *dst = cpal::Sample::from_sample(src);
            }
        },
        |err| error!("CPAL output stream error: {}", err),
        None,
    )
}

#[async_trait]
impl PlaybackEngine for Engine {
    async fn load(&self, source: &Source) -> Result<Box<dyn PlaybackInstance>, PlaybackError> {
        if !source.path().exists() {
            return Err(PlaybackError::Unreachable {
                sound: source.clone(),
                reason: "file does not exist".to_string(),
            });
        }

        let path = source.path().to_path_buf();
        let mixer = self.mixer.clone();
        let sound = tokio::task::spawn_blocking(move || {
            decode_file(&path).map(|sound| mixer.convert(sound))
        })
        .await
        .map_err(|e| PlaybackError::Device(e.to_string()))??;

        Ok(Box::new(Instance {
            sound,
            mixer: self.mixer.clone(),
        }))
    }
}

/// A decoded sound, already in the mixer's layout, waiting to be handed over.
struct Instance {
    sound: DecodedSound,
    mixer: Arc<Mixer>,
}

#[async_trait]
impl PlaybackInstance for Instance {
    async fn play(self: Box<Self>) -> Result<Duration, PlaybackError> {
        let duration = self.sound.duration();
        self.mixer.add(self.sound);
        Ok(duration)
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}, Sample rate={})",
            self.name,
            self.mixer.num_channels(),
            self.mixer.sample_rate()
        )
    }
}
