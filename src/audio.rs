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
use std::{error::Error, path::Path, sync::Arc};

use tracing::info;

use crate::config;
use crate::playback::PlaybackEngine;
use crate::session::CaptureEngine;

pub mod capture;
pub mod cpal;
pub mod decode;
pub mod mixer;
pub mod mock;

pub use decode::{decode_file, DecodeError, DecodedSound};

/// Lists output devices known to cpal.
pub fn list_devices() -> Result<Vec<String>, Box<dyn Error>> {
    cpal::list_output_devices()
}

/// Gets the playback engine for the configured output device. Device names
/// starting with "mock" get a mock engine.
pub fn get_playback_engine(config: &config::Audio) -> Result<Arc<dyn PlaybackEngine>, Box<dyn Error>> {
    let device = config.device();
    if device.starts_with("mock") {
        return Ok(Arc::new(mock::Playback::get(device)));
    }

    let engine = cpal::Engine::get(config)?;
    info!(device = %engine, "Playback engine ready.");
    Ok(Arc::new(engine))
}

/// Gets the capture engine for the configured input device, writing captures
/// into `recordings`. Device names starting with "mock" get a mock engine.
pub fn get_capture_engine(config: &config::Audio, recordings: &Path) -> Arc<dyn CaptureEngine> {
    let device = config.input_device();
    if device.starts_with("mock") {
        return Arc::new(mock::CaptureDevice::new(recordings));
    }

    Arc::new(capture::Engine::new(device, recordings))
}
