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

//! A soundboard: a list of bundled, recorded and imported sounds that can be
//! played over each other, with a microphone recording session that adds new
//! sounds to the list.

pub mod audio;
pub mod config;
pub mod import;
pub mod library;
pub mod playback;
pub mod session;
pub mod soundboard;
pub mod terminal;

#[cfg(test)]
mod testutil;
