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
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{crate_version, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use soundboard::audio;
use soundboard::config::Board;
use soundboard::soundboard::Soundboard;
use soundboard::terminal::{self, Console, ConsolePermissions, ConsolePicker};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A soundboard."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Lists and verifies the bundled sounds of a board.
    Sounds {
        /// The path to the board config.
        path: String,
    },
    /// Plays a single bundled sound and waits for it to finish.
    Play {
        /// The path to the board config.
        path: String,
        /// The number of the sound, as shown by `sounds`.
        number: usize,
    },
    /// Starts the interactive soundboard.
    Start {
        /// The path to the board config.
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Sounds { path } => {
            let board = Board::deserialize(&PathBuf::from(&path))?;
            let sounds = board.preloaded();

            if sounds.is_empty() {
                println!("No sounds found in {}.", path);
                return Ok(());
            }

            println!("Sounds (count: {}):", sounds.len());
            for (i, sound) in sounds.iter().enumerate() {
                match audio::decode_file(sound.source().path()) {
                    Ok(decoded) => println!(
                        "{:>3}. {} ({}, {:.1}s)",
                        i + 1,
                        sound.name(),
                        sound.source(),
                        decoded.duration().as_secs_f32()
                    ),
                    Err(e) => println!(
                        "{:>3}. {} ({}, unplayable: {})",
                        i + 1,
                        sound.name(),
                        sound.source(),
                        e
                    ),
                }
            }
        }
        Commands::Play { path, number } => {
            let index = number
                .checked_sub(1)
                .ok_or("sound numbers start at 1")?;
            let console = Console::stdio();
            let mut board = init_board(&PathBuf::from(path), &console)?;

            println!("{}", board.play_to_end(index).await);
            board.shutdown().await;
        }
        Commands::Start { path } => {
            let console = Console::stdio();
            let mut board = init_board(&PathBuf::from(path), &console)?;
            terminal::run(&mut board, &console).await?;
        }
    }

    Ok(())
}

fn init_board(path: &Path, console: &Console) -> Result<Soundboard, Box<dyn Error>> {
    let config = Board::deserialize(path)?;
    Soundboard::from_config(
        &config,
        Arc::new(console.clone()),
        Arc::new(ConsolePermissions::new(console.clone())),
        Arc::new(ConsolePicker::new(console.clone())),
    )
}
