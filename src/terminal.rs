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

//! A line-oriented terminal front end. The console doubles as the prompter,
//! permission authority and file picker for the soundboard.

use std::fmt;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::import::{FilePicker, ImportError, PickFilter};
use crate::library::Source;
use crate::session::{PermissionStatus, Permissions, Prompter, SessionState};
use crate::soundboard::Soundboard;

const LIST: &str = "list";
const PLAY: &str = "play";
const RECORD: &str = "record";
const ADD: &str = "add";
const DELETE: &str = "delete";
const QUIT: &str = "quit";

/// Typed in place of a name to cancel naming.
const CANCEL: &str = ".";

const PERMISSION_QUESTION: &str = "Allow microphone access?";
const PICK_PROMPT: &str = "Path to audio file (empty to cancel)";

/// A command typed at the terminal. Sound numbers are shown 1-based and stored
/// 0-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    List,
    Play(usize),
    Record,
    Add,
    Delete(usize),
    Quit,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unrecognized command {0:?}")]
    Unknown(String),

    #[error("{0} needs a sound number")]
    MissingNumber(&'static str),

    #[error("{0:?} is not a sound number")]
    BadNumber(String),
}

impl Command {
    /// Parses a line of input. Blank lines parse to `None`.
    pub fn parse(input: &str) -> Result<Option<Command>, CommandError> {
        let mut words = input.split_whitespace();
        let Some(word) = words.next() else {
            return Ok(None);
        };

        let command = match word.to_lowercase().as_str() {
            LIST => Command::List,
            PLAY => Command::Play(sound_number(PLAY, words.next())?),
            RECORD => Command::Record,
            ADD => Command::Add,
            DELETE => Command::Delete(sound_number(DELETE, words.next())?),
            QUIT => Command::Quit,
            _ => return Err(CommandError::Unknown(word.to_string())),
        };
        Ok(Some(command))
    }
}

fn sound_number(command: &'static str, arg: Option<&str>) -> Result<usize, CommandError> {
    let arg = arg.ok_or(CommandError::MissingNumber(command))?;
    match arg.parse::<usize>() {
        Ok(number) if number >= 1 => Ok(number - 1),
        _ => Err(CommandError::BadNumber(arg.to_string())),
    }
}

type Reader = Arc<Mutex<Box<dyn BufRead + Send>>>;
type Writer = Arc<Mutex<Box<dyn Write + Send>>>;

/// A shared handle to the terminal.
#[derive(Clone)]
pub struct Console {
    reader: Reader,
    writer: Writer,
}

impl Console {
    pub fn new<R, W>(reader: R, writer: W) -> Console
    where
        R: BufRead + Send + 'static,
        W: Write + Send + 'static,
    {
        Console {
            reader: Arc::new(Mutex::new(Box::new(reader))),
            writer: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// A console on stdin and stdout.
    pub fn stdio() -> Console {
        Console::new(BufReader::new(io::stdin()), io::stdout())
    }

    /// Shows the prompt and reads one line without its line ending. Returns
    /// `None` once the input is closed.
    pub async fn ask(&self, prompt: &str) -> Result<Option<String>, io::Error> {
        let reader = self.reader.clone();
        let writer = self.writer.clone();
        let prompt = prompt.to_string();
        tokio::task::spawn_blocking(move || {
            read_answer(&mut *reader.lock(), &mut *writer.lock(), &prompt)
        })
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
    }

    /// Writes a line of output.
    pub fn say<D: fmt::Display>(&self, message: D) -> Result<(), io::Error> {
        let mut writer = self.writer.lock();
        writeln!(writer, "{}", message)?;
        writer.flush()
    }
}

fn read_answer<R, W>(reader: &mut R, writer: &mut W, prompt: &str) -> Result<Option<String>, io::Error>
where
    R: BufRead + ?Sized,
    W: Write + ?Sized,
{
    write!(writer, "{}: ", prompt)?;
    writer.flush()?;

    let mut input = String::default();
    if reader.read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim_end_matches(|c| c == '\r' || c == '\n').to_string()))
}

#[async_trait]
impl Prompter for Console {
    async fn confirm(&self, question: &str) -> bool {
        match self.ask(&format!("{} [y/N]", question)).await {
            Ok(Some(answer)) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            Ok(None) => false,
            Err(e) => {
                warn!(err = %e, "Unable to read answer");
                false
            }
        }
    }

    async fn name(&self, prompt: &str) -> Option<String> {
        match self.ask(&format!("{} ({} to cancel)", prompt, CANCEL)).await {
            Ok(Some(answer)) if answer.trim() == CANCEL => None,
            Ok(answer) => answer,
            Err(e) => {
                warn!(err = %e, "Unable to read name");
                None
            }
        }
    }
}

/// Asks at the terminal the first time permission is requested and remembers
/// the answer for the rest of the process.
pub struct ConsolePermissions {
    console: Console,
    status: Mutex<PermissionStatus>,
}

impl ConsolePermissions {
    pub fn new(console: Console) -> ConsolePermissions {
        ConsolePermissions {
            console,
            status: Mutex::new(PermissionStatus::Undetermined),
        }
    }
}

#[async_trait]
impl Permissions for ConsolePermissions {
    async fn status(&self) -> PermissionStatus {
        *self.status.lock()
    }

    async fn request(&self) -> PermissionStatus {
        let current = *self.status.lock();
        if current != PermissionStatus::Undetermined {
            return current;
        }

        let status = if self.console.confirm(PERMISSION_QUESTION).await {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        };
        *self.status.lock() = status;
        status
    }
}

/// Picks files by reading a path from the terminal.
pub struct ConsolePicker {
    console: Console,
}

impl ConsolePicker {
    pub fn new(console: Console) -> ConsolePicker {
        ConsolePicker { console }
    }
}

#[async_trait]
impl FilePicker for ConsolePicker {
    async fn pick(&self, filter: PickFilter) -> Result<Option<Source>, ImportError> {
        let Some(answer) = self.console.ask(PICK_PROMPT).await? else {
            return Ok(None);
        };
        let answer = answer.trim();
        if answer.is_empty() {
            return Ok(None);
        }

        let path = Path::new(answer);
        if !path.is_file() {
            warn!(path = answer, "No such file");
            self.console.say(format!("No such file: {}", answer))?;
            return Ok(None);
        }
        if !filter.accepts(path) {
            warn!(path = answer, ?filter, "File does not match filter");
            self.console.say(format!("Not an audio file: {}", answer))?;
            return Ok(None);
        }
        Ok(Some(Source::new(path)))
    }
}

/// Runs the command loop until the user quits or the input closes, then shuts
/// the board down.
pub async fn run(board: &mut Soundboard, console: &Console) -> Result<(), io::Error> {
    info!("Terminal started.");
    let result = command_loop(board, console).await;
    board.shutdown().await;
    result
}

async fn command_loop(board: &mut Soundboard, console: &Console) -> Result<(), io::Error> {
    print_library(board, console)?;

    loop {
        let record = match board.recording_state() {
            SessionState::Idle => RECORD.to_string(),
            SessionState::Capturing => format!("{} to stop", RECORD),
        };
        let prompt = format!(
            "Command ({}, {} N, {}, {}, {} N, {})",
            LIST, PLAY, record, ADD, DELETE, QUIT
        );

        let Some(input) = console.ask(&prompt).await? else {
            info!("Input closed.");
            return Ok(());
        };

        let command = match Command::parse(&input) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                warn!(input, err = %e, "Unrecognized input");
                console.say(format!("Error: {}", e))?;
                continue;
            }
        };

        let notice = match command {
            Command::List => {
                print_library(board, console)?;
                continue;
            }
            Command::Play(index) => board.play(index).await,
            Command::Record => board.toggle_recording().await,
            Command::Add => board.import().await,
            Command::Delete(index) => board.delete(index),
            Command::Quit => return Ok(()),
        };
        console.say(notice)?;
    }
}

fn print_library(board: &Soundboard, console: &Console) -> Result<(), io::Error> {
    if board.library().is_empty() {
        return console.say("No sounds.");
    }
    for (i, entry) in board.library().iter().enumerate() {
        console.say(format!("{:>3}. {} ({})", i + 1, entry.name(), entry.origin()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::audio::mock::{CaptureDevice, Playback};
    use crate::library::{DeletePolicy, Origin, SoundEntry, SoundLibrary};
    use crate::session::RecordingSession;
    use crate::testutil::write_sine_wav;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).to_string()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn console(input: &str) -> (Console, SharedBuf) {
        let output = SharedBuf::default();
        let console = Console::new(Cursor::new(input.as_bytes().to_vec()), output.clone());
        (console, output)
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Ok(Some(Command::List)), Command::parse("list"));
        assert_eq!(Ok(Some(Command::Play(0))), Command::parse("play 1"));
        assert_eq!(Ok(Some(Command::Play(11))), Command::parse("  PLAY   12 "));
        assert_eq!(Ok(Some(Command::Record)), Command::parse("record"));
        assert_eq!(Ok(Some(Command::Add)), Command::parse("add"));
        assert_eq!(Ok(Some(Command::Delete(2))), Command::parse("delete 3"));
        assert_eq!(Ok(Some(Command::Quit)), Command::parse("quit"));
        assert_eq!(Ok(None), Command::parse("   "));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            Err(CommandError::Unknown("dance".to_string())),
            Command::parse("dance")
        );
        assert_eq!(Err(CommandError::MissingNumber(PLAY)), Command::parse("play"));
        assert_eq!(
            Err(CommandError::BadNumber("0".to_string())),
            Command::parse("delete 0")
        );
        assert_eq!(
            Err(CommandError::BadNumber("-1".to_string())),
            Command::parse("play -1")
        );
    }

    #[test]
    fn test_read_answer() -> Result<(), io::Error> {
        let mut reader = Cursor::new(b"hello\r\nworld\n".to_vec());
        let mut writer: Vec<u8> = Vec::new();

        assert_eq!(
            Some("hello".to_string()),
            read_answer(&mut reader, &mut writer, "Say")?
        );
        assert_eq!(
            Some("world".to_string()),
            read_answer(&mut reader, &mut writer, "Say")?
        );
        assert_eq!(None, read_answer(&mut reader, &mut writer, "Say")?);
        assert_eq!("Say: Say: Say: ", String::from_utf8_lossy(&writer));
        Ok(())
    }

    #[tokio::test]
    async fn test_confirm() {
        let (console, _) = console("y\nYES\nn\n\n");
        assert!(console.confirm("Save?").await);
        assert!(console.confirm("Save?").await);
        assert!(!console.confirm("Save?").await);
        assert!(!console.confirm("Save?").await);
        // Closed input.
        assert!(!console.confirm("Save?").await);
    }

    #[tokio::test]
    async fn test_name() {
        let (console, output) = console("Bop2\n\n.\n");
        assert_eq!(Some("Bop2".to_string()), console.name("Name").await);
        assert_eq!(Some(String::new()), console.name("Name").await);
        assert_eq!(None, console.name("Name").await);
        assert_eq!(None, console.name("Name").await);
        assert!(output.contents().starts_with("Name (. to cancel): "));
    }

    #[tokio::test]
    async fn test_permissions_asked_once() {
        let (console, output) = console("y\n");
        let permissions = ConsolePermissions::new(console);

        assert_eq!(PermissionStatus::Undetermined, permissions.status().await);
        assert_eq!(PermissionStatus::Granted, permissions.request().await);
        assert_eq!(PermissionStatus::Granted, permissions.request().await);
        assert_eq!(PermissionStatus::Granted, permissions.status().await);
        assert_eq!(1, output.contents().matches(PERMISSION_QUESTION).count());
    }

    #[tokio::test]
    async fn test_permissions_denied_is_remembered() {
        let (console, _) = console("no\ny\n");
        let permissions = ConsolePermissions::new(console);

        assert_eq!(PermissionStatus::Denied, permissions.request().await);
        assert_eq!(PermissionStatus::Denied, permissions.request().await);
    }

    #[tokio::test]
    async fn test_picker() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("airhorn.wav");
        write_sine_wav(&file, 44100, 1, 10).unwrap();
        let missing = dir.path().join("missing.wav");

        let input = format!("{}\n\n{}\n", file.display(), missing.display());
        let (console, output) = console(&input);
        let picker = ConsolePicker::new(console);

        assert_eq!(
            Some(Source::new(&file)),
            picker.pick(PickFilter::Audio).await.unwrap()
        );
        assert_eq!(None, picker.pick(PickFilter::Audio).await.unwrap());
        assert_eq!(None, picker.pick(PickFilter::Audio).await.unwrap());
        assert!(output.contents().contains("No such file"));
        // Closed input.
        assert_eq!(None, picker.pick(PickFilter::Audio).await.unwrap());
    }

    #[tokio::test]
    async fn test_picker_rejects_non_audio_files() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, "not a sound").unwrap();

        let (console, output) = console(&format!("{}\n", notes.display()));
        let picker = ConsolePicker::new(console);

        assert_eq!(None, picker.pick(PickFilter::Audio).await.unwrap());
        assert!(output.contents().contains("Not an audio file"));
    }

    fn board(console: &Console, dir: &Path) -> (Soundboard, Playback, CaptureDevice) {
        let bop = dir.join("bop.wav");
        write_sine_wav(&bop, 44100, 1, 441).unwrap();

        let library = SoundLibrary::with_preloaded(
            vec![SoundEntry::new(Source::new(&bop), "Bop", Origin::Preloaded)],
            DeletePolicy::ProtectPreloaded,
        );
        let capture = CaptureDevice::new(&dir.join("recordings"));
        let playback = Playback::get("mock-out");
        let session = RecordingSession::new(
            Arc::new(ConsolePermissions::new(console.clone())),
            Arc::new(capture.clone()),
            Arc::new(console.clone()),
        );
        let board = Soundboard::new(
            library,
            session,
            Arc::new(playback.clone()),
            Arc::new(ConsolePicker::new(console.clone())),
        );
        (board, playback, capture)
    }

    #[tokio::test]
    async fn test_run_session() -> Result<(), io::Error> {
        let dir = tempfile::tempdir()?;
        let (console, output) = console(
            "play 1\nrecord\ny\nrecord\ny\nBop2\nlist\ndelete 1\ndelete 2\nbogus\nplay 9\nquit\nplay 1\n",
        );
        let (mut board, playback, capture) = board(&console, dir.path());

        run(&mut board, &console).await?;

        let output = output.contents();
        assert!(output.contains("  1. Bop (preloaded)"));
        assert!(output.contains("Playing Bop"));
        assert!(output.contains("Recording..."));
        assert!(output.contains("  2. Bop2 (recorded)"));
        assert!(output.contains("Error: Failed to delete"));
        assert!(output.contains("Deleted Bop2"));
        assert!(output.contains("Error: unrecognized command"));
        // Nothing after quit is read.
        assert_eq!(1, playback.played().len());

        assert_eq!(1, board.library().len());
        assert_eq!(0, capture.open_captures());
        Ok(())
    }

    #[tokio::test]
    async fn test_closed_input_releases_recording() -> Result<(), io::Error> {
        let dir = tempfile::tempdir()?;
        let (console, _) = console("record\ny\n");
        let (mut board, _, capture) = board(&console, dir.path());

        run(&mut board, &console).await?;

        assert_eq!(SessionState::Idle, board.recording_state());
        assert_eq!(0, capture.open_captures());
        assert_eq!(1, capture.discarded().len());
        assert_eq!(1, board.library().len());
        Ok(())
    }
}
