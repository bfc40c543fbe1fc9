use crate::app::actions::{Action, LinkTarget};
use crate::app::events::{Event, InputEvent};
use std::io::BufRead;
use tokio::sync::mpsc;

pub const HELP: &str = "\
commands:
  p | space      pause / resume
  f | r          seek forward / back 10s
  n | b          next / previous track
  track <n>      play track n
  tracks         list tracks
  lyrics         list lyric files
  add <path>     import more files or a folder
  link <n|file>  use these lyrics for the current track
  unlink         forget the saved link of the current track
  line <n>       highlight line n
  t              translation on / off
  retry          translate the current line again
  status         show what is playing
  q              quit";

pub fn spawn_input_task(tx: mpsc::Sender<Event>) {
    tokio::task::spawn_blocking(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.blocking_send(Event::Input(InputEvent::Line(line))).is_err() {
                return;
            }
        }
        let _ = tx.blocking_send(Event::Input(InputEvent::Closed));
    });
}

pub fn map_input_to_action(ev: InputEvent) -> Option<Action> {
    match ev {
        InputEvent::Closed => None,
        InputEvent::Line(line) => parse_command(&line),
    }
}

/// Parse one command line. List positions are typed 1-based.
pub fn parse_command(line: &str) -> Option<Action> {
    // A lone space is the pause key.
    if line == " " {
        return Some(Action::TogglePause);
    }
    let line = line.trim();
    let (cmd, arg) = match line.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (line, ""),
    };

    match (cmd.to_ascii_lowercase().as_str(), arg) {
        ("q" | "quit" | "exit", _) => Some(Action::Quit),
        ("h" | "help" | "?", _) => Some(Action::Help),
        ("s" | "status", _) => Some(Action::Status),
        ("p" | "pause", _) => Some(Action::TogglePause),
        ("f" | "ff", _) => Some(Action::SeekForward),
        ("r" | "rew", _) => Some(Action::SeekBack),
        ("n" | "next", _) => Some(Action::NextTrack),
        ("b" | "prev", _) => Some(Action::PrevTrack),
        ("tracks", _) => Some(Action::ListTracks),
        ("lyrics", _) => Some(Action::ListLyrics),
        ("track", arg) => position(arg).map(Action::SelectTrack),
        ("line", arg) => position(arg).map(Action::Highlight),
        ("add", "") => None,
        ("add", arg) => Some(Action::Import(arg.into())),
        ("link", "") => None,
        ("link", arg) => Some(Action::Link(match position(arg) {
            Some(i) => LinkTarget::Index(i),
            None => LinkTarget::Key(arg.to_string()),
        })),
        ("unlink", _) => Some(Action::Unlink),
        ("t" | "translate", _) => Some(Action::ToggleTranslation),
        ("retry", _) => Some(Action::RetryTranslation),
        _ => None,
    }
}

fn position(arg: &str) -> Option<usize> {
    arg.parse::<usize>().ok()?.checked_sub(1)
}
