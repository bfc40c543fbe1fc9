pub mod actions;
pub mod events;
pub mod state;

use crate::config::{Config, PlayerBackend};
use crate::input;
use crate::lyrics::format_timestamp;
use crate::matcher::{LinkSource, Score};
use crate::player::{Transport, clock::ClockHandle, mpv::MpvHandle};
use crate::session::{LineChange, LinkStatus, Session, TrackChange, TranslationTicket};
use crate::translate::Translator;
use actions::{Action, LinkTarget};
use events::{Event, PlayerEvent, TranslationEvent};
use state::AppState;
use std::time::Duration;
use tokio::sync::mpsc;

const SEEK_STEP_SECS: f64 = 10.0;

pub struct App {
    cfg: Config,
    session: Session,
    translator: Option<Translator>,
    transport: Option<Transport>,
    state: AppState,
}

impl App {
    pub fn new(cfg: Config, session: Session, translator: Option<Translator>) -> Self {
        let state = AppState::new(cfg.translate.enabled && translator.is_some());
        Self {
            cfg,
            session,
            translator,
            transport: None,
            state,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        let (tx, mut rx) = mpsc::channel::<Event>(256);

        input::spawn_input_task(tx.clone());
        self.start_transport(&tx).await;

        println!("type `help` for commands");
        if self.session.library().tracks().is_empty() {
            println!("no audio files yet; `add <path>` imports some");
        }
        if let Some(change) = self.session.select_track(0) {
            self.on_track_change(change, &tx).await;
        }

        while let Some(ev) = rx.recv().await {
            match ev {
                Event::Input(input_ev) => {
                    if let Some(action) = input::map_input_to_action(input_ev) {
                        self.handle_action(action, &tx).await;
                    }
                }
                Event::Player(pe) => self.handle_player(pe, &tx).await,
                Event::Translation(te) => self.handle_translation(te),
            }

            if self.state.should_quit {
                break;
            }
        }

        Ok(())
    }

    async fn start_transport(&mut self, tx: &mpsc::Sender<Event>) {
        let tick = Duration::from_millis(self.cfg.sync.tick_ms);
        if self.cfg.player.backend == PlayerBackend::Mpv {
            match MpvHandle::spawn(tx.clone(), self.cfg.player.audio_device.as_deref()).await {
                Ok(h) => {
                    let t = Transport::Mpv(h);
                    report(&t, t.set_volume(self.cfg.player.volume).await);
                    self.transport = Some(t);
                    return;
                }
                Err(e) => {
                    tracing::warn!("mpv unavailable, using the silent clock: {e:#}");
                }
            }
        }
        self.transport = Some(Transport::Clock(ClockHandle::spawn(tx.clone(), tick)));
    }

    async fn handle_action(&mut self, action: Action, tx: &mpsc::Sender<Event>) {
        match action {
            Action::Quit => self.state.should_quit = true,
            Action::Help => println!("{}", input::HELP),
            Action::Status => self.print_status(),
            Action::TogglePause => {
                if let Some(t) = self.transport.as_ref() {
                    report(t, t.toggle_pause().await);
                }
            }
            Action::SeekForward => self.seek(SEEK_STEP_SECS).await,
            Action::SeekBack => self.seek(-SEEK_STEP_SECS).await,
            Action::NextTrack => {
                if let Some(change) = self.session.next_track() {
                    self.on_track_change(change, tx).await;
                }
            }
            Action::PrevTrack => {
                if let Some(change) = self.session.prev_track() {
                    self.on_track_change(change, tx).await;
                }
            }
            Action::SelectTrack(i) => match self.session.select_track(i) {
                Some(change) => self.on_track_change(change, tx).await,
                None => println!("no track {}", i + 1),
            },
            Action::ListTracks => self.print_tracks(),
            Action::ListLyrics => self.print_lyrics(),
            Action::Import(path) => {
                let (summary, change) = self.session.import(&[path], &self.cfg.import);
                println!(
                    "imported {} tracks, {} lyric files ({} skipped)",
                    summary.tracks, summary.lyrics, summary.skipped
                );
                if let Some(change) = change {
                    // Lyrics may now exist for the playing track; keep the audio going.
                    print_link_status(&change.status);
                    self.after_lyrics_shown(change.line, tx);
                } else if self.session.current_index().is_none()
                    && let Some(change) = self.session.select_track(0)
                {
                    self.on_track_change(change, tx).await;
                }
            }
            Action::Link(target) => {
                let key = match target {
                    LinkTarget::Key(key) => Some(key),
                    LinkTarget::Index(i) => self.session.library().lyrics().get(i).map(|e| e.key.clone()),
                };
                let Some(key) = key else {
                    println!("no such lyrics; `lyrics` lists them");
                    return;
                };
                match self.session.link_manually(&key) {
                    Ok(change) => {
                        print_link_status(&change.status);
                        self.after_lyrics_shown(change.line, tx);
                    }
                    Err(e) => println!("{e:#}"),
                }
            }
            Action::Unlink => {
                if self.session.unlink_current() {
                    println!("link removed");
                } else {
                    println!("nothing was linked");
                }
            }
            Action::Highlight(i) => match self.session.highlight(i) {
                Some(line) => {
                    print_line(&line);
                    self.maybe_translate(tx, false);
                }
                None => println!("no line {}", i + 1),
            },
            Action::ToggleTranslation => {
                if self.translator.is_none() {
                    println!("translation is not available");
                    return;
                }
                self.state.translate_on = !self.state.translate_on;
                println!("translation {}", if self.state.translate_on { "on" } else { "off" });
                self.maybe_translate(tx, false);
            }
            Action::RetryTranslation => self.maybe_translate(tx, true),
        }
    }

    async fn seek(&self, delta: f64) {
        if let Some(t) = self.transport.as_ref() {
            report(t, t.seek_relative(delta).await);
        }
    }

    async fn handle_player(&mut self, pe: PlayerEvent, tx: &mpsc::Sender<Event>) {
        match pe {
            PlayerEvent::Started => self.state.paused = false,
            PlayerEvent::Paused => self.state.paused = true,
            PlayerEvent::Position { seconds } => {
                self.state.position_secs = seconds;
                if let Some(line) = self.session.on_position(seconds) {
                    print_line(&line);
                    self.maybe_translate(tx, false);
                }
            }
            PlayerEvent::Duration { seconds } => self.state.duration_secs = seconds,
            PlayerEvent::Ended => {
                if let Some(change) = self.session.next_track() {
                    self.on_track_change(change, tx).await;
                }
            }
            PlayerEvent::Error(e) => tracing::warn!("player: {e}"),
        }
    }

    fn handle_translation(&mut self, te: TranslationEvent) {
        let TranslationEvent { ticket, result } = te;
        self.state.pending.remove(&ticket.text);

        if !self.session.accepts(&ticket) {
            tracing::debug!(
                line = ticket.line,
                requested = ticket.generation,
                current = self.session.generation(),
                "dropping translation for lyrics no longer shown"
            );
            return;
        }
        if !self.shows_result_for(&ticket) {
            return;
        }
        match result {
            Ok(text) => print_translation(&text),
            Err(e) => println!("    (translation failed: {e}; type `retry`)"),
        }
    }

    /// A result still belongs on screen when the current line has the same
    /// text; repeated lines share one request.
    fn shows_result_for(&self, ticket: &TranslationTicket) -> bool {
        self.session.accepts(ticket)
            && self
                .session
                .current_line()
                .is_some_and(|l| l.index == ticket.line || l.text == ticket.text)
    }

    async fn on_track_change(&mut self, change: TrackChange, tx: &mpsc::Sender<Event>) {
        self.state.position_secs = 0.0;
        self.state.duration_secs = 0.0;

        println!(
            "▶ [{}/{}] {}",
            change.index + 1,
            self.session.library().tracks().len(),
            change.track.name
        );
        print_link_status(&change.status);

        if let Some(t) = self.transport.as_ref()
            && let Err(e) = t.load(&change.track.path).await
        {
            tracing::warn!("could not load {}: {e:#}", change.track.path.display());
        }
        self.after_lyrics_shown(change.line, tx);
    }

    fn after_lyrics_shown(&mut self, line: Option<usize>, tx: &mpsc::Sender<Event>) {
        if line.is_some()
            && let Some(current) = self.session.current_line()
        {
            print_line(&LineChange::from(current));
            self.maybe_translate(tx, false);
        }
    }

    /// Translate the highlighted line when translation is on, or when `force`d.
    fn maybe_translate(&mut self, tx: &mpsc::Sender<Event>, force: bool) {
        if !(self.state.translate_on || force) {
            return;
        }
        let Some(translator) = self.translator.clone() else {
            return;
        };
        let Some(ticket) = self.session.ticket_for_current_line() else {
            return;
        };
        if ticket.text.trim().is_empty() {
            return;
        }
        if let Some(hit) = translator.cached(&ticket.text) {
            print_translation(&hit);
            return;
        }
        if !self.state.pending.insert(ticket.text.clone()) {
            return;
        }

        let tx = tx.clone();
        tokio::spawn(async move {
            let result = translator.translate(&ticket.text).await;
            let _ = tx.send(Event::Translation(TranslationEvent { ticket, result })).await;
        });
    }

    fn print_status(&self) {
        let Some(track) = self.session.current_track() else {
            println!("nothing selected");
            return;
        };
        let transport = self.transport.as_ref().map(Transport::name).unwrap_or("none");
        println!(
            "{} [{}] {} / {} via {transport}",
            track.name,
            if self.state.paused { "paused" } else { "playing" },
            format_timestamp(self.state.position_secs),
            format_timestamp(self.state.duration_secs),
        );
        print_link_status(self.session.status());
        if let (Some(doc), Some(line)) = (self.session.document(), self.session.current_line()) {
            println!("  line {} of {}", line.index + 1, doc.len());
            print_line(&LineChange::from(line));
        }
    }

    fn print_tracks(&self) {
        let current = self.session.current_index();
        for (i, track) in self.session.library().tracks().iter().enumerate() {
            let marker = if Some(i) == current { '>' } else { ' ' };
            let linked = self.session.links().get(&track.key).unwrap_or("-");
            println!("{marker} {:>3}. {}  [{linked}]", i + 1, track.name);
        }
    }

    fn print_lyrics(&self) {
        let lyrics = self.session.library().lyrics();
        if lyrics.is_empty() {
            println!("no lyric files imported");
        }
        for (i, entry) in lyrics.iter().enumerate() {
            let kind = if entry.document.is_timed() { "timed" } else { "plain" };
            println!("  {:>3}. {} ({kind}, {} lines)", i + 1, entry.key, entry.document.len());
        }
    }
}

fn report(t: &Transport, result: anyhow::Result<()>) {
    if let Err(e) = result {
        tracing::warn!("{} command failed: {e:#}", t.name());
    }
}

fn describe_source(source: &LinkSource) -> String {
    match source {
        LinkSource::Saved => "saved link".to_string(),
        LinkSource::Manual => "chosen manually".to_string(),
        LinkSource::Matched(Score::Identical) => "same file name".to_string(),
        LinkSource::Matched(Score::Exact) => "name match".to_string(),
        LinkSource::Matched(Score::Overlap(n)) => format!("partial match, {n} chars"),
    }
}

fn print_link_status(status: &LinkStatus) {
    match status {
        LinkStatus::Linked { lyric_key, source } => {
            println!("  lyrics: {lyric_key} ({})", describe_source(source))
        }
        LinkStatus::Unlinked => println!("  no lyrics; `lyrics` lists files and `link <n>` picks one"),
    }
}

fn print_line(line: &LineChange) {
    match line.timestamp {
        Some(ts) => println!("[{}] {}", format_timestamp(ts), line.text),
        None => println!("{:>4}  {}", line.index + 1, line.text),
    }
}

fn print_translation(text: &str) {
    println!("    → {text}");
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::library::{Library, LyricEntry, Track};
    use crate::lyrics::LyricDocument;
    use crate::matcher::Matcher;
    use crate::translate::TranslateError;

    fn app_with(lyrics: &str) -> App {
        let mut lib = Library::new();
        lib.add_track(Track::new("chant.mp3", "/m/chant.mp3"));
        lib.add_lyrics(LyricEntry::new("chant.lrc", LyricDocument::parse(lyrics)));
        let mut session = Session::new(lib, Matcher::default(), None);
        session.select_track(0);
        App::new(Config::default(), session, None)
    }

    #[test]
    fn test_repeated_line_shows_pending_result() {
        let mut app = app_with("[00:01.00]Oh oh\n[00:02.00]Oh oh\n[00:03.00]Goodbye");
        app.session.on_position(1.0);
        let ticket = app.session.ticket_for_current_line().unwrap();
        app.state.pending.insert(ticket.text.clone());

        // The next line repeats the text while the request is in flight.
        app.session.on_position(2.0);
        assert_eq!(app.session.current_line().unwrap().index, 1);
        assert!(app.shows_result_for(&ticket));

        app.session.on_position(3.0);
        assert!(!app.shows_result_for(&ticket));
    }

    #[test]
    fn test_result_after_track_switch_is_hidden() {
        let mut app = app_with("[00:01.00]Oh oh");
        app.session.on_position(1.0);
        let ticket = app.session.ticket_for_current_line().unwrap();
        app.session.select_track(0);
        app.session.on_position(1.0);
        assert!(!app.shows_result_for(&ticket));
    }

    #[test]
    fn test_finished_request_leaves_pending() {
        let mut app = app_with("[00:01.00]Oh oh");
        app.session.on_position(1.0);
        let ticket = app.session.ticket_for_current_line().unwrap();
        app.state.pending.insert(ticket.text.clone());
        app.handle_translation(TranslationEvent {
            ticket,
            result: Err(TranslateError::Empty),
        });
        assert!(app.state.pending.is_empty());
    }

    #[test]
    fn test_describe_source() {
        assert_eq!(describe_source(&LinkSource::Saved), "saved link");
        assert_eq!(
            describe_source(&LinkSource::Matched(Score::Overlap(7))),
            "partial match, 7 chars"
        );
    }
}
