//! Playback session state: imported files, links, and what is showing now.

use crate::config::ImportConfig;
use crate::library::{ImportSummary, Library, Track};
use crate::lyrics::{LyricDocument, LyricLine};
use crate::matcher::{self, LinkOutcome, LinkSource, LinkTable, Matcher};
use crate::storage::Storage;
use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    Linked { lyric_key: String, source: LinkSource },
    /// No lyrics found; the user has to pick some.
    Unlinked,
}

/// Result of switching tracks or lyrics.
#[derive(Debug, Clone)]
pub struct TrackChange {
    pub index: usize,
    pub track: Track,
    pub status: LinkStatus,
    /// Initially highlighted line (plain documents start at line 0).
    pub line: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineChange {
    pub index: usize,
    pub timestamp: Option<f64>,
    pub text: String,
}

impl From<&LyricLine> for LineChange {
    fn from(line: &LyricLine) -> Self {
        Self {
            index: line.index,
            timestamp: line.timestamp,
            text: line.text.clone(),
        }
    }
}

/// Identifies the line an async translation was requested for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationTicket {
    pub generation: u64,
    pub line: usize,
    pub text: String,
}

pub struct Session {
    library: Library,
    links: LinkTable,
    matcher: Matcher,
    storage: Option<Storage>,

    current: Option<usize>,
    status: LinkStatus,
    document: Option<Arc<LyricDocument>>,
    line: Option<usize>,
    // Bumped whenever the shown document changes; stale async results compare against it.
    generation: u64,
}

impl Session {
    pub fn new(library: Library, matcher: Matcher, storage: Option<Storage>) -> Self {
        let links = storage.as_ref().map(Storage::load_links).unwrap_or_default();
        Self {
            library,
            links,
            matcher,
            storage,
            current: None,
            status: LinkStatus::Unlinked,
            document: None,
            line: None,
            generation: 0,
        }
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn links(&self) -> &LinkTable {
        &self.links
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.and_then(|i| self.library.track(i))
    }

    pub fn status(&self) -> &LinkStatus {
        &self.status
    }

    pub fn document(&self) -> Option<&Arc<LyricDocument>> {
        self.document.as_ref()
    }

    pub fn current_line(&self) -> Option<&LyricLine> {
        let doc = self.document.as_ref()?;
        doc.line(self.line?)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Add files to the library. New lyrics re-run linking for the track
    /// that is currently selected.
    pub fn import(&mut self, paths: &[PathBuf], settings: &ImportConfig) -> (ImportSummary, Option<TrackChange>) {
        let summary = self.library.import_paths(paths, settings);
        let change = match self.current {
            Some(i) if summary.lyrics > 0 => self.select_track(i),
            _ => None,
        };
        (summary, change)
    }

    /// Make track `index` current and load its lyrics.
    pub fn select_track(&mut self, index: usize) -> Option<TrackChange> {
        let track = self.library.track(index)?.clone();
        self.current = Some(index);

        let outcome = self.matcher.select_link(&track, &self.library, &mut self.links);
        let status = match outcome {
            LinkOutcome::Linked { lyric_key, source } => {
                if matches!(source, LinkSource::Matched(_)) {
                    self.persist_links();
                }
                LinkStatus::Linked { lyric_key, source }
            }
            LinkOutcome::NoMatch => {
                tracing::info!(track = %track.name, "no lyrics match");
                LinkStatus::Unlinked
            }
        };
        self.show(status);

        Some(TrackChange {
            index,
            track,
            status: self.status.clone(),
            line: self.line,
        })
    }

    /// Next track, wrapping to the first.
    pub fn next_track(&mut self) -> Option<TrackChange> {
        let len = self.library.tracks().len();
        if len == 0 {
            return None;
        }
        let next = match self.current {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.select_track(next)
    }

    /// Previous track, wrapping to the last.
    pub fn prev_track(&mut self) -> Option<TrackChange> {
        let len = self.library.tracks().len();
        if len == 0 {
            return None;
        }
        let prev = match self.current {
            Some(i) if i > 0 && i < len => i - 1,
            _ => len - 1,
        };
        self.select_track(prev)
    }

    /// Use `lyric_key` for the current track from now on.
    pub fn link_manually(&mut self, lyric_key: &str) -> anyhow::Result<TrackChange> {
        let index = self.current.context("no track selected")?;
        let track = self.library.track(index).context("no track selected")?.clone();
        if self.library.lyric(lyric_key).is_none() {
            anyhow::bail!("unknown lyrics: {lyric_key}");
        }

        self.links.insert(track.key.clone(), lyric_key);
        self.persist_links();
        self.show(LinkStatus::Linked {
            lyric_key: lyric_key.to_string(),
            source: LinkSource::Manual,
        });

        Ok(TrackChange {
            index,
            track,
            status: self.status.clone(),
            line: self.line,
        })
    }

    /// Forget the saved link of the current track and stop showing its lyrics.
    pub fn unlink_current(&mut self) -> bool {
        let Some(key) = self.current_track().map(|t| t.key.clone()) else {
            return false;
        };
        let removed = self.links.remove(&key).is_some();
        if removed {
            self.persist_links();
        }
        self.show(LinkStatus::Unlinked);
        removed
    }

    /// Feed a playback position. Returns the newly active line of a timed
    /// document, if it changed.
    pub fn on_position(&mut self, seconds: f64) -> Option<LineChange> {
        let doc = self.document.as_ref()?;
        if !doc.is_timed() {
            return None;
        }
        let index = matcher::active_line(doc, seconds)?;
        if self.line == Some(index) {
            return None;
        }
        self.line = Some(index);
        doc.line(index).map(LineChange::from)
    }

    /// Highlight a line directly (manual selection).
    pub fn highlight(&mut self, index: usize) -> Option<LineChange> {
        let change = self.document.as_ref()?.line(index).map(LineChange::from)?;
        self.line = Some(index);
        Some(change)
    }

    pub fn ticket_for_current_line(&self) -> Option<TranslationTicket> {
        let line = self.current_line()?;
        Some(TranslationTicket {
            generation: self.generation,
            line: line.index,
            text: line.text.clone(),
        })
    }

    /// Whether an async result for `ticket` may still be applied.
    pub fn accepts(&self, ticket: &TranslationTicket) -> bool {
        ticket.generation == self.generation
    }

    fn show(&mut self, status: LinkStatus) {
        self.generation = self.generation.wrapping_add(1);
        self.document = match &status {
            LinkStatus::Linked { lyric_key, .. } => {
                self.library.lyric(lyric_key).map(|e| Arc::clone(&e.document))
            }
            LinkStatus::Unlinked => None,
        };
        self.line = match &self.document {
            Some(doc) if !doc.is_timed() && !doc.is_empty() => Some(0),
            _ => None,
        };
        self.status = status;
    }

    fn persist_links(&self) {
        let Some(storage) = &self.storage else {
            return;
        };
        if let Err(e) = storage.save_links(&self.links) {
            tracing::warn!("failed to save links: {e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::LyricEntry;
    use crate::matcher::Score;

    fn library() -> Library {
        let mut lib = Library::new();
        lib.add_track(Track::new("01 - Alpha.mp3", "/m/01 - Alpha.mp3"));
        lib.add_track(Track::new("02 - Beta.mp3", "/m/02 - Beta.mp3"));
        lib.add_track(Track::new("03 - Gamma.mp3", "/m/03 - Gamma.mp3"));
        lib.add_lyrics(LyricEntry::new(
            "alpha.lrc",
            LyricDocument::parse("[00:01.00]a one\n[00:04.00]a two\n[00:09.00]a three"),
        ));
        lib.add_lyrics(LyricEntry::new("beta.txt", LyricDocument::parse("b one\nb two")));
        lib
    }

    fn session() -> Session {
        Session::new(library(), Matcher::default(), None)
    }

    #[test]
    fn test_select_track_links_and_resets_line() {
        let mut s = session();
        let change = s.select_track(0).unwrap();
        assert_eq!(
            change.status,
            LinkStatus::Linked {
                lyric_key: "alpha.lrc".into(),
                source: LinkSource::Matched(Score::Exact),
            }
        );
        assert_eq!(change.line, None);
        assert!(s.document().unwrap().is_timed());
        assert_eq!(s.links().get("alpha"), Some("alpha.lrc"));
    }

    #[test]
    fn test_plain_document_starts_on_first_line() {
        let mut s = session();
        let change = s.select_track(1).unwrap();
        assert_eq!(change.line, Some(0));
        assert_eq!(s.current_line().unwrap().text, "b one");
        // Time based highlighting never applies to plain lyrics.
        assert_eq!(s.on_position(100.0), None);
        assert_eq!(s.highlight(1).unwrap().text, "b two");
    }

    #[test]
    fn test_unmatched_track_is_unlinked() {
        let mut s = session();
        let change = s.select_track(2).unwrap();
        assert_eq!(change.status, LinkStatus::Unlinked);
        assert!(s.document().is_none());
        assert_eq!(s.on_position(5.0), None);
        assert!(s.ticket_for_current_line().is_none());
    }

    #[test]
    fn test_on_position_reports_changes_only() {
        let mut s = session();
        s.select_track(0);
        assert_eq!(s.on_position(0.5), None);
        assert_eq!(s.on_position(1.2).unwrap().text, "a one");
        assert_eq!(s.on_position(2.0), None);
        assert_eq!(s.on_position(4.0).unwrap().index, 1);
        // Seek back.
        assert_eq!(s.on_position(1.0).unwrap().index, 0);
        assert_eq!(s.on_position(30.0).unwrap().text, "a three");
    }

    #[test]
    fn test_next_and_prev_wrap() {
        let mut s = session();
        assert_eq!(s.prev_track().unwrap().index, 2);
        assert_eq!(s.next_track().unwrap().index, 0);
        assert_eq!(s.next_track().unwrap().index, 1);
        assert_eq!(s.prev_track().unwrap().index, 0);

        let mut empty = Session::new(Library::new(), Matcher::default(), None);
        assert!(empty.next_track().is_none());
        assert!(empty.select_track(0).is_none());
    }

    #[test]
    fn test_manual_link_overrides_and_sticks() {
        let mut s = session();
        s.select_track(2);
        let change = s.link_manually("beta.txt").unwrap();
        assert_eq!(
            change.status,
            LinkStatus::Linked {
                lyric_key: "beta.txt".into(),
                source: LinkSource::Manual,
            }
        );

        s.select_track(0);
        let change = s.select_track(2).unwrap();
        assert_eq!(
            change.status,
            LinkStatus::Linked {
                lyric_key: "beta.txt".into(),
                source: LinkSource::Saved,
            }
        );
        assert!(s.link_manually("nope.lrc").is_err());
    }

    #[test]
    fn test_link_manually_requires_track() {
        let mut s = session();
        assert!(s.link_manually("beta.txt").is_err());
    }

    #[test]
    fn test_unlink_current() {
        let mut s = session();
        s.select_track(0);
        assert!(s.unlink_current());
        assert_eq!(*s.status(), LinkStatus::Unlinked);
        assert!(s.links().get("alpha").is_none());
        assert!(!s.unlink_current());
    }

    #[test]
    fn test_stale_tickets_are_rejected() {
        let mut s = session();
        s.select_track(0);
        s.on_position(1.5);
        let ticket = s.ticket_for_current_line().unwrap();
        assert_eq!(ticket.text, "a one");
        assert!(s.accepts(&ticket));

        // Same document, later line: ticket is still valid.
        s.on_position(5.0);
        assert!(s.accepts(&ticket));

        s.next_track();
        assert!(!s.accepts(&ticket));
    }

    #[test]
    fn test_links_persist_across_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("links.sqlite3");

        let mut s = Session::new(library(), Matcher::default(), Some(Storage::open(&db).unwrap()));
        s.select_track(2);
        s.link_manually("alpha.lrc").unwrap();
        drop(s);

        let mut s = Session::new(library(), Matcher::default(), Some(Storage::open(&db).unwrap()));
        assert_eq!(s.links().get("gamma"), Some("alpha.lrc"));
        let change = s.select_track(2).unwrap();
        assert_eq!(
            change.status,
            LinkStatus::Linked {
                lyric_key: "alpha.lrc".into(),
                source: LinkSource::Saved,
            }
        );
    }

    #[test]
    fn test_import_relinks_current_track() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("gamma.lrc"), "[00:02.00]g").unwrap();

        let mut s = session();
        s.select_track(2);
        assert_eq!(*s.status(), LinkStatus::Unlinked);

        let (summary, change) = s.import(&[dir.path().to_path_buf()], &ImportConfig::default());
        assert_eq!(summary.lyrics, 1);
        let change = change.unwrap();
        assert!(matches!(change.status, LinkStatus::Linked { ref lyric_key, .. } if lyric_key == "gamma.lrc"));
    }
}
