//! Track-to-lyrics linking and playback-time line lookup.

pub mod lookup;
pub mod normalize;

pub use lookup::active_line;

use crate::library::{Library, LyricEntry, Track};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Confidence of a track/lyrics pairing. Variants are ordered weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Score {
    /// One normalized name contains the other; holds the shorter length.
    Overlap(usize),
    /// Normalized names are equal.
    Exact,
    /// Raw base names are equal, before any normalization.
    Identical,
}

/// Persisted `normalized track key -> lyric document key` associations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkTable(BTreeMap<String, String>);

impl LinkTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, track_key: &str) -> Option<&str> {
        self.0.get(track_key).map(String::as_str)
    }

    pub fn insert(&mut self, track_key: impl Into<String>, lyric_key: impl Into<String>) {
        self.0.insert(track_key.into(), lyric_key.into());
    }

    pub fn remove(&mut self, track_key: &str) -> Option<String> {
        self.0.remove(track_key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSource {
    /// Reused from the link table (earlier match or manual choice).
    Saved,
    /// Chosen by the user in this session.
    Manual,
    /// Freshly computed.
    Matched(Score),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    Linked { lyric_key: String, source: LinkSource },
    NoMatch,
}

#[derive(Debug, Clone)]
pub struct Matcher {
    min_overlap: usize,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Matcher {
    pub fn new(min_overlap: usize) -> Self {
        Self {
            min_overlap: min_overlap.max(1),
        }
    }

    /// Score one lyric entry against a track. `None` means "not a candidate".
    pub fn score(&self, track: &Track, entry: &LyricEntry) -> Option<Score> {
        let (a, b) = (track.key.as_str(), entry.normalized.as_str());
        if !normalize::names_match(a, b) {
            return None;
        }
        if a == b {
            let raw_track = normalize::base_name(&track.name).to_lowercase();
            let raw_lyric = normalize::base_name(&entry.name).to_lowercase();
            return Some(if raw_track.trim() == raw_lyric.trim() {
                Score::Identical
            } else {
                Score::Exact
            });
        }
        let shorter = a.chars().count().min(b.chars().count());
        (shorter >= self.min_overlap).then_some(Score::Overlap(shorter))
    }

    /// Best lyric entry for `track`, ignoring saved links. Ties keep the first
    /// entry in library order.
    pub fn best_candidate<'a>(&self, track: &Track, library: &'a Library) -> Option<(&'a LyricEntry, Score)> {
        let mut best: Option<(&LyricEntry, Score)> = None;
        for entry in library.lyrics() {
            let Some(score) = self.score(track, entry) else {
                continue;
            };
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((entry, score));
            }
        }
        best
    }

    /// Pick lyrics for `track`. A saved link whose document is still known
    /// always wins; otherwise the best candidate is recorded in `links`.
    pub fn select_link(&self, track: &Track, library: &Library, links: &mut LinkTable) -> LinkOutcome {
        if let Some(saved) = links.get(&track.key)
            && library.lyric(saved).is_some()
        {
            return LinkOutcome::Linked {
                lyric_key: saved.to_string(),
                source: LinkSource::Saved,
            };
        }

        match self.best_candidate(track, library) {
            Some((entry, score)) => {
                links.insert(track.key.clone(), entry.key.clone());
                LinkOutcome::Linked {
                    lyric_key: entry.key.clone(),
                    source: LinkSource::Matched(score),
                }
            }
            None => LinkOutcome::NoMatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lyrics::LyricDocument;

    fn library(names: &[&str]) -> Library {
        let mut lib = Library::new();
        for name in names {
            lib.add_lyrics(LyricEntry::new(*name, LyricDocument::parse("[00:01.00]x")));
        }
        lib
    }

    fn track(name: &str) -> Track {
        Track::new(name, format!("/music/{name}"))
    }

    #[test]
    fn test_score_ordering() {
        assert!(Score::Overlap(100) < Score::Exact);
        assert!(Score::Exact < Score::Identical);
        assert!(Score::Overlap(3) < Score::Overlap(4));
    }

    #[test]
    fn test_exact_outranks_substring() {
        let m = Matcher::default();
        let mut links = LinkTable::new();

        let lib = library(&["song", "song (live)"]);
        let out = m.select_link(&track("song"), &lib, &mut links);
        assert_eq!(
            out,
            LinkOutcome::Linked {
                lyric_key: "song".into(),
                source: LinkSource::Matched(Score::Identical),
            }
        );

        // Iteration order must not matter.
        let mut links = LinkTable::new();
        let lib = library(&["song (live)", "song"]);
        let out = m.select_link(&track("song"), &lib, &mut links);
        assert!(matches!(out, LinkOutcome::Linked { ref lyric_key, .. } if lyric_key == "song"));
    }

    #[test]
    fn test_exact_beats_overlap() {
        let m = Matcher::default();
        let mut links = LinkTable::new();
        let lib = library(&["my song remix edition.lrc", "01 My Song.lrc"]);
        let out = m.select_link(&track("My Song.mp3"), &lib, &mut links);
        assert_eq!(
            out,
            LinkOutcome::Linked {
                lyric_key: "01 My Song.lrc".into(),
                source: LinkSource::Matched(Score::Exact),
            }
        );
    }

    #[test]
    fn test_longer_overlap_wins_and_ties_keep_first() {
        let m = Matcher::default();
        let t = track("the long song name extended.mp3");

        let lib = library(&["song.lrc", "long song name.lrc"]);
        let (entry, score) = m.best_candidate(&t, &lib).unwrap();
        assert_eq!(entry.key, "long song name.lrc");
        assert_eq!(score, Score::Overlap(14));

        let lib = library(&["long song.txt", "song name.txt"]);
        let (entry, _) = m.best_candidate(&t, &lib).unwrap();
        assert_eq!(entry.key, "long song.txt");
    }

    #[test]
    fn test_no_match() {
        let m = Matcher::default();
        let mut links = LinkTable::new();
        let lib = library(&["completely different.lrc"]);
        assert_eq!(m.select_link(&track("song.mp3"), &lib, &mut links), LinkOutcome::NoMatch);
        assert!(links.is_empty());

        assert_eq!(m.select_link(&track("song.mp3"), &Library::new(), &mut links), LinkOutcome::NoMatch);
    }

    #[test]
    fn test_empty_normalized_names_never_match() {
        let m = Matcher::default();
        let mut links = LinkTable::new();
        let lib = library(&["(instrumental).lrc"]);
        assert_eq!(m.select_link(&track("[intro].mp3"), &lib, &mut links), LinkOutcome::NoMatch);
    }

    #[test]
    fn test_min_overlap_threshold() {
        let lib = library(&["go.lrc"]);
        assert!(Matcher::new(3).best_candidate(&track("go west.mp3"), &lib).is_none());
        assert!(Matcher::new(2).best_candidate(&track("go west.mp3"), &lib).is_some());
    }

    #[test]
    fn test_saved_link_wins_over_better_candidate() {
        let m = Matcher::default();
        let lib = library(&["song.lrc", "other song words.lrc"]);
        let t = track("song.mp3");
        let mut links = LinkTable::new();
        links.insert(t.key.clone(), "other song words.lrc");

        let out = m.select_link(&t, &lib, &mut links);
        assert_eq!(
            out,
            LinkOutcome::Linked {
                lyric_key: "other song words.lrc".into(),
                source: LinkSource::Saved,
            }
        );
    }

    #[test]
    fn test_stale_saved_link_is_rematched() {
        let m = Matcher::default();
        let lib = library(&["song.lrc"]);
        let t = track("song.mp3");
        let mut links = LinkTable::new();
        links.insert(t.key.clone(), "gone.lrc");

        let out = m.select_link(&t, &lib, &mut links);
        assert!(matches!(out, LinkOutcome::Linked { source: LinkSource::Matched(_), .. }));
        assert_eq!(links.get("song"), Some("song.lrc"));
    }

    #[test]
    fn test_new_link_is_recorded() {
        let m = Matcher::default();
        let lib = library(&["01 - Song.lrc"]);
        let mut links = LinkTable::new();
        m.select_link(&track("Song (Remastered).flac"), &lib, &mut links);
        assert_eq!(links.get("song"), Some("01 - Song.lrc"));
    }

    #[test]
    fn test_link_table_serializes_flat() {
        let mut links = LinkTable::new();
        links.insert("song", "song.lrc");
        let raw = serde_json::to_string(&links).unwrap();
        assert_eq!(raw, r#"{"song":"song.lrc"}"#);
        let back: LinkTable = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, links);
    }
}
