//! In-memory collection of imported tracks and lyric documents.

use crate::config::ImportConfig;
use crate::lyrics::{self, LyricDocument};
use crate::matcher::normalize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// File name as shown to the user
    pub name: String,
    /// Normalized name, computed once at import
    pub key: String,
    /// What the player loads
    pub path: PathBuf,
}

impl Track {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let name = name.into();
        let key = normalize::normalize(&name);
        Self {
            name,
            key,
            path: path.into(),
        }
    }

    pub fn from_path(path: &Path) -> Self {
        Self::new(file_name(path), path)
    }
}

#[derive(Debug, Clone)]
pub struct LyricEntry {
    /// Lyric document key: the file name, unique within a library
    pub key: String,
    pub name: String,
    pub normalized: String,
    pub document: Arc<LyricDocument>,
}

impl LyricEntry {
    pub fn new(name: impl Into<String>, document: LyricDocument) -> Self {
        let name = name.into();
        Self {
            key: name.clone(),
            normalized: normalize::normalize(&name),
            name,
            document: Arc::new(document),
        }
    }
}

/// Counts reported after an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub tracks: usize,
    pub lyrics: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Library {
    tracks: Vec<Track>,
    lyrics: Vec<LyricEntry>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Lyric entries in import order.
    pub fn lyrics(&self) -> &[LyricEntry] {
        &self.lyrics
    }

    pub fn lyric(&self, key: &str) -> Option<&LyricEntry> {
        self.lyrics.iter().find(|e| e.key == key)
    }

    pub fn add_track(&mut self, track: Track) {
        self.tracks.push(track);
    }

    /// Add lyrics; an entry with the same key is replaced where it stands.
    pub fn add_lyrics(&mut self, entry: LyricEntry) {
        match self.lyrics.iter_mut().find(|e| e.key == entry.key) {
            Some(existing) => *existing = entry,
            None => self.lyrics.push(entry),
        }
    }

    /// Import files and directories. Unreadable lyric files are logged and
    /// skipped.
    pub fn import_paths(&mut self, paths: &[PathBuf], settings: &ImportConfig) -> ImportSummary {
        let mut summary = ImportSummary::default();
        let mut audio: Vec<PathBuf> = Vec::new();
        let mut lyric_files: Vec<PathBuf> = Vec::new();

        for path in paths {
            for file in collect_files(path, settings) {
                if has_extension(&file, &settings.audio_extensions) {
                    audio.push(file);
                } else if has_extension(&file, &settings.lyrics_extensions) {
                    lyric_files.push(file);
                }
            }
        }

        audio.sort_by_key(|p| file_name(p).to_lowercase());
        lyric_files.sort_by_key(|p| file_name(p).to_lowercase());

        for path in audio {
            self.add_track(Track::from_path(&path));
            summary.tracks += 1;
        }

        self.add_lyric_files(&lyric_files, &settings.fallback_encoding, &mut summary);
        summary
    }

    fn add_lyric_files(&mut self, files: &[PathBuf], fallback: &str, summary: &mut ImportSummary) {
        for path in files {
            match lyrics::load_document(path, fallback) {
                Ok(doc) => {
                    self.add_lyrics(LyricEntry::new(file_name(path), doc));
                    summary.lyrics += 1;
                }
                Err(e) => {
                    tracing::warn!("skipping lyrics {}: {e:#}", path.display());
                    summary.skipped += 1;
                }
            }
        }
    }
}

fn collect_files(root: &Path, settings: &ImportConfig) -> Vec<PathBuf> {
    if root.is_file() {
        return vec![root.to_path_buf()];
    }

    let mut walker = WalkDir::new(root).follow_links(true);
    if !settings.recursive {
        walker = walker.max_depth(1);
    }

    walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

fn has_extension(path: &Path, exts: &[String]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            exts.iter()
                .any(|e| e.trim().trim_start_matches('.').eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ImportConfig {
        ImportConfig::default()
    }

    #[test]
    fn test_track_key_is_normalized() {
        let t = Track::new("02 - Hello (Live).mp3", "/music/02 - Hello (Live).mp3");
        assert_eq!(t.key, "hello");
        assert_eq!(t.name, "02 - Hello (Live).mp3");
    }

    #[test]
    fn test_add_lyrics_replaces_in_place() {
        let mut lib = Library::new();
        lib.add_lyrics(LyricEntry::new("a.lrc", LyricDocument::parse("one")));
        lib.add_lyrics(LyricEntry::new("b.lrc", LyricDocument::parse("two")));
        lib.add_lyrics(LyricEntry::new("a.lrc", LyricDocument::parse("three")));

        let keys: Vec<&str> = lib.lyrics().iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["a.lrc", "b.lrc"]);
        assert_eq!(lib.lyric("a.lrc").unwrap().document.lines[0].text, "three");
    }

    #[test]
    fn test_unreadable_lyrics_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.lrc");
        std::fs::write(&good, "[00:01.00]fine").unwrap();
        let gone = dir.path().join("gone.lrc");

        let mut lib = Library::new();
        let mut summary = ImportSummary::default();
        lib.add_lyric_files(&[gone, good], "windows-1252", &mut summary);

        assert_eq!(summary, ImportSummary { tracks: 0, lyrics: 1, skipped: 1 });
        assert!(lib.lyric("good.lrc").is_some());
        assert!(lib.lyric("gone.lrc").is_none());
    }

    #[test]
    fn test_same_normalized_name_does_not_collide() {
        let mut lib = Library::new();
        lib.add_lyrics(LyricEntry::new("song.lrc", LyricDocument::parse("a")));
        lib.add_lyrics(LyricEntry::new("song (live).lrc", LyricDocument::parse("b")));
        assert_eq!(lib.lyrics().len(), 2);
    }

    #[test]
    fn test_import_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join("02 - Beta.mp3"), b"").unwrap();
        std::fs::write(root.join("01 - Alpha.FLAC"), b"").unwrap();
        std::fs::write(root.join("alpha.lrc"), "[00:01.00]A").unwrap();
        std::fs::write(root.join("notes.pdf"), b"").unwrap();
        std::fs::write(root.join(".hidden.mp3"), b"").unwrap();
        std::fs::create_dir(root.join("sub")).unwrap();
        std::fs::write(root.join("sub").join("beta.txt"), "plain words").unwrap();

        let mut lib = Library::new();
        let summary = lib.import_paths(&[root.to_path_buf()], &settings());

        assert_eq!(summary, ImportSummary { tracks: 2, lyrics: 2, skipped: 0 });
        let names: Vec<&str> = lib.tracks().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["01 - Alpha.FLAC", "02 - Beta.mp3"]);
        assert!(lib.lyric("alpha.lrc").unwrap().document.is_timed());
        assert!(!lib.lyric("beta.txt").unwrap().document.is_timed());
    }

    #[test]
    fn test_import_non_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir(root.join("sub")).unwrap();
        std::fs::write(root.join("sub").join("deep.mp3"), b"").unwrap();

        let mut cfg = settings();
        cfg.recursive = false;
        let mut lib = Library::new();
        let summary = lib.import_paths(&[root.to_path_buf()], &cfg);
        assert_eq!(summary.tracks, 0);
    }

    #[test]
    fn test_import_single_files() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("x.ogg");
        std::fs::write(&audio, b"").unwrap();

        let mut lib = Library::new();
        let summary = lib.import_paths(&[audio], &settings());
        assert_eq!(summary.tracks, 1);
        assert_eq!(lib.track(0).unwrap().key, "x");
    }
}
