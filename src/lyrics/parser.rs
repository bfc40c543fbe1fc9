//! LRC format parser
//!
//! Parses synchronized lyrics in LRC format as well as plain text:
//! [mm:ss.xx] Lyrics line here
//!
//! Example:
//! [ti:Test Song]
//! [00:12.34] Hello world
//! [00:15.00][01:02.5] Repeated chorus line

use once_cell::sync::Lazy;
use regex::Regex;

/// `[ti:...]`, `[ar:...]`, `[offset:...]` and friends.
static METADATA_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[[A-Za-z]{1,8}:").expect("metadata tag regex"));

/// Anything shaped like a timestamp tag; range checks happen in `parse_timestamp`.
static TIMESTAMP_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(\d+):(\d{1,2})(?:[.,](\d{1,3}))?\]").expect("timestamp tag regex")
});

/// A single line of lyrics
#[derive(Debug, Clone, PartialEq)]
pub struct LyricLine {
    /// Position of the line inside its document
    pub index: usize,
    /// Seconds from the start of the track, `None` for plain lines
    pub timestamp: Option<f64>,
    /// The lyrics text
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// At least one line carried a timestamp tag.
    Timed,
    /// Display-only lyrics.
    Plain,
}

/// Parsed lyrics, immutable once built
#[derive(Debug, Clone, PartialEq)]
pub struct LyricDocument {
    pub kind: DocumentKind,
    pub lines: Vec<LyricLine>,
}

impl Default for LyricDocument {
    fn default() -> Self {
        Self::empty()
    }
}

impl LyricDocument {
    pub fn empty() -> Self {
        Self {
            kind: DocumentKind::Plain,
            lines: Vec::new(),
        }
    }

    /// Parse LRC formatted or plain lyrics. Never fails: anything that does not
    /// look like a valid tag is kept as text or skipped.
    pub fn parse(content: &str) -> Self {
        let mut lines: Vec<(Option<f64>, String)> = Vec::new();
        let mut timed = false;

        for line in content.split(['\r', '\n']) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            // Skip metadata tags like [ti:Title]
            if METADATA_TAG.is_match(line) {
                continue;
            }

            let (timestamps, text) = Self::split_tags(line);
            if !timestamps.is_empty() {
                timed = true;
                // A bare [mm:ss] marker has nothing to display.
                if text.is_empty() {
                    continue;
                }
                lines.extend(timestamps.into_iter().map(|ts| (Some(ts), text.clone())));
            } else if !text.is_empty() {
                lines.push((None, text));
            }
        }

        if timed {
            // sort_by is stable, equal timestamps keep their input order
            lines.sort_by(|a, b| a.0.unwrap_or(0.0).total_cmp(&b.0.unwrap_or(0.0)));
        }

        let lines = lines
            .into_iter()
            .enumerate()
            .map(|(index, (timestamp, text))| LyricLine {
                index,
                timestamp,
                text,
            })
            .collect();

        Self {
            kind: if timed {
                DocumentKind::Timed
            } else {
                DocumentKind::Plain
            },
            lines,
        }
    }

    pub fn is_timed(&self) -> bool {
        self.kind == DocumentKind::Timed
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, index: usize) -> Option<&LyricLine> {
        self.lines.get(index)
    }

    /// Pull every timestamp tag out of a line, returning the valid timestamps
    /// and the remaining text.
    fn split_tags(line: &str) -> (Vec<f64>, String) {
        let timestamps = TIMESTAMP_TAG
            .captures_iter(line)
            .filter_map(|caps| {
                Self::parse_timestamp(
                    caps.get(1)?.as_str(),
                    caps.get(2)?.as_str(),
                    caps.get(3).map(|m| m.as_str()),
                )
            })
            .collect();
        let text = TIMESTAMP_TAG.replace_all(line, "").trim().to_string();
        (timestamps, text)
    }

    /// Convert tag parts to seconds. The fraction is right-padded to three
    /// digits and read as milliseconds: ".5" is 500ms, ".12" is 120ms.
    fn parse_timestamp(min: &str, sec: &str, frac: Option<&str>) -> Option<f64> {
        let min: u64 = min.parse().ok()?;
        let sec: u64 = sec.parse().ok()?;
        if sec > 59 {
            return None;
        }
        let ms: u64 = match frac {
            Some(f) => format!("{f:0<3}").parse().ok()?,
            None => 0,
        };
        let total_ms = min.checked_mul(60_000)?.checked_add(sec * 1000 + ms)?;
        Some(total_ms as f64 / 1000.0)
    }
}

/// Render seconds as an LRC-style `mm:ss.xx` timestamp.
pub fn format_timestamp(seconds: f64) -> String {
    let total_cs = (seconds.max(0.0) * 100.0).round() as u64;
    let min = total_cs / 6000;
    let sec = (total_cs % 6000) / 100;
    let cs = total_cs % 100;
    format!("{min:02}:{sec:02}.{cs:02}")
}
