//! File name normalization used to pair tracks with lyric files.

use once_cell::sync::Lazy;
use regex::Regex;

static EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.[A-Za-z0-9]{1,5}$").expect("extension regex"));

static TRACK_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d{1,3}[-_.\s]*").expect("track number regex"));

static ANNOTATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(.*?\)|\[.*?\]|\{.*?\}").expect("annotation regex"));

static STOP_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?-u:\b)(?:remaster(?:ed)?|mono|stereo|live|demo|version|edit|mix|feat\.?|ft\.?|official|audio|lyrics?)(?-u:\b)",
    )
    .expect("stop word regex")
});

static SEPARATORS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^a-z0-9\x{3040}-\x{30ff}\x{4e00}-\x{9faf}]+").expect("separator regex")
});

/// File name without its extension.
pub fn base_name(name: &str) -> &str {
    match EXTENSION.find(name) {
        Some(m) if m.start() > 0 => &name[..m.start()],
        _ => name,
    }
}

/// Canonical form of a track or lyric file name.
///
/// `"01 - Song Title (Remastered 2019).lrc"` and `"song title.txt"` both
/// become `"song title"`.
pub fn normalize(name: &str) -> String {
    let lower = name.to_lowercase();
    let s = strip_track_number(base_name(&lower));
    let s = ANNOTATION.replace_all(s, " ");
    let s = STOP_WORDS.replace_all(&s, " ");
    let s = SEPARATORS.replace_all(&s, " ");
    s.trim().to_string()
}

/// Drop a leading "01 - " style prefix. A longer leading number ("1979")
/// or a name that is only a number ("99") is kept.
fn strip_track_number(s: &str) -> &str {
    let Some(m) = TRACK_NUMBER.find(s) else {
        return s;
    };
    let digits = s.trim_start().bytes().take_while(u8::is_ascii_digit).count();
    let rest = &s[m.end()..];
    if digits > 3 || rest.trim().is_empty() {
        s
    } else {
        rest
    }
}

/// Two normalized names are candidates when equal or when one contains the other.
pub fn names_match(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && (a == b || a.contains(b) || b.contains(a))
}
