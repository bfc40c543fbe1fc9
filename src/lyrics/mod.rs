//! Lyrics module for loading and parsing lyric files
//!
//! This module provides:
//! - LRC / plain text parser
//! - Text decoding with a legacy-encoding fallback
//! - Data structures for lyrics display

pub mod parser;

pub use parser::{LyricDocument, LyricLine, format_timestamp};

use anyhow::Context;
use encoding_rs::{Encoding, WINDOWS_1252};
use std::path::Path;

/// Decode raw lyric file bytes.
///
/// A BOM wins, then strict UTF-8, then the `fallback` WHATWG label
/// (e.g. "windows-1252", "shift_jis"). Unknown labels use windows-1252.
pub fn decode_text(bytes: &[u8], fallback: &str) -> String {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return text.into_owned();
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    let encoding = Encoding::for_label(fallback.trim().as_bytes()).unwrap_or_else(|| {
        tracing::warn!(label = fallback, "unknown fallback encoding, using windows-1252");
        WINDOWS_1252
    });
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::debug!(encoding = encoding.name(), "lyrics decoded with replacement characters");
    }
    text.into_owned()
}

/// Read, decode and parse a lyric file.
pub fn load_document(path: &Path, fallback: &str) -> anyhow::Result<LyricDocument> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    Ok(LyricDocument::parse(&decode_text(&bytes, fallback)))
}
