use crate::lyrics::LyricDocument;

/// Index of the line that should be highlighted at playback position `t`
/// (seconds): the last line whose timestamp is `<= t`.
///
/// Returns `None` before the first timestamp and for plain documents.
/// Each call scans from the start so seeks in either direction are handled.
pub fn active_line(doc: &LyricDocument, t: f64) -> Option<usize> {
    if !doc.is_timed() || t.is_nan() {
        return None;
    }

    let mut last = None;
    for line in &doc.lines {
        let Some(ts) = line.timestamp else {
            continue;
        };
        if ts > t {
            break;
        }
        last = Some(line.index);
    }
    last
}
