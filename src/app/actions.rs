use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    Help,
    Status,

    // Transport
    TogglePause,
    SeekForward,
    SeekBack,

    // Tracks
    NextTrack,
    PrevTrack,
    SelectTrack(usize),
    ListTracks,

    // Lyrics
    ListLyrics,
    Import(PathBuf),
    Link(LinkTarget),
    Unlink,
    Highlight(usize),

    // Translation
    ToggleTranslation,
    RetryTranslation,
}

/// Lyrics chosen by list position or by file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    Index(usize),
    Key(String),
}
