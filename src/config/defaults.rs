use super::Config;
use directories::ProjectDirs;
use std::path::PathBuf;

pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "aac", "wav", "flac", "ogg", "mp4", "m4p"];
pub const LYRICS_EXTENSIONS: &[&str] = &["lrc", "txt"];

pub fn defaults() -> Config {
    Config::default()
}

pub fn data_dir() -> PathBuf {
    ProjectDirs::from("dev", "lyricsync", "lyricsync")
        .map(|p| p.data_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("lyricsync"))
}
