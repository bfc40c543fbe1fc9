use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub mod defaults;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub import: ImportConfig,
    pub matcher: MatcherConfig,
    pub sync: SyncConfig,
    pub player: PlayerConfig,
    pub translate: TranslateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub audio_extensions: Vec<String>,
    pub lyrics_extensions: Vec<String>,
    /// Walk into subdirectories of imported folders.
    pub recursive: bool,
    pub include_hidden: bool,
    /// WHATWG label tried when a lyric file is not valid UTF-8.
    pub fallback_encoding: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Shortest substring overlap accepted as a match.
    pub min_overlap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Position update interval of the internal clock, in milliseconds.
    pub tick_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerBackend {
    Mpv,
    Clock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub backend: PlayerBackend,
    /// mpv audio device name (see `mpv --audio-device=help`)
    pub audio_device: Option<String>,
    /// Volume level (0-100)
    pub volume: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    /// Show translations while playing.
    pub enabled: bool,
    pub endpoint: String,
    /// MyMemory language pair, e.g. "en|ja".
    pub langpair: String,
    /// Contact address sent to MyMemory for a larger free quota.
    pub email: Option<String>,
    pub timeout_secs: u64,
    /// Entries kept in the in-memory translation cache.
    pub cache_capacity: usize,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            audio_extensions: defaults::AUDIO_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            lyrics_extensions: defaults::LYRICS_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            recursive: true,
            include_hidden: false,
            fallback_encoding: "windows-1252".to_string(),
        }
    }
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self { min_overlap: 1 }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { tick_ms: 180 }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            backend: PlayerBackend::Mpv,
            audio_device: None,
            volume: 100,
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "https://api.mymemory.translated.net/get".to_string(),
            langpair: "en|ja".to_string(),
            email: None,
            timeout_secs: 10,
            cache_capacity: 512,
        }
    }
}

impl Config {
    pub fn database_path(&self) -> PathBuf {
        self.paths.data_dir.join("lyricsync.sqlite3")
    }
}

pub fn save(cfg: &Config, override_path: Option<&Path>) -> anyhow::Result<()> {
    let path = match override_path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };
    write_config(cfg, &path)
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let proj = ProjectDirs::from("dev", "lyricsync", "lyricsync").context("ProjectDirs unavailable")?;
    Ok(proj.config_dir().join("config.toml"))
}

pub fn load(override_path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match override_path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };

    if !path.exists() {
        let cfg = defaults::defaults();
        write_config(&cfg, &path)?;
        return Ok(cfg);
    }

    let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let cfg = toml::from_str::<Config>(&raw).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

fn write_config(cfg: &Config, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }
    let raw = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(path, raw).with_context(|| format!("write {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg").join("config.toml");
        let cfg = load(Some(&path)).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.sync.tick_ms, 180);
        assert_eq!(cfg.translate.langpair, "en|ja");

        let again = load(Some(&path)).unwrap();
        assert_eq!(again.import.audio_extensions, cfg.import.audio_extensions);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[player]\nbackend = \"clock\"\n\n[translate]\nenabled = true\nlangpair = \"en|fr\"\n",
        )
        .unwrap();

        let cfg = load(Some(&path)).unwrap();
        assert_eq!(cfg.player.backend, PlayerBackend::Clock);
        assert!(cfg.translate.enabled);
        assert_eq!(cfg.translate.langpair, "en|fr");
        assert_eq!(cfg.translate.timeout_secs, 10);
        assert_eq!(cfg.matcher.min_overlap, 1);
        assert!(cfg.import.lyrics_extensions.contains(&"lrc".to_string()));
    }

    #[test]
    fn test_invalid_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[player]\nbackend = \"vlc\"\n").unwrap();
        assert!(load(Some(&path)).is_err());
    }

    #[test]
    fn test_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = defaults::defaults();
        cfg.player.volume = 42;
        cfg.translate.email = Some("me@example.com".into());
        save(&cfg, Some(&path)).unwrap();

        let back = load(Some(&path)).unwrap();
        assert_eq!(back.player.volume, 42);
        assert_eq!(back.translate.email.as_deref(), Some("me@example.com"));
    }
}
