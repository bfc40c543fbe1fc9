pub mod clock;
pub mod mpv;

use clock::ClockHandle;
use mpv::MpvHandle;
use std::path::Path;

/// Whatever is producing playback positions.
#[derive(Debug)]
pub enum Transport {
    Mpv(MpvHandle),
    Clock(ClockHandle),
}

impl Transport {
    pub fn name(&self) -> &'static str {
        match self {
            Transport::Mpv(_) => "mpv",
            Transport::Clock(_) => "clock",
        }
    }

    pub async fn load(&self, path: &Path) -> anyhow::Result<()> {
        match self {
            Transport::Mpv(h) => h.load_file(path).await,
            Transport::Clock(h) => h.load().await,
        }
    }

    pub async fn toggle_pause(&self) -> anyhow::Result<()> {
        match self {
            Transport::Mpv(h) => h.toggle_pause().await,
            Transport::Clock(h) => h.toggle_pause().await,
        }
    }

    pub async fn seek_relative(&self, seconds: f64) -> anyhow::Result<()> {
        match self {
            Transport::Mpv(h) => h.seek_relative(seconds).await,
            Transport::Clock(h) => h.seek_relative(seconds).await,
        }
    }

    /// No-op for the silent clock.
    pub async fn set_volume(&self, volume_0_100: u8) -> anyhow::Result<()> {
        match self {
            Transport::Mpv(h) => h.set_volume(volume_0_100).await,
            Transport::Clock(_) => Ok(()),
        }
    }
}
