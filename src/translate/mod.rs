//! Line-by-line lyric translation
//!
//! This module provides:
//! - MyMemory API client
//! - In-memory and on-disk caches keyed by source text

pub mod mymemory;

pub use mymemory::MyMemoryClient;

use crate::config::TranslateConfig;
use crate::storage::StorageHandle;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

/// Per-line translation failure. Never fatal for playback.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("translation API error {status}: {details}")]
    Api { status: u16, details: String },

    #[error("rate limited by the translation service")]
    RateLimited,

    #[error("translation was empty")]
    Empty,

    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Cached translator, cheap to clone into spawned tasks.
#[derive(Clone)]
pub struct Translator {
    client: MyMemoryClient,
    memory: Arc<Mutex<LruCache<String, String>>>,
    storage: Option<StorageHandle>,
}

impl Translator {
    pub fn new(client: MyMemoryClient, capacity: usize, storage: Option<StorageHandle>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            client,
            memory: Arc::new(Mutex::new(LruCache::new(capacity))),
            storage,
        }
    }

    pub fn from_config(cfg: &TranslateConfig, storage: Option<StorageHandle>) -> anyhow::Result<Self> {
        let client = MyMemoryClient::new(
            cfg.endpoint.clone(),
            cfg.langpair.clone(),
            cfg.email.clone(),
            std::time::Duration::from_secs(cfg.timeout_secs.max(1)),
        )?;
        Ok(Self::new(client, cfg.cache_capacity, storage))
    }

    /// In-memory hit only; never blocks on disk or network.
    pub fn cached(&self, text: &str) -> Option<String> {
        let key = text.trim();
        let mut memory = self.memory.lock().ok()?;
        memory.get(key).cloned()
    }

    fn remember(&self, text: &str, translated: &str) {
        if let Ok(mut memory) = self.memory.lock() {
            memory.put(text.trim().to_string(), translated.to_string());
        }
    }

    /// Translate `text`, consulting the caches first. Only successful results
    /// are cached.
    pub async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        let source = text.trim().to_string();
        if source.is_empty() {
            return Err(TranslateError::Empty);
        }
        if let Some(hit) = self.cached(&source) {
            return Ok(hit);
        }

        let langpair = self.client.langpair().to_string();

        if let Some(storage) = self.storage.clone() {
            let (src, pair) = (source.clone(), langpair.clone());
            match tokio::task::spawn_blocking(move || storage.get_translation(&src, &pair)).await {
                Ok(Ok(Some(hit))) => {
                    self.remember(&source, &hit);
                    return Ok(hit);
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) => tracing::debug!("translation cache read failed: {e:#}"),
                Err(e) => tracing::debug!("translation cache task failed: {e}"),
            }
        }

        let translated = self.client.translate(&source).await?;
        self.remember(&source, &translated);

        if let Some(storage) = self.storage.clone() {
            let (src, out) = (source, translated.clone());
            let _ = tokio::task::spawn_blocking(move || {
                if let Err(e) = storage.cache_translation(&src, &langpair, &out) {
                    tracing::warn!("failed to cache translation: {e:#}");
                }
            })
            .await;
        }

        Ok(translated)
    }
}
