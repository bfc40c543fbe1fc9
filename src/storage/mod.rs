use crate::matcher::LinkTable;
use anyhow::Context;
use rusqlite::{Connection, OptionalExtension, params};
use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};

/// Key of the link table row in `kv`.
const LINK_MAP_KEY: &str = "link_map";

pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
        }

        let conn = Connection::open(path).with_context(|| format!("open {}", path.display()))?;
        let s = Self { conn };
        s.init_schema()?;
        Ok(s)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory db")?;
        let s = Self { conn };
        s.init_schema()?;
        Ok(s)
    }

    fn init_schema(&self) -> anyhow::Result<()> {
        self.conn
            .execute_batch(
                r#"
CREATE TABLE IF NOT EXISTS kv (
  key TEXT PRIMARY KEY,
  value TEXT NOT NULL,
  updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS translation_cache (
  source_hash TEXT NOT NULL,
  langpair TEXT NOT NULL,
  source TEXT NOT NULL,
  translated TEXT NOT NULL,
  fetched_at INTEGER NOT NULL,
  PRIMARY KEY (source_hash, langpair)
);
"#,
            )
            .context("init schema")?;
        Ok(())
    }

    pub fn get_value(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key=?1", params![key], |row| row.get(0))
            .optional()
            .context("read kv")
    }

    pub fn set_value(&self, key: &str, value: &str, now_unix: i64) -> anyhow::Result<()> {
        self.conn
            .execute(
                r#"
INSERT INTO kv(key, value, updated_at)
VALUES(?1, ?2, ?3)
ON CONFLICT(key) DO UPDATE SET
  value=excluded.value,
  updated_at=excluded.updated_at
"#,
                params![key, value, now_unix],
            )
            .context("write kv")?;
        Ok(())
    }

    /// Load the saved track-to-lyrics links. A missing, unreadable or corrupt
    /// entry means "no links known".
    pub fn load_links(&self) -> LinkTable {
        let raw = match self.get_value(LINK_MAP_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return LinkTable::new(),
            Err(e) => {
                tracing::warn!("link table unavailable: {e:#}");
                return LinkTable::new();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!("ignoring corrupt link table: {e}");
            LinkTable::new()
        })
    }

    pub fn save_links(&self, links: &LinkTable) -> anyhow::Result<()> {
        let raw = serde_json::to_string(links).context("encode link table")?;
        self.set_value(LINK_MAP_KEY, &raw, unix_now())
    }

    pub fn clear_links(&self) -> anyhow::Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key=?1", params![LINK_MAP_KEY])
            .context("clear links")?;
        Ok(())
    }

    /// Cache a successful translation
    pub fn cache_translation(
        &self,
        source: &str,
        langpair: &str,
        translated: &str,
        now_unix: i64,
    ) -> anyhow::Result<()> {
        self.conn
            .execute(
                r#"
INSERT INTO translation_cache(source_hash, langpair, source, translated, fetched_at)
VALUES(?1, ?2, ?3, ?4, ?5)
ON CONFLICT(source_hash, langpair) DO UPDATE SET
  translated=excluded.translated,
  fetched_at=excluded.fetched_at
"#,
                params![source_hash(source), langpair, source, translated, now_unix],
            )
            .context("cache translation")?;
        Ok(())
    }

    /// Get a cached translation
    pub fn get_translation(&self, source: &str, langpair: &str) -> anyhow::Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT translated FROM translation_cache WHERE source_hash=?1 AND langpair=?2",
                params![source_hash(source), langpair],
                |row| row.get(0),
            )
            .optional()
            .context("read translation cache")
    }

    /// Returns the number of removed rows.
    pub fn clear_translations(&self) -> anyhow::Result<usize> {
        self.conn
            .execute("DELETE FROM translation_cache", [])
            .context("clear translation cache")
    }
}

// rusqlite connections stay on one thread: async tasks open per operation.
#[derive(Debug, Clone)]
pub struct StorageHandle {
    path: PathBuf,
}

impl StorageHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn open(&self) -> anyhow::Result<Storage> {
        Storage::open(&self.path)
    }

    pub fn get_translation(&self, source: &str, langpair: &str) -> anyhow::Result<Option<String>> {
        self.open()?.get_translation(source, langpair)
    }

    pub fn cache_translation(&self, source: &str, langpair: &str, translated: &str) -> anyhow::Result<()> {
        self.open()?
            .cache_translation(source, langpair, translated, unix_now())
    }
}

fn source_hash(source: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(source.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_roundtrip_through_kv() {
        let s = Storage::open_in_memory().unwrap();
        assert!(s.load_links().is_empty());

        let mut links = LinkTable::new();
        links.insert("song", "song.lrc");
        links.insert("other", "02 other.txt");
        s.save_links(&links).unwrap();

        assert_eq!(s.load_links(), links);
        assert_eq!(
            s.get_value(LINK_MAP_KEY).unwrap().as_deref(),
            Some(r#"{"other":"02 other.txt","song":"song.lrc"}"#)
        );
    }

    #[test]
    fn test_corrupt_links_degrade_to_empty() {
        let s = Storage::open_in_memory().unwrap();
        s.set_value(LINK_MAP_KEY, "{not json", 0).unwrap();
        assert!(s.load_links().is_empty());

        s.set_value(LINK_MAP_KEY, r#"["a","b"]"#, 0).unwrap();
        assert!(s.load_links().is_empty());
    }

    #[test]
    fn test_clear_links() {
        let s = Storage::open_in_memory().unwrap();
        let mut links = LinkTable::new();
        links.insert("a", "a.lrc");
        s.save_links(&links).unwrap();
        s.clear_links().unwrap();
        assert!(s.load_links().is_empty());
    }

    #[test]
    fn test_translation_cache() {
        let s = Storage::open_in_memory().unwrap();
        assert_eq!(s.get_translation("Hello", "en|ja").unwrap(), None);

        s.cache_translation("Hello", "en|ja", "こんにちは", 1).unwrap();
        s.cache_translation("Hello", "en|ja", "やあ", 2).unwrap();
        assert_eq!(s.get_translation("Hello", "en|ja").unwrap().as_deref(), Some("やあ"));
        assert_eq!(s.get_translation("Hello", "en|fr").unwrap(), None);

        assert_eq!(s.clear_translations().unwrap(), 1);
        assert_eq!(s.get_translation("Hello", "en|ja").unwrap(), None);
    }

    #[test]
    fn test_open_on_disk_and_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("db.sqlite3");
        let handle = StorageHandle::new(&path);
        handle.cache_translation("a", "en|ja", "b").unwrap();
        assert_eq!(handle.get_translation("a", "en|ja").unwrap().as_deref(), Some("b"));
        assert!(path.exists());
    }
}
