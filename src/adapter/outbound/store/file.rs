//! JSON file cursor store.
//!
//! Persists only the watermark. Always available, no seen-set, so the
//! pipeline runs with [`StoreCapability::BestEffort`] guarantees.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::domain::{Cursor, EventId, StoreCapability, StreamName};
use crate::error::Result;
use crate::port::outbound::cursor::CursorStore;

/// On-disk representation.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CursorFile {
    stream: String,
    last_ts: u64,
}

/// Cursor store backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct FileCursorStore {
    path: PathBuf,
    stream: StreamName,
}

impl FileCursorStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, stream: StreamName) -> Self {
        Self {
            path: path.into(),
            stream,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "cursor".to_string());
        self.path.with_file_name(format!(".{name}.tmp"))
    }

    fn decode(&self, content: &str) -> Cursor {
        match serde_json::from_str::<CursorFile>(content) {
            Ok(file) if file.stream == self.stream.as_str() => Cursor::new(file.last_ts),
            Ok(file) => {
                warn!(
                    path = %self.path.display(),
                    found = %file.stream,
                    expected = %self.stream,
                    "Cursor file belongs to another stream, starting from zero"
                );
                Cursor::zero()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Unreadable cursor file, starting from zero");
                Cursor::zero()
            }
        }
    }
}

#[async_trait]
impl CursorStore for FileCursorStore {
    async fn load(&self) -> Cursor {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => self.decode(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No cursor file yet");
                Cursor::zero()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read cursor file, starting from zero");
                Cursor::zero()
            }
        }
    }

    async fn save(&self, cursor: Cursor) -> Result<()> {
        let body = serde_json::to_vec(&CursorFile {
            stream: self.stream.as_str().to_string(),
            last_ts: cursor.last_ts,
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp = self.temp_path();
        let mut file = tokio::fs::File::create(&temp).await?;
        file.write_all(&body).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }

    async fn mark_seen(&self, _ts: u64, _id: &EventId) -> Result<()> {
        Ok(())
    }

    async fn is_seen(&self, _ts: u64, _id: &EventId) -> Result<bool> {
        Ok(false)
    }

    async fn rotate(&self, _old_ts: u64, _new_ts: u64) -> Result<()> {
        Ok(())
    }

    fn capability(&self) -> StoreCapability {
        StoreCapability::BestEffort
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir, stream: &str) -> FileCursorStore {
        FileCursorStore::new(dir.path().join("cursor.json"), StreamName::new(stream))
    }

    #[tokio::test]
    async fn missing_file_loads_zero() {
        let dir = TempDir::new().unwrap();
        assert_eq!(store_in(&dir, "subgraph").load().await, Cursor::zero());
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, "subgraph");

        store.save(Cursor::new(1_700_000_123)).await.unwrap();

        assert_eq!(store.load().await, Cursor::new(1_700_000_123));
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn writes_camel_case_json() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, "chain");
        store.save(Cursor::new(42)).await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["lastTs"], 42);
        assert_eq!(value["stream"], "chain");
    }

    #[tokio::test]
    async fn other_stream_is_treated_as_absent() {
        let dir = TempDir::new().unwrap();
        store_in(&dir, "chain").save(Cursor::new(39_000_000)).await.unwrap();

        assert_eq!(store_in(&dir, "subgraph").load().await, Cursor::zero());
    }

    #[tokio::test]
    async fn garbage_file_loads_zero() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, "subgraph");
        std::fs::write(store.path(), "{not json").unwrap();

        assert_eq!(store.load().await, Cursor::zero());
    }

    #[tokio::test]
    async fn creates_missing_parent_directory() {
        let dir = TempDir::new().unwrap();
        let store = FileCursorStore::new(
            dir.path().join("state").join("cursor.json"),
            StreamName::new("subgraph"),
        );

        store.save(Cursor::new(7)).await.unwrap();

        assert_eq!(store.load().await, Cursor::new(7));
    }

    #[tokio::test]
    async fn never_reports_seen() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, "subgraph");
        store.mark_seen(1, &EventId::new("a")).await.unwrap();

        assert!(!store.is_seen(1, &EventId::new("a")).await.unwrap());
        assert_eq!(store.capability(), StoreCapability::BestEffort);
    }
}
