//! Local filesystem storage backend.
//!
//! Posts are appended to `posts.jsonl`, one JSON record per line; the run
//! statistics snapshot goes to `stats.json` with a write-temp-then-rename
//! so readers never observe a partial file.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{CrawlStats, PostRecord};
use crate::storage::{PersistedId, PostSink};

const POSTS_FILE: &str = "posts.jsonl";
const STATS_FILE: &str = "stats.json";

/// Local filesystem storage backend.
pub struct LocalStorage {
    root_dir: PathBuf,
    next_id: Mutex<PersistedId>,
}

impl LocalStorage {
    /// Create a LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            next_id: Mutex::new(1),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Append one line to a file, creating it on first use.
    async fn append_line(&self, key: &str, line: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }

    /// Read all persisted records, in insertion order.
    pub async fn load_posts(&self) -> Result<Vec<PostRecord>> {
        let path = self.path(POSTS_FILE);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut posts = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            posts.push(serde_json::from_str(line)?);
        }
        Ok(posts)
    }

    /// Read the latest statistics snapshot, if any.
    pub async fn load_stats(&self) -> Result<Option<serde_json::Value>> {
        let path = self.path(STATS_FILE);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl PostSink for LocalStorage {
    async fn create(&self, record: &PostRecord) -> Result<PersistedId> {
        let line = serde_json::to_vec(record)?;

        // Lock covers the append so concurrent creates cannot interleave
        // partial lines.
        let mut next_id = self.next_id.lock().await;
        self.append_line(POSTS_FILE, &line)
            .await
            .map_err(|e| AppError::persistence(format!("append failed for {}: {}", record.link, e)))?;

        let id = *next_id;
        *next_id += 1;
        Ok(id)
    }

    async fn write_stats(&self, stats: &CrawlStats) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(stats)?;
        self.write_bytes(STATS_FILE, &bytes).await
    }
}
