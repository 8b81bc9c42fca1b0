//! Download cache shared between runs.
//!
//! Downloads are copied into a flat cache directory keyed by file name
//! (`{id}.mp3`, `{id}_video.mp4`). An entry older than the expiry is never
//! served and is deleted when found.

use crate::error::{ErrorKind, Result};
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;

#[derive(Debug, Clone)]
pub struct DownloadCache {
    dir: PathBuf,
    expiry: Duration,
}
impl DownloadCache {
    pub fn new(dir: impl Into<PathBuf>, expiry: Duration) -> Self {
        Self { dir: dir.into(), expiry }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deletes every expired entry, returning how many were removed. A missing
    /// cache directory is simply empty.
    pub async fn sweep(&self) -> Result<usize> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(0),
            Err(e) => exn::bail!(ErrorKind::Io(e)),
        };
        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await.map_err(ErrorKind::Io)? {
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if metadata.is_file() && self.is_expired(metadata.modified().ok()) {
                match fs::remove_file(entry.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) => {
                        let path = entry.path();
                        tracing::debug!(path = %path.display(), error = %e, "Could not remove expired cache entry");
                    },
                }
            }
        }
        if removed > 0 {
            tracing::info!(removed, dir = %self.dir.display(), "Swept expired cache entries");
        }
        Ok(removed)
    }

    /// Copies a fresh cached entry to `dest`. Returns `false` on a miss; an
    /// expired entry is deleted and counts as a miss.
    pub async fn fetch(&self, key: &str, dest: &Path) -> bool {
        let Some(path) = self.entry(key) else {
            return false;
        };
        let Ok(metadata) = fs::metadata(&path).await else {
            return false;
        };
        if self.is_expired(metadata.modified().ok()) {
            tracing::debug!(key, "Cache entry expired");
            let _ = fs::remove_file(&path).await;
            return false;
        }
        match fs::copy(&path, dest).await {
            Ok(_) => {
                tracing::debug!(key, "Cache hit");
                true
            },
            Err(e) => {
                tracing::warn!(key, error = %e, "Could not copy cached entry");
                false
            },
        }
    }

    /// Stores a copy of `src` under `key`. Failing to cache never fails the
    /// download it belongs to.
    pub async fn store(&self, key: &str, src: &Path) {
        let Some(path) = self.entry(key) else {
            return;
        };
        if let Err(e) = fs::create_dir_all(&self.dir).await {
            tracing::warn!(dir = %self.dir.display(), error = %e, "Could not create cache directory");
            return;
        }
        if let Err(e) = fs::copy(src, &path).await {
            tracing::warn!(key, error = %e, "Could not store download in cache");
        }
    }

    /// Keys must be plain file names so an entry can never land outside the
    /// cache directory.
    fn entry(&self, key: &str) -> Option<PathBuf> {
        match Path::new(key).file_name().is_some_and(|name| name == key) {
            true => Some(self.dir.join(key)),
            false => {
                tracing::warn!(key, "Refusing cache key that is not a plain file name");
                None
            },
        }
    }

    /// Entries with an unreadable or future timestamp count as fresh.
    fn is_expired(&self, modified: Option<SystemTime>) -> bool {
        modified.and_then(|m| m.elapsed().ok()).is_some_and(|age| age > self.expiry)
    }
}
