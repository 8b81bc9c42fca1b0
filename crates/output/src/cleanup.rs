//! Intermediate artifact tracking.
//!
//! Everything a run creates besides its final tracks (downloads, normalized
//! videos, concat lists, partially written tracks, the scratch directory
//! itself) is registered with a [`CleanupCoordinator`] as soon as it exists.
//! Whichever way the run ends, the coordinator removes all of it.

use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Outcome of a cleanup pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    /// Artifacts that are gone, including ones that were already missing.
    pub removed: usize,
    /// Artifacts that could not be removed.
    pub failed: Vec<PathBuf>,
}

#[derive(Debug, Default)]
pub struct CleanupCoordinator {
    artifacts: Mutex<Vec<PathBuf>>,
    finished: bool,
}
impl CleanupCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a file or directory for removal. Safe to call from
    /// concurrently running tasks.
    pub fn register(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        tracing::trace!(path = %path.display(), "Registered intermediate artifact");
        self.artifacts.lock().unwrap_or_else(PoisonError::into_inner).push(path);
    }

    pub fn registered(&self) -> usize {
        self.artifacts.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Removes every registered artifact after a successful run.
    pub fn commit(mut self) -> CleanupReport {
        let report = self.sweep();
        tracing::debug!(removed = report.removed, failed = report.failed.len(), "Intermediates cleaned up");
        report
    }

    /// Removes every registered artifact after a failed or cancelled run.
    pub fn abort(mut self) -> CleanupReport {
        let report = self.sweep();
        tracing::info!(removed = report.removed, failed = report.failed.len(), "Run aborted; intermediates cleaned up");
        report
    }

    fn sweep(&mut self) -> CleanupReport {
        self.finished = true;
        let artifacts = std::mem::take(self.artifacts.get_mut().unwrap_or_else(PoisonError::into_inner));
        let mut report = CleanupReport::default();
        // Newest first, so files go before the directories holding them.
        for path in artifacts.into_iter().rev() {
            match remove(&path) {
                Ok(()) => report.removed += 1,
                Err(e) if e.kind() == IoErrorKind::NotFound => report.removed += 1,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove intermediate artifact");
                    report.failed.push(path);
                },
            }
        }
        report
    }
}
impl Drop for CleanupCoordinator {
    fn drop(&mut self) {
        if !self.finished {
            let report = self.sweep();
            tracing::debug!(removed = report.removed, "Cleanup coordinator dropped before finishing");
        }
    }
}

fn remove(path: &Path) -> std::io::Result<()> {
    match fs::symlink_metadata(path)?.is_dir() {
        true => fs::remove_dir_all(path),
        false => fs::remove_file(path),
    }
}
