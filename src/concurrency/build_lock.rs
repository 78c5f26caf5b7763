//! Cross-process build lock using advisory file locking (fs2 flock).
//!
//! Serializes `cargo build` / `cargo test` runs started by separate
//! varaforge processes so they do not fight over the same `target/`
//! directory lock and time out waiting on each other.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Advisory file lock shared by every build in the current user session.
///
/// The lock file lives in the runtime directory (outside any workspace, so
/// it never shows up in a project tree).
#[derive(Debug, Clone)]
pub struct BuildLock {
    path: PathBuf,
}

/// RAII guard that releases the lock on drop.
#[derive(Debug)]
pub struct BuildLockGuard {
    file: File,
}

impl Drop for BuildLockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl BuildLock {
    /// Lock file at the default location (runtime dir, state dir fallback).
    pub fn new() -> Result<Self> {
        let paths = crate::paths::Paths::resolve()?;
        Self::at(paths.build_lock())
    }

    /// Lock file at an explicit path. Parent directories are created.
    pub fn at(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Blocking acquire; waits until the lock is available.
    pub fn acquire(&self) -> Result<BuildLockGuard> {
        let file = self.open()?;
        file.lock_exclusive()
            .with_context(|| format!("Failed to lock {}", self.path.display()))?;
        Ok(BuildLockGuard { file })
    }

    /// Non-blocking try-acquire; returns `None` if another process holds it.
    pub fn try_acquire(&self) -> Result<Option<BuildLockGuard>> {
        let file = self.open()?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(BuildLockGuard { file })),
            Err(e) if is_contended(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Acquire on a blocking thread so the async runtime keeps running.
    pub async fn acquire_async(&self) -> Result<BuildLockGuard> {
        if let Some(guard) = self.try_acquire()? {
            return Ok(guard);
        }

        debug!("Waiting for build lock at {}", self.path.display());
        let lock = self.clone();
        tokio::task::spawn_blocking(move || lock.acquire())
            .await
            .context("Build lock task panicked")?
    }

    fn open(&self) -> Result<File> {
        File::create(&self.path)
            .with_context(|| format!("Failed to open lock file {}", self.path.display()))
    }
}

fn is_contended(e: &std::io::Error) -> bool {
    e.kind() == std::io::ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
