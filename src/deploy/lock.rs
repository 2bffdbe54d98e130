// ABOUTME: Deploy lock to prevent concurrent deploys or rollbacks on the same root.
// ABOUTME: Non-blocking flock on a lock file that also records who holds it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{File, OpenOptions, TryLockError};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Information about who holds a deploy lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    /// Process ID of the lock holder.
    pub pid: u32,
    /// When the lock was acquired.
    pub started_at: DateTime<Utc>,
    /// What the holder is doing (`deploy`, `rollback`).
    pub operation: String,
}

impl LockInfo {
    /// Create new lock info for the current process.
    pub fn new(operation: &str) -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at: Utc::now(),
            operation: operation.to_string(),
        }
    }
}

impl fmt::Display for LockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} by {} (pid {}) since {}",
            self.operation,
            self.holder,
            self.pid,
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

#[derive(Debug, Error)]
pub enum LockError {
    #[error(
        "another deploy or rollback is already running ({}){}",
        .path.display(),
        holder_suffix(.holder)
    )]
    AlreadyRunning {
        path: PathBuf,
        holder: Option<LockInfo>,
    },

    #[error("lock file error at {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

fn holder_suffix(holder: &Option<LockInfo>) -> String {
    match holder {
        Some(info) => format!(": {info}"),
        None => String::new(),
    }
}

impl LockError {
    fn io(path: &Path, source: io::Error) -> Self {
        LockError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Holder details when the lock is contended and the file was readable.
    pub fn holder(&self) -> Option<&LockInfo> {
        match self {
            LockError::AlreadyRunning { holder, .. } => holder.as_ref(),
            LockError::Io { .. } => None,
        }
    }
}

/// A held deploy lock that releases on drop.
///
/// The kernel drops the underlying `flock` when the process exits, so a
/// crashed run never leaves the root locked.
pub struct DeployLock {
    file: File,
    path: PathBuf,
    info: LockInfo,
}

impl fmt::Debug for DeployLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployLock")
            .field("path", &self.path)
            .field("info", &self.info)
            .finish()
    }
}

impl DeployLock {
    /// Acquire the lock at `path` without waiting.
    ///
    /// Returns [`LockError::AlreadyRunning`] immediately if another process,
    /// or another handle in this process, holds it.
    pub fn acquire(path: &Path, operation: &str) -> Result<Self, LockError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LockError::io(parent, e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|e| LockError::io(path, e))?;

        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => {
                let holder = read_holder(&mut file);
                tracing::debug!(path = %path.display(), ?holder, "deploy lock is held");
                return Err(LockError::AlreadyRunning {
                    path: path.to_path_buf(),
                    holder,
                });
            }
            Err(TryLockError::Error(e)) => return Err(LockError::io(path, e)),
        }

        let info = LockInfo::new(operation);
        write_holder(&mut file, &info).map_err(|e| LockError::io(path, e))?;
        tracing::debug!(path = %path.display(), operation, "acquired deploy lock");

        Ok(Self {
            file,
            path: path.to_path_buf(),
            info,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self) -> &LockInfo {
        &self.info
    }

    /// Release the lock now rather than at drop.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for DeployLock {
    fn drop(&mut self) {
        // Clear holder info first so a waiting reader never sees stale data.
        if let Err(e) = self.file.set_len(0) {
            tracing::debug!(path = %self.path.display(), error = %e, "failed to clear lock info");
        }
        if let Err(e) = self.file.unlock() {
            tracing::debug!(path = %self.path.display(), error = %e, "failed to unlock");
        }
        tracing::debug!(path = %self.path.display(), "released deploy lock");
    }
}

fn read_holder(file: &mut File) -> Option<LockInfo> {
    let mut content = String::new();
    file.seek(SeekFrom::Start(0)).ok()?;
    file.read_to_string(&mut content).ok()?;
    serde_json::from_str(content.trim()).ok()
}

fn write_holder(file: &mut File, info: &LockInfo) -> io::Result<()> {
    let json = serde_json::to_string(info).map_err(io::Error::other)?;
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(json.as_bytes())?;
    file.write_all(b"\n")?;
    file.sync_data()
}
