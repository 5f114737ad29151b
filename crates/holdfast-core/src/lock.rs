//! Interprocess reader/writer locks for repository access.
//!
//! Workers that mutate a repository are separate OS processes, not just
//! separate tasks in one runtime, so exclusion is anchored in OS advisory
//! file locks (`fs2`). Two processes contending for the same lock path
//! observe the same guarantees as two tasks in one process:
//!
//! - Shared holders never block each other
//! - Exclusive waits for all current holders (Shared or Exclusive)
//! - Shared waits while an Exclusive holder is active
//!
//! Acquisition is bounded: callers supply a timeout and get a
//! [`Error::LockTimeout`] if the lock is not granted in time, with no
//! partial acquisition. Waiting is a short non-blocking poll loop rather
//! than a blocking `flock(2)` call, so a timed-out acquisition cannot grab
//! the lock after its caller has given up.
//!
//! Fairness is best-effort. Waiters are granted in OS scheduling/poll
//! order, not FIFO, and an Exclusive waiter can starve under a continuous
//! stream of Shared holders. Known limitation.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use fs2::FileExt;

use crate::{Error, Result};

/// Delay between non-blocking acquisition attempts.
///
/// Short enough that a release unblocks a compatible waiter within a
/// scheduling quantum, long enough not to spin.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Requested access mode for a repository lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum LockMode {
    /// Concurrent read access; unbounded holders.
    Shared,
    /// Solitary write access; excludes all other holders.
    Exclusive,
}

/// A granted repository lock, released exactly once on drop.
///
/// The guard owns the open file descriptor; closing it releases the OS
/// advisory lock, so release happens on every control-flow exit including
/// unwinding. The lock file itself is never deleted (deleting it would
/// reintroduce the create/lock race for the next acquirer).
#[derive(Debug)]
pub struct LockGuard {
    file: File,
    path: PathBuf,
    mode: LockMode,
}

impl LockGuard {
    /// Path of the lock file this guard holds.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mode this guard was granted in.
    #[must_use]
    pub const fn mode(&self) -> LockMode {
        self.mode
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // Closing the descriptor releases the lock, but unlock explicitly
        // so waiters in this same process are not held up by a descriptor
        // lingering in a drop queue.
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), "failed to release lock: {e}");
        }
        tracing::trace!(path = %self.path.display(), mode = %self.mode, "released lock");
    }
}

/// An advisory reader/writer lock anchored at a file path.
///
/// Cheap to construct; the file is opened per acquisition so every holder
/// (task or process) has its own descriptor and contends correctly.
#[derive(Debug, Clone)]
pub struct RepoLock {
    path: PathBuf,
}

impl RepoLock {
    /// Create a lock handle for the given lock file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquire the lock in `mode`, waiting up to `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `Error::LockTimeout` if the lock is not granted within
    /// `timeout`, and `Error::IoError` if the lock file cannot be opened
    /// or a lock syscall fails for a reason other than contention.
    pub async fn acquire(&self, mode: LockMode, timeout: Duration) -> Result<LockGuard> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::IoError(format!("failed to create lock directory: {e}")))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| {
                Error::IoError(format!(
                    "failed to open lock file '{}': {e}",
                    self.path.display()
                ))
            })?;

        let started = Instant::now();
        loop {
            match try_lock(&file, mode) {
                Ok(()) => {
                    tracing::trace!(path = %self.path.display(), %mode, "acquired lock");
                    return Ok(LockGuard {
                        file,
                        path: self.path.clone(),
                        mode,
                    });
                }
                Err(e) if is_contended(&e) => {
                    if started.elapsed() >= timeout {
                        return Err(Error::LockTimeout {
                            resource: self.path.display().to_string(),
                            mode,
                            waited_ms: u64::try_from(started.elapsed().as_millis())
                                .unwrap_or(u64::MAX),
                        });
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                Err(e) => {
                    return Err(Error::IoError(format!(
                        "failed to lock '{}': {e}",
                        self.path.display()
                    )));
                }
            }
        }
    }
}

/// Non-blocking lock attempt in the requested mode.
///
/// Trait-qualified so resolution stays on `fs2` even on toolchains where
/// `std::fs::File` has its own locking methods.
fn try_lock(file: &File, mode: LockMode) -> std::io::Result<()> {
    match mode {
        LockMode::Shared => FileExt::try_lock_shared(file),
        LockMode::Exclusive => FileExt::try_lock_exclusive(file),
    }
}

/// Whether a lock error means "held by someone else" rather than a real
/// IO failure.
fn is_contended(e: &std::io::Error) -> bool {
    e.kind() == fs2::lock_contended_error().kind()
}
