//! Access coordinator: couples lock acquisition to units of work.
//!
//! Callers declare the access mode they need (read = Shared, write =
//! Exclusive; declared intent, never inferred), the executor resolves the
//! resource, acquires the interprocess lock, runs the unit of work with
//! the resolved path, and releases exactly once on every exit path. A
//! leaked lock would deadlock every future writer on that repository, so
//! release is RAII, not bookkeeping: the guard drops on normal return,
//! error return, and unwinding alike.
//!
//! `LockTimeout` propagates distinctly from errors raised by the unit of
//! work, so callers can tell "system busy" from "operation failed".

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

use std::{future::Future, path::PathBuf, sync::Arc, time::Duration};

use crate::{
    lock::LockMode,
    resource::{LockManager, RepoId, RepoProvider, ViewId},
    shutdown::ShutdownFlag,
    Error, Result,
};

/// Default acquisition timeout when callers use the convenience entry
/// points.
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Schedules repository operations under the correct lock mode.
pub struct Executor {
    provider: Arc<dyn RepoProvider>,
    locks: LockManager,
    default_timeout: Duration,
    shutdown: ShutdownFlag,
}

impl Executor {
    /// Create an executor over the given provider and lock manager.
    #[must_use]
    pub fn new(provider: Arc<dyn RepoProvider>, locks: LockManager) -> Self {
        Self {
            provider,
            locks,
            default_timeout: DEFAULT_LOCK_TIMEOUT,
            shutdown: ShutdownFlag::new(),
        }
    }

    /// Override the default acquisition timeout.
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Refuse new lock requests once the given flag is set.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: ShutdownFlag) -> Self {
        self.shutdown = flag;
        self
    }

    /// Run `f` with Shared access to the repository trunk or a view.
    ///
    /// For operations that read the repository: computing a diff, listing
    /// branches.
    pub async fn read<T, F, Fut>(
        &self,
        repo: &RepoId,
        view: Option<&ViewId>,
        action: &str,
        f: F,
    ) -> Result<T>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.with_access(repo, view, LockMode::Shared, self.default_timeout, action, f)
            .await
    }

    /// Run `f` with Exclusive access to the repository trunk or a view.
    ///
    /// For operations that mutate the repository: creating a branch,
    /// applying a change.
    pub async fn write<T, F, Fut>(
        &self,
        repo: &RepoId,
        view: Option<&ViewId>,
        action: &str,
        f: F,
    ) -> Result<T>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.with_access(
            repo,
            view,
            LockMode::Exclusive,
            self.default_timeout,
            action,
            f,
        )
        .await
    }

    /// Run `f` under the requested lock mode with an explicit timeout.
    ///
    /// `f` receives the resolved on-disk path of the target (the view if
    /// one is given, otherwise the trunk) and holds logical access until
    /// it returns.
    ///
    /// # Errors
    ///
    /// Returns `Error::LockTimeout` if the lock was not granted in time
    /// (no part of `f` runs), `Error::ShuttingDown` if the process is
    /// draining, and otherwise whatever `f` returns.
    pub async fn with_access<T, F, Fut>(
        &self,
        repo: &RepoId,
        view: Option<&ViewId>,
        mode: LockMode,
        timeout: Duration,
        action: &str,
        f: F,
    ) -> Result<T>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if self.shutdown.is_set() {
            return Err(Error::ShuttingDown {
                resource: repo.to_string(),
            });
        }

        let target = match view {
            Some(v) => self.provider.view_path(repo, v),
            None => self.provider.trunk_path(repo),
        };

        let started = std::time::Instant::now();
        let guard = self
            .locks
            .repo_lock(repo, view)
            .acquire(mode, timeout)
            .await
            .map_err(|e| annotate_resource(e, repo, view))?;

        let exec_started = std::time::Instant::now();
        let result = f(target).await;
        tracing::info!(
            repo = %repo,
            action,
            %mode,
            total_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            exec_ms = u64::try_from(exec_started.elapsed().as_millis()).unwrap_or(u64::MAX),
            ok = result.is_ok(),
            "executor completed"
        );
        drop(guard);
        result
    }
}

/// Rewrite a lock-layer timeout so it names the repository instead of the
/// lock file path.
fn annotate_resource(e: Error, repo: &RepoId, view: Option<&ViewId>) -> Error {
    match e {
        Error::LockTimeout {
            mode, waited_ms, ..
        } => Error::LockTimeout {
            resource: match view {
                Some(v) => format!("{repo}/{v}"),
                None => repo.to_string(),
            },
            mode,
            waited_ms,
        },
        other => other,
    }
}
