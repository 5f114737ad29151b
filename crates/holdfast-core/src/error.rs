//! Error types for holdfast-core.
//!
//! The coordinator never swallows a lock or command failure. Every failure
//! surfaces as a variant here, annotated with the resource or command it
//! belongs to, so callers can decide whether to retry at a higher level.
//! The only internally absorbed failure is the single restart-and-retry
//! cycle in [`crate::sync::runner`].

use thiserror::Error;

use crate::lock::LockMode;

/// Core error type for coordinator operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Lock acquisition was not granted within the caller's deadline.
    ///
    /// Recoverable by caller retry/backoff; never retried internally.
    #[error("timed out acquiring {mode} lock on '{resource}' after {waited_ms}ms")]
    LockTimeout {
        /// The resource the lock was requested for.
        resource: String,
        /// The requested lock mode.
        mode: LockMode,
        /// How long the caller waited before giving up.
        waited_ms: u64,
    },

    /// New lock requests are rejected because the process is shutting down.
    #[error("shutting down, refusing new lock request for '{resource}'")]
    ShuttingDown {
        /// The resource the rejected request targeted.
        resource: String,
    },

    /// The sync daemon restart issued during recovery itself failed.
    ///
    /// Fatal for the current operation. Carries the original command and
    /// the first attempt's captured output so an operator can diagnose the
    /// wedged daemon.
    #[error("sync daemon restart failed while recovering `{command}`: {cause}")]
    RecoveryFailed {
        /// The command that triggered recovery.
        command: String,
        /// Output captured from the first (failed) attempt.
        first_output: String,
        /// Why the restart failed.
        cause: String,
    },

    /// The second attempt after a daemon restart also exceeded its deadline.
    #[error("sync command `{command}` timed out twice (daemon restarted in between)")]
    RetryExhausted {
        /// The command that was attempted twice.
        command: String,
        /// Output captured from the first attempt.
        first_output: String,
        /// Output captured from the second attempt.
        second_output: String,
    },

    /// The second attempt after a daemon restart failed (not a timeout).
    ///
    /// Both attempts' output is preserved for diagnosis.
    #[error("sync command `{command}` failed after daemon restart: {second_output}")]
    CommandFailed {
        /// The command that was attempted twice.
        command: String,
        /// Output captured from the first attempt.
        first_output: String,
        /// Output captured from the second attempt.
        second_output: String,
    },

    /// Status payload could not be interpreted even after marker detection.
    ///
    /// Reports the byte offset parsing started from, to distinguish daemon
    /// format drift from transport corruption.
    #[error("failed to parse sync status at byte offset {offset}: {message}")]
    StatusParse {
        /// Byte offset of the structural start-of-list marker.
        offset: usize,
        /// The underlying deserialization error.
        message: String,
    },

    /// An entity or registry entry does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An entity with the same identity already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// IO operation failed.
    #[error("IO error: {0}")]
    IoError(String),

    /// External command execution failed outside the retry protocol.
    #[error("command error: {0}")]
    Command(String),

    /// Invalid configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Whether this error is a lock-acquisition timeout.
    ///
    /// Callers use this to distinguish "system busy" from "operation
    /// failed" without matching on the full variant.
    #[must_use]
    pub const fn is_lock_timeout(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }

    /// Whether this error means the requested entity does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type alias for holdfast-core operations.
pub type Result<T> = std::result::Result<T, Error>;
