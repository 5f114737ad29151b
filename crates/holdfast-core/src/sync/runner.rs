//! Resilient execution of sync daemon control commands.
//!
//! The daemon can wedge itself into a state where individual commands
//! hang. A single bounded restart-and-retry cycle recovers the common
//! failure mode without risking infinite restart loops or masking
//! persistent faults:
//!
//! 1. **FirstAttempt** - run the command under a deadline; success returns
//!    immediately, any failure moves to recovery.
//! 2. **Recovering** - restart the daemon; if the restart itself fails the
//!    operation is terminal ([`crate::Error::RecoveryFailed`]).
//! 3. **SecondAttempt** - run the command once more under a fresh
//!    deadline; a second deadline hit is terminal
//!    ([`crate::Error::RetryExhausted`]), any other failure is terminal
//!    with both attempts' output preserved for the operator.
//!
//! Never more than two execution attempts, never more than one restart.
//! Restarts are serialized against in-flight commands: commands hold the
//! gate shared, a restart holds it exclusively, so a restart is never
//! issued while a command is mid-flight against the same daemon.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

use std::{path::PathBuf, process::Stdio, time::Duration};

use tokio::{process::Command, sync::RwLock};

use crate::{Error, Result};

/// Deadline applied to each individual command execution.
const DEFAULT_COMMAND_DEADLINE: Duration = Duration::from_secs(10);

/// Phases of the recovery state machine.
///
/// Modeled explicitly rather than as nested conditionals so the "exactly
/// one recovery" invariant is structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    FirstAttempt,
    Recovering,
    SecondAttempt,
}

/// How a single attempt failed, with whatever output was captured.
#[derive(Debug)]
enum AttemptFailure {
    /// The command did not finish before the deadline. The process is
    /// killed on drop, so nothing was captured.
    DeadlineExceeded { deadline: Duration },
    /// The command finished with a non-zero status.
    Failed { output: String },
    /// The command could not be spawned at all.
    Spawn { message: String },
}

impl AttemptFailure {
    /// Human-readable record of the attempt for terminal errors.
    fn captured(&self) -> String {
        match self {
            Self::DeadlineExceeded { deadline } => {
                format!("(no output: deadline of {}ms exceeded)", deadline.as_millis())
            }
            Self::Failed { output } => output.clone(),
            Self::Spawn { message } => format!("(failed to spawn: {message})"),
        }
    }

    const fn is_deadline(&self) -> bool {
        matches!(self, Self::DeadlineExceeded { .. })
    }
}

/// Executes sync daemon CLI commands with bounded recovery.
#[derive(Debug)]
pub struct SyncRunner {
    binary: PathBuf,
    deadline: Duration,
    /// Commands hold this shared; a daemon restart holds it exclusively.
    gate: RwLock<()>,
}

impl SyncRunner {
    /// Create a runner driving the daemon binary at `binary`.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            deadline: DEFAULT_COMMAND_DEADLINE,
            gate: RwLock::new(()),
        }
    }

    /// Override the per-command deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Path of the daemon binary this runner drives.
    #[must_use]
    pub fn binary(&self) -> &PathBuf {
        &self.binary
    }

    /// Run a daemon command, recovering once by restarting the daemon.
    ///
    /// Returns the command's stdout on success.
    ///
    /// # Errors
    ///
    /// `Error::RecoveryFailed` if the restart fails, `Error::RetryExhausted`
    /// if the retry also times out, `Error::CommandFailed` if the retry
    /// fails for another reason. Every variant carries the captured output
    /// of both attempts.
    pub async fn run(&self, args: &[&str]) -> Result<String> {
        let command = args.join(" ");
        let mut phase = Phase::FirstAttempt;
        let mut first_output = String::new();

        loop {
            phase = match phase {
                Phase::FirstAttempt => match self.attempt(args).await {
                    Ok(output) => return Ok(output),
                    Err(failure) => {
                        tracing::warn!(
                            command = %command,
                            "sync command failed, restarting daemon: {}",
                            failure.captured()
                        );
                        first_output = failure.captured();
                        Phase::Recovering
                    }
                },
                Phase::Recovering => match self.restart_daemon().await {
                    Ok(()) => Phase::SecondAttempt,
                    Err(cause) => {
                        return Err(Error::RecoveryFailed {
                            command,
                            first_output,
                            cause,
                        })
                    }
                },
                Phase::SecondAttempt => {
                    return match self.attempt(args).await {
                        Ok(output) => Ok(output),
                        Err(failure) if failure.is_deadline() => Err(Error::RetryExhausted {
                            command,
                            first_output,
                            second_output: failure.captured(),
                        }),
                        Err(failure) => Err(Error::CommandFailed {
                            command,
                            first_output,
                            second_output: failure.captured(),
                        }),
                    }
                }
            };
        }
    }

    /// Execute the command once under the deadline, holding the gate
    /// shared so no restart can start mid-flight.
    async fn attempt(&self, args: &[&str]) -> std::result::Result<String, AttemptFailure> {
        let _shared = self.gate.read().await;
        self.exec_once(args).await
    }

    /// Stop and start the daemon.
    ///
    /// Holds the gate exclusively so a restart never overlaps an in-flight
    /// command or another restart. A failing `daemon stop` is tolerated
    /// (the daemon may already be gone); `daemon start` must succeed.
    async fn restart_daemon(&self) -> std::result::Result<(), String> {
        let _exclusive = self.gate.write().await;
        tracing::info!(binary = %self.binary.display(), "restarting sync daemon");

        if let Err(failure) = self.exec_once(&["daemon", "stop"]).await {
            tracing::warn!("daemon stop failed, continuing with start: {}", failure.captured());
        }
        self.exec_once(&["daemon", "start"])
            .await
            .map(|_| ())
            .map_err(|failure| failure.captured())
    }

    /// One raw execution: spawn, wait under the deadline, capture output.
    /// An abandoned attempt is killed on drop so it cannot linger.
    async fn exec_once(&self, args: &[&str]) -> std::result::Result<String, AttemptFailure> {
        let child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.deadline, child).await {
            Err(_) => Err(AttemptFailure::DeadlineExceeded {
                deadline: self.deadline,
            }),
            Ok(Err(e)) => Err(AttemptFailure::Spawn {
                message: e.to_string(),
            }),
            Ok(Ok(output)) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(Ok(output)) => {
                let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
                combined.push_str(&String::from_utf8_lossy(&output.stderr));
                Err(AttemptFailure::Failed { output: combined })
            }
        }
    }
}
