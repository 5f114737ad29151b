//! Command-line interface definition.

pub mod handlers;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use holdfast_core::LockMode;

/// Repository access coordination and sync daemon control.
#[derive(Debug, Parser)]
#[command(name = "holdfast", version, about)]
pub struct Cli {
    /// Path to a config file (default: ./holdfast.toml, then
    /// ~/.config/holdfast/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the state of all sync sessions
    Status {
        /// Emit the raw status list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the sync daemon process
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },

    /// Manage individual sync sessions
    Session {
        #[command(subcommand)]
        command: SessionCommand,
    },

    /// Acquire and hold a repository lock (diagnostic helper)
    #[command(hide = true)]
    LockHold {
        /// Lock file to acquire
        #[arg(long)]
        file: PathBuf,
        /// Lock mode to acquire in
        #[arg(long, value_enum)]
        mode: CliLockMode,
        /// Acquisition timeout in milliseconds
        #[arg(long, default_value_t = 1000)]
        timeout_ms: u64,
        /// How long to hold the lock before releasing, in milliseconds
        #[arg(long, default_value_t = 0)]
        hold_ms: u64,
    },
}

#[derive(Debug, Subcommand)]
pub enum DaemonCommand {
    /// Start the sync daemon
    Start,
    /// Stop the sync daemon
    Stop,
    /// Stop then start the sync daemon
    Restart,
}

#[derive(Debug, Subcommand)]
pub enum SessionCommand {
    /// Pause mirroring for a session
    Pause {
        /// Session name
        name: String,
    },
    /// Resume mirroring for a session
    Resume {
        /// Session name
        name: String,
    },
    /// Unregister a session entirely
    Terminate {
        /// Session name
        name: String,
    },
}

/// Lock mode as a CLI value.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliLockMode {
    /// Shared (read) access
    Shared,
    /// Exclusive (write) access
    Exclusive,
}

impl From<CliLockMode> for LockMode {
    fn from(mode: CliLockMode) -> Self {
        match mode {
            CliLockMode::Shared => Self::Shared,
            CliLockMode::Exclusive => Self::Exclusive,
        }
    }
}
