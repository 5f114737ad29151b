//! Command handlers.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use holdfast_core::{Config, RepoLock, SyncRunner, SyncService, SyncStatus};

use super::{Command, DaemonCommand, SessionCommand};

/// Dispatch a parsed command.
pub async fn run(command: Command, config: &Config) -> anyhow::Result<()> {
    match command {
        Command::Status { json } => status(config, json).await,
        Command::Daemon { command } => daemon(config, command).await,
        Command::Session { command } => session(config, command).await,
        Command::LockHold {
            file,
            mode,
            timeout_ms,
            hold_ms,
        } => lock_hold(file, mode.into(), timeout_ms, hold_ms).await,
    }
}

/// Build the sync control surface from configuration.
fn sync_service(config: &Config) -> anyhow::Result<SyncService> {
    let binary = config
        .resolve_sync_binary()
        .context("resolving sync daemon binary")?;
    let runner = SyncRunner::new(binary).with_deadline(config.command_deadline());
    Ok(SyncService::new(Arc::new(runner)))
}

async fn status(config: &Config, json: bool) -> anyhow::Result<()> {
    let service = sync_service(config)?;
    let statuses = service.status().await.context("listing sync sessions")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    if statuses.is_empty() {
        println!("no sync sessions");
        return Ok(());
    }
    for status in &statuses {
        println!("{}", summarize(status));
    }
    Ok(())
}

/// One human-readable line per session.
fn summarize(status: &SyncStatus) -> String {
    let health = if status.is_healthy() {
        "healthy"
    } else if status.session.paused {
        "paused"
    } else if !status.is_connected() {
        "disconnected"
    } else {
        "degraded"
    };
    let mut line = format!(
        "{}  {}  cycles={}",
        status.session.name, health, status.successful_cycles
    );
    if !status.last_error.is_empty() {
        line.push_str(&format!("  last_error={}", status.last_error));
    }
    line
}

async fn daemon(config: &Config, command: DaemonCommand) -> anyhow::Result<()> {
    let service = sync_service(config)?;
    match command {
        DaemonCommand::Start => {
            service.daemon_start().await.context("starting daemon")?;
            println!("sync daemon started");
        }
        DaemonCommand::Stop => {
            service.daemon_stop().await.context("stopping daemon")?;
            println!("sync daemon stopped");
        }
        DaemonCommand::Restart => {
            service.daemon_stop().await.context("stopping daemon")?;
            service.daemon_start().await.context("starting daemon")?;
            println!("sync daemon restarted");
        }
    }
    Ok(())
}

async fn session(config: &Config, command: SessionCommand) -> anyhow::Result<()> {
    let service = sync_service(config)?;
    match command {
        SessionCommand::Pause { name } => {
            service
                .pause(&name)
                .await
                .with_context(|| format!("pausing session '{name}'"))?;
            println!("paused {name}");
        }
        SessionCommand::Resume { name } => {
            service
                .resume(&name)
                .await
                .with_context(|| format!("resuming session '{name}'"))?;
            println!("resumed {name}");
        }
        SessionCommand::Terminate { name } => {
            service
                .terminate(&name)
                .await
                .with_context(|| format!("terminating session '{name}'"))?;
            println!("terminated {name}");
        }
    }
    Ok(())
}

/// Acquire a lock, hold it, release it. Used by the interprocess lock
/// tests to contend from separate OS processes.
async fn lock_hold(
    file: std::path::PathBuf,
    mode: holdfast_core::LockMode,
    timeout_ms: u64,
    hold_ms: u64,
) -> anyhow::Result<()> {
    let lock = RepoLock::new(file);
    let guard = lock
        .acquire(mode, Duration::from_millis(timeout_ms))
        .await
        .context("acquiring lock")?;
    tracing::debug!(path = %guard.path().display(), %mode, "holding lock");
    tokio::time::sleep(Duration::from_millis(hold_ms)).await;
    drop(guard);
    Ok(())
}
