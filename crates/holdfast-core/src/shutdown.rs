//! Graceful shutdown coordination.
//!
//! On SIGINT/SIGTERM the host process stops accepting new lock requests,
//! lets in-flight holders finish bounded by a shutdown timeout, then
//! exits. The executor consults a [`ShutdownFlag`] before acquiring;
//! long-running components subscribe to the broadcast channel.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};

use crate::Result;

/// Shutdown signal sent to all active operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// Graceful shutdown requested (SIGINT/SIGTERM).
    Graceful,
    /// Force shutdown requested (timeout exceeded).
    Force,
}

/// Cheap, clonable view of "are we shutting down".
///
/// Handed to the executor so new lock requests can be refused without the
/// executor depending on the whole coordinator.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    /// Create an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether shutdown has begun.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Coordinator for graceful shutdown across components.
pub struct ShutdownCoordinator {
    shutdown_tx: broadcast::Sender<ShutdownSignal>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    flag: ShutdownFlag,
    shutdown_timeout: Duration,
}

impl ShutdownCoordinator {
    /// Create a coordinator with the given grace period.
    #[must_use]
    pub fn new(shutdown_timeout: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(16);
        Self {
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
            flag: ShutdownFlag::new(),
            shutdown_timeout,
        }
    }

    /// Get a receiver for shutdown signals.
    ///
    /// Components call this and listen in their async loops.
    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownSignal> {
        self.shutdown_tx.subscribe()
    }

    /// The flag the executor consults before accepting new lock requests.
    #[must_use]
    pub fn flag(&self) -> ShutdownFlag {
        self.flag.clone()
    }

    /// Register a task for cleanup on shutdown.
    pub async fn register_task(&self, task: JoinHandle<()>) {
        self.tasks.lock().await.push(task);
    }

    /// Initiate graceful shutdown.
    ///
    /// Refuses new lock requests immediately, broadcasts the graceful
    /// signal, waits out the grace period for in-flight work, then aborts
    /// whatever is left.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("initiating graceful shutdown");
        self.flag.set();
        let _ = self.shutdown_tx.send(ShutdownSignal::Graceful);

        let mut handles: Vec<JoinHandle<()>> = self.tasks.lock().await.drain(..).collect();
        let drained = tokio::time::timeout(self.shutdown_timeout, async {
            for task in &mut handles {
                let _ = task.await;
            }
        })
        .await;

        if drained.is_err() {
            tracing::warn!("shutdown timeout exceeded, forcing shutdown");
            let _ = self.shutdown_tx.send(ShutdownSignal::Force);
            for task in &handles {
                task.abort();
            }
        } else {
            tracing::info!("graceful shutdown completed");
        }
        Ok(())
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.flag.is_set()
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

/// Create signal channels for SIGINT and SIGTERM.
///
/// Returns receivers that receive a value when the signal is delivered.
#[cfg(unix)]
pub async fn signal_channels() -> Result<(broadcast::Receiver<()>, broadcast::Receiver<()>)> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| crate::Error::IoError(format!("failed to setup SIGINT handler: {e}")))?;
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| crate::Error::IoError(format!("failed to setup SIGTERM handler: {e}")))?;

    let (sigint_tx, sigint_rx) = broadcast::channel(1);
    let (sigterm_tx, sigterm_rx) = broadcast::channel(1);

    tokio::spawn(async move {
        if sigint.recv().await.is_some() {
            let _ = sigint_tx.send(());
        }
    });
    tokio::spawn(async move {
        if sigterm.recv().await.is_some() {
            let _ = sigterm_tx.send(());
        }
    });

    Ok((sigint_rx, sigterm_rx))
}

/// Fallback for non-unix targets: channels that never fire.
#[cfg(not(unix))]
pub async fn signal_channels() -> Result<(broadcast::Receiver<()>, broadcast::Receiver<()>)> {
    let (_sigint_tx, sigint_rx) = broadcast::channel(1);
    let (_sigterm_tx, sigterm_rx) = broadcast::channel(1);
    Ok((sigint_rx, sigterm_rx))
}
