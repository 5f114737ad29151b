//! # Holdfast Core
//!
//! Coordination layer for concurrent, multi-process access to shared
//! on-disk repositories, plus the control plane for the external
//! file-synchronization daemon that mirrors them to developer machines.
//!
//! - [`lock`] - interprocess reader/writer locks anchored in advisory
//!   file locks
//! - [`executor`] - couples lock acquisition to units of work with
//!   guaranteed release
//! - [`sync`] - resilient daemon command runner and session status model
//! - [`resource`], [`registry`], [`store`], [`config`], [`shutdown`] -
//!   resolution, wiring, persistence seam, configuration, lifecycle
//!
//! ## Error Handling
//!
//! All fallible operations return `Result<T, Error>`. No `unwrap()`,
//! no `expect()`, no `panic!()` outside tests.

pub mod config;
mod error;
pub mod executor;
pub mod lock;
pub mod registry;
pub mod resource;
pub mod shutdown;
pub mod store;
pub mod sync;

pub use config::Config;
pub use error::{Error, Result};
pub use executor::Executor;
pub use lock::{LockGuard, LockMode, RepoLock};
pub use registry::Registry;
pub use resource::{DiskRepoProvider, LockManager, RepoId, RepoProvider, ViewId};
pub use shutdown::{signal_channels, ShutdownCoordinator, ShutdownFlag, ShutdownSignal};
pub use store::{Entity, EntityStore, MemoryStore};
pub use sync::{SyncRunner, SyncService, SyncSession, SyncStatus};
