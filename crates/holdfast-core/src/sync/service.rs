//! Session-level verbs layered on the resilient command runner.
//!
//! A control-plane task periodically calls [`SyncService::status`] and
//! feeds the result to health checks; operator tooling uses the
//! pause/resume/terminate verbs. All of it goes through [`SyncRunner`],
//! so every call inherits the bounded restart-and-retry recovery.

use std::sync::Arc;

use crate::{
    sync::{runner::SyncRunner, status::parse_status_output, SyncStatus},
    Result,
};

/// High-level control surface for the sync daemon.
#[derive(Debug, Clone)]
pub struct SyncService {
    runner: Arc<SyncRunner>,
}

impl SyncService {
    /// Create a service over the given runner.
    #[must_use]
    pub fn new(runner: Arc<SyncRunner>) -> Self {
        Self { runner }
    }

    /// The underlying runner.
    #[must_use]
    pub fn runner(&self) -> &SyncRunner {
        &self.runner
    }

    /// Snapshot the state of all sessions.
    ///
    /// # Errors
    ///
    /// Propagates runner errors and `Error::StatusParse` for undecodable
    /// payloads. Diagnostic-only or `null` output is an empty list.
    pub async fn status(&self) -> Result<Vec<SyncStatus>> {
        let raw = self.runner.run(&["sync", "list", "--json"]).await?;
        parse_status_output(&raw)
    }

    /// Pause mirroring for one session.
    pub async fn pause(&self, session_name: &str) -> Result<()> {
        self.runner
            .run(&["sync", "pause", session_name])
            .await
            .map(|_| ())
    }

    /// Resume mirroring for one session.
    pub async fn resume(&self, session_name: &str) -> Result<()> {
        self.runner
            .run(&["sync", "resume", session_name])
            .await
            .map(|_| ())
    }

    /// Unregister a session entirely.
    pub async fn terminate(&self, session_name: &str) -> Result<()> {
        self.runner
            .run(&["sync", "terminate", session_name])
            .await
            .map(|_| ())
    }

    /// Stop the daemon process.
    ///
    /// Note this goes through the runner too: if the stop command itself
    /// hangs, the daemon is restarted and the stop is retried once.
    pub async fn daemon_stop(&self) -> Result<()> {
        self.runner.run(&["daemon", "stop"]).await.map(|_| ())
    }

    /// Start the daemon process.
    pub async fn daemon_start(&self) -> Result<()> {
        self.runner.run(&["daemon", "start"]).await.map(|_| ())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::{os::unix::fs::PermissionsExt, path::PathBuf, time::Duration};

    use super::*;

    fn fake_daemon(dir: &tempfile::TempDir, body: &str) -> (PathBuf, PathBuf) {
        let log = dir.path().join("invocations.log");
        let script = dir.path().join("fake-sync");
        let contents = format!(
            "#!/bin/sh\necho \"$@\" >> '{}'\n{}\n",
            log.display(),
            body
        );
        std::fs::write(&script, contents).expect("write fake daemon");
        let mut perms = std::fs::metadata(&script).expect("stat").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&script, perms).expect("chmod");
        (script, log)
    }

    fn service(script: &PathBuf) -> SyncService {
        SyncService::new(Arc::new(
            SyncRunner::new(script).with_deadline(Duration::from_secs(2)),
        ))
    }

    #[tokio::test]
    async fn test_status_parses_daemon_list() {
        let dir = tempfile::tempdir().expect("tempdir");
        let body = r#"echo '[{"session":{"name":"view-1"},"alphaConnected":true,"betaConnected":true}]'"#;
        let (script, _log) = fake_daemon(&dir, body);

        let statuses = service(&script).status().await.expect("status");
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].session.name, "view-1");
        assert!(statuses[0].is_connected());
    }

    // Scenario: daemon cold start prepends diagnostics before the list.
    #[tokio::test]
    async fn test_status_with_daemon_startup_banner() {
        let dir = tempfile::tempdir().expect("tempdir");
        let body = "echo 'Started sync daemon in background (terminate with \"daemon stop\")'\n\
                    echo '[{\"session\":{\"name\":\"view-2\"}}]'";
        let (script, _log) = fake_daemon(&dir, body);

        let statuses = service(&script).status().await.expect("status");
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].session.name, "view-2");
    }

    #[tokio::test]
    async fn test_status_with_no_sessions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (script, _log) = fake_daemon(&dir, "echo 'null'");
        let statuses = service(&script).status().await.expect("status");
        assert!(statuses.is_empty());
    }

    #[tokio::test]
    async fn test_pause_passes_session_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (script, log) = fake_daemon(&dir, "exit 0");

        service(&script).pause("view-3").await.expect("pause");
        let calls = std::fs::read_to_string(&log).expect("log");
        assert!(calls.contains("sync pause view-3"));
    }

    #[tokio::test]
    async fn test_terminate_passes_session_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (script, log) = fake_daemon(&dir, "exit 0");

        service(&script).terminate("view-4").await.expect("terminate");
        let calls = std::fs::read_to_string(&log).expect("log");
        assert!(calls.contains("sync terminate view-4"));
    }
}
