//! Sync session status model and the tolerant output parser.
//!
//! The daemon reports session state as a JSON list, but on a cold start it
//! prepends human-oriented diagnostics ("Started sync daemon in
//! background ...") and interactive control characters before the
//! structured payload. The parser therefore locates the first structural
//! start-of-list marker (`[`) and parses from there; output with no marker
//! at all means "no sessions", not an error. A literal `null` response is
//! the daemon's own empty-list sentinel.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One configured file-mirroring pairing managed by the daemon.
///
/// Created and destroyed by the daemon; the coordinator only reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncSession {
    /// Stable session identifier assigned by the daemon.
    pub identifier: String,
    /// Human-facing session name.
    pub name: String,
    /// Local endpoint of the pairing.
    pub alpha: Endpoint,
    /// Remote endpoint of the pairing.
    pub beta: Endpoint,
    /// Per-session sync configuration.
    pub configuration: SessionConfiguration,
    /// Whether mirroring is paused.
    pub paused: bool,
    /// Operator labels; keys unique.
    pub labels: HashMap<String, String>,
    /// When the session was registered.
    pub creation_time: CreationTime,
}

/// One side of a sync pairing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Endpoint {
    /// Transport protocol code; 0 for local paths.
    pub protocol: i32,
    /// User on the remote side, if any.
    pub user: String,
    /// Host on the remote side, if any.
    pub host: String,
    /// Path being mirrored.
    pub path: String,
}

/// Per-session configuration as the daemon reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfiguration {
    /// Ignore rules.
    #[serde(rename = "ignores")]
    pub ignores: Vec<String>,
    /// VCS-ignore handling mode code.
    #[serde(rename = "ignoreVCSMode")]
    pub ignore_vcs_mode: i32,
    /// Private key used for the remote endpoint.
    #[serde(rename = "sshPrivateKeyPath")]
    pub ssh_private_key_path: String,
}

/// Daemon-reported creation timestamp (split seconds/nanos).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreationTime {
    /// Seconds since the epoch.
    pub seconds: i64,
    /// Sub-second nanoseconds.
    pub nanos: i64,
}

impl CreationTime {
    /// The timestamp as a UTC datetime, if representable.
    #[must_use]
    pub fn as_datetime(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        let nanos = u32::try_from(self.nanos).ok()?;
        chrono::DateTime::from_timestamp(self.seconds, nanos)
    }
}

/// Live snapshot of one session's state, recomputed on every poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncStatus {
    /// The session this snapshot describes.
    pub session: SyncSession,
    /// Numeric daemon state code.
    pub status: i32,
    /// Whether the alpha endpoint is connected.
    pub alpha_connected: bool,
    /// Whether the beta endpoint is connected.
    pub beta_connected: bool,
    /// Completed synchronization cycles. Monotonically non-decreasing
    /// while the session is unpaused and healthy.
    #[serde(rename = "successfulSynchronizationCycles")]
    pub successful_cycles: u64,
    /// Last error reported by the daemon, empty when none.
    pub last_error: String,
}

impl SyncStatus {
    /// Both endpoints connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.alpha_connected && self.beta_connected
    }

    /// Connected, unpaused, and error-free - what health checks look for.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.is_connected() && !self.session.paused && self.last_error.is_empty()
    }
}

/// The daemon's literal empty-list sentinel.
const NO_SESSIONS_SENTINEL: &str = "null";

/// Parse raw status-listing output into session snapshots.
///
/// # Errors
///
/// `Error::StatusParse` (with the byte offset parsing started from) if the
/// payload after the start-of-list marker is not valid JSON. Missing
/// marker and the `null` sentinel are both valid empty results.
pub fn parse_status_output(raw: &str) -> Result<Vec<SyncStatus>> {
    if raw.trim() == NO_SESSIONS_SENTINEL {
        return Ok(Vec::new());
    }

    let Some(offset) = raw.find('[') else {
        // Diagnostic-only output: the daemon had nothing to list.
        return Ok(Vec::new());
    };

    serde_json::from_str(&raw[offset..]).map_err(|e| Error::StatusParse {
        offset,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_SESSION: &str = r#"[{
        "session": {
            "identifier": "sess-1",
            "name": "view-9",
            "alpha": {"path": "/home/dev/view-9"},
            "beta": {"protocol": 1, "user": "u1", "host": "sync.example.com", "path": "/repos/cb1/v9/"},
            "configuration": {"ignores": ["node_modules"], "ignoreVCSMode": 1, "sshPrivateKeyPath": "/home/dev/.ssh/id"},
            "paused": false,
            "labels": {"viewId": "v9"},
            "creationTime": {"seconds": 1700000000, "nanos": 500}
        },
        "status": 5,
        "alphaConnected": true,
        "betaConnected": true,
        "successfulSynchronizationCycles": 42,
        "lastError": ""
    }]"#;

    // The literal "null" response is a valid empty result.
    #[test]
    fn test_null_sentinel_is_empty_not_error() -> Result<()> {
        assert!(parse_status_output("null")?.is_empty());
        assert!(parse_status_output("null\n")?.is_empty());
        Ok(())
    }

    // No start-of-list marker anywhere means no sessions.
    #[test]
    fn test_output_without_marker_is_empty_not_error() -> Result<()> {
        let parsed = parse_status_output("Started sync daemon in background\n")?;
        assert!(parsed.is_empty());
        Ok(())
    }

    #[test]
    fn test_clean_list_parses() -> Result<()> {
        let parsed = parse_status_output(ONE_SESSION)?;
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].session.identifier, "sess-1");
        assert_eq!(parsed[0].successful_cycles, 42);
        assert!(parsed[0].alpha_connected);
        Ok(())
    }

    // Leading diagnostic text followed by the JSON list.
    #[test]
    fn test_leading_diagnostics_are_skipped() -> Result<()> {
        let raw = format!(
            "Started sync daemon in background (terminate with \"daemon stop\")\n{ONE_SESSION}"
        );
        let parsed = parse_status_output(&raw)?;
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].session.name, "view-9");
        assert_eq!(parsed[0].session.labels.get("viewId").map(String::as_str), Some("v9"));
        Ok(())
    }

    #[test]
    fn test_parse_failure_reports_marker_offset() {
        let raw = "noise here [not json at all";
        match parse_status_output(raw) {
            Err(Error::StatusParse { offset, .. }) => {
                assert_eq!(offset, 11);
            }
            other => panic!("expected StatusParse, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_and_missing_fields_tolerated() -> Result<()> {
        // Sparse entry: everything defaulted except the session name.
        let raw = r#"[{"session": {"name": "bare"}, "alphaConnected": true}]"#;
        let parsed = parse_status_output(raw)?;
        assert_eq!(parsed[0].session.name, "bare");
        assert!(!parsed[0].beta_connected);
        assert_eq!(parsed[0].successful_cycles, 0);
        Ok(())
    }

    #[test]
    fn test_health_predicates() -> Result<()> {
        let mut parsed = parse_status_output(ONE_SESSION)?;
        let mut status = parsed.remove(0);
        assert!(status.is_connected());
        assert!(status.is_healthy());

        status.last_error = "beta endpoint unreachable".into();
        assert!(status.is_connected());
        assert!(!status.is_healthy());

        status.last_error.clear();
        status.session.paused = true;
        assert!(!status.is_healthy());
        Ok(())
    }

    #[test]
    fn test_creation_time_converts_to_datetime() -> Result<()> {
        let parsed = parse_status_output(ONE_SESSION)?;
        let dt = parsed[0]
            .session
            .creation_time
            .as_datetime()
            .ok_or_else(|| Error::IoError("timestamp out of range".into()))?;
        assert_eq!(dt.timestamp(), 1_700_000_000);
        Ok(())
    }

    #[test]
    fn test_configuration_round_trips_field_names() -> Result<()> {
        let parsed = parse_status_output(ONE_SESSION)?;
        let config = &parsed[0].session.configuration;
        assert_eq!(config.ignores, vec!["node_modules".to_string()]);
        assert_eq!(config.ignore_vcs_mode, 1);
        assert_eq!(config.ssh_private_key_path, "/home/dev/.ssh/id");
        Ok(())
    }
}
