//! Repository resources and their on-disk resolution.
//!
//! A repository is identified by a stable ID and resolved to paths on
//! shared storage by a [`RepoProvider`]: one trunk per repository plus any
//! number of views (per-developer working copies cloned from the trunk).
//! The provider also owns the ID → lock-file mapping used by the access
//! coordinator; the mapping is deterministic and collision-free, so two
//! distinct repositories can never alias to the same lock path.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::lock::RepoLock;

/// Stable identifier of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoId(String);

impl RepoId {
    /// Wrap a raw identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RepoId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identifier of a view (a working copy of a repository).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewId(String);

impl ViewId {
    /// Wrap a raw identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ViewId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Resolves repository IDs to on-disk paths.
///
/// Persistence and the VCS object model live behind this seam; the
/// coordinator only needs path resolution.
pub trait RepoProvider: Send + Sync {
    /// Filesystem path of the repository trunk.
    fn trunk_path(&self, repo: &RepoId) -> PathBuf;

    /// Filesystem path of a view of the repository.
    fn view_path(&self, repo: &RepoId, view: &ViewId) -> PathBuf;
}

/// Standard provider: `<root>/<repo>/trunk` and `<root>/<repo>/<view>`.
#[derive(Debug, Clone)]
pub struct DiskRepoProvider {
    root: PathBuf,
}

impl DiskRepoProvider {
    /// Name of the trunk directory inside each repository directory.
    pub const TRUNK_DIR: &'static str = "trunk";

    /// Create a provider rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory all repositories live under.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl RepoProvider for DiskRepoProvider {
    fn trunk_path(&self, repo: &RepoId) -> PathBuf {
        self.root
            .join(escape_component(repo.as_str()))
            .join(Self::TRUNK_DIR)
    }

    fn view_path(&self, repo: &RepoId, view: &ViewId) -> PathBuf {
        self.root
            .join(escape_component(repo.as_str()))
            .join(escape_component(view.as_str()))
    }
}

/// Maps resources to lock files under a single lock directory.
#[derive(Debug, Clone)]
pub struct LockManager {
    lock_dir: PathBuf,
}

impl LockManager {
    /// Create a manager keeping lock files under `lock_dir`.
    #[must_use]
    pub fn new(lock_dir: impl Into<PathBuf>) -> Self {
        Self {
            lock_dir: lock_dir.into(),
        }
    }

    /// Directory the lock files live in.
    #[must_use]
    pub fn lock_dir(&self) -> &Path {
        &self.lock_dir
    }

    /// Lock file path for a repository trunk or one of its views.
    ///
    /// The trunk and each view are distinct resources with distinct lock
    /// files; operations on different views of the same repository do not
    /// serialize against each other.
    #[must_use]
    pub fn lock_path(&self, repo: &RepoId, view: Option<&ViewId>) -> PathBuf {
        let name = match view {
            Some(v) => format!(
                "{}.{}.lock",
                escape_component(repo.as_str()),
                escape_component(v.as_str())
            ),
            None => format!("{}.lock", escape_component(repo.as_str())),
        };
        self.lock_dir.join(name)
    }

    /// The lock anchored at the resource's lock path.
    #[must_use]
    pub fn repo_lock(&self, repo: &RepoId, view: Option<&ViewId>) -> RepoLock {
        RepoLock::new(self.lock_path(repo, view))
    }
}

/// Escape an identifier into a single safe path component.
///
/// Injective: `%` escapes itself, so distinct inputs always map to
/// distinct outputs, and `.` is escaped so the `repo.view` join in
/// [`LockManager::lock_path`] cannot be forged by an ID containing a dot.
fn escape_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        match b {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' => out.push(char::from(b)),
            _ => {
                out.push('%');
                out.push_str(&format!("{b:02x}"));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_passes_safe_chars_through() {
        assert_eq!(escape_component("repo-42_a"), "repo-42_a");
    }

    #[test]
    fn test_escape_is_injective_for_hostile_ids() {
        // Without escaping '.', these two would collide on "a.b.lock".
        let mgr = LockManager::new("/locks");
        let dotted = mgr.lock_path(&RepoId::new("a.b"), None);
        let viewed = mgr.lock_path(&RepoId::new("a"), Some(&ViewId::new("b")));
        assert_ne!(dotted, viewed);
    }

    #[test]
    fn test_escape_neutralizes_path_separators() {
        let escaped = escape_component("../etc/passwd");
        assert!(!escaped.contains('/'));
        assert!(!escaped.contains(".."));
    }

    #[test]
    fn test_escape_escapes_the_escape_char() {
        // "a%2f" must not collide with the escaped form of "a/".
        assert_ne!(escape_component("a%2f"), escape_component("a/"));
    }

    #[test]
    fn test_distinct_repos_never_share_a_lock_path() {
        let mgr = LockManager::new("/locks");
        let a = mgr.lock_path(&RepoId::new("repo-a"), None);
        let b = mgr.lock_path(&RepoId::new("repo-b"), None);
        assert_ne!(a, b);
    }

    #[test]
    fn test_trunk_and_view_paths() {
        let provider = DiskRepoProvider::new("/repos");
        let repo = RepoId::new("cb1");
        assert_eq!(
            provider.trunk_path(&repo),
            PathBuf::from("/repos/cb1/trunk")
        );
        assert_eq!(
            provider.view_path(&repo, &ViewId::new("v9")),
            PathBuf::from("/repos/cb1/v9")
        );
    }

    #[test]
    fn test_lock_manager_paths_live_under_lock_dir() {
        let mgr = LockManager::new("/var/locks");
        let path = mgr.lock_path(&RepoId::new("cb1"), Some(&ViewId::new("v1")));
        assert!(path.starts_with("/var/locks"));
        assert!(path.to_string_lossy().ends_with("cb1.v1.lock"));
    }
}
