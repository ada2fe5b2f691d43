//! Trait surface of the version-control backend.
//!
//! The engine never talks to a concrete VCS. It consumes these seams, the
//! `revfs` binary plugs in a git2-backed implementation, and tests plug in
//! in-memory fakes. Every trait object is `Send + Sync` so a resolver can
//! be shared across tasks.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Lifecycle state of the backend's repository discovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendState {
    /// Discovery has not finished; the repository list may still grow.
    #[default]
    Initializing,
    /// Discovery completed; the repository list is authoritative.
    Initialized,
}

/// Commit metadata returned by [`Repository::commit_info`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// Full object id.
    pub id: String,
    /// First line of the commit message.
    pub summary: String,
    /// Author name.
    pub author: String,
    /// Commit time, seconds since the epoch.
    pub time: i64,
}

/// Failures crossing the backend seam.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The revision cannot be resolved in the local object store.
    #[error("commit {0} not found locally")]
    CommitNotFound(String),
    /// The thread serving this repository has shut down.
    #[error("repository worker is gone")]
    WorkerGone,
    /// Any other backend failure, carrying the underlying message.
    #[error("backend failure: {0}")]
    Failure(String),
}

/// One local checkout known to the backend.
///
/// `show` distinguishes "no content at that revision" (`Ok(None)`, the
/// legitimate answer on the empty side of an add or delete) from a query
/// that failed outright (`Err`). Callers that conflate the two misreport
/// boundary files as errors.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Absolute root of the checkout this handle serves.
    fn root(&self) -> &Path;

    /// Contents of the file at `absolute_path` as of `commit`.
    ///
    /// # Errors
    ///
    /// Fails when the revision cannot be resolved or the object store
    /// cannot be read. An absent path at a valid revision is `Ok(None)`.
    async fn show(&self, commit: &str, absolute_path: &str)
        -> Result<Option<String>, BackendError>;

    /// Metadata for `commit`.
    ///
    /// # Errors
    ///
    /// Fails when the commit is unreachable from the local object store,
    /// which is how the resolver detects a vanished revision.
    async fn commit_info(&self, commit: &str) -> Result<CommitInfo, BackendError>;
}

/// The backend's repository inventory.
#[async_trait]
pub trait GitBackend: Send + Sync {
    /// Current discovery state.
    fn state(&self) -> BackendState;

    /// Snapshot of the currently known repositories, in discovery order.
    fn repositories(&self) -> Vec<Arc<dyn Repository>>;

    /// Resolves once at least one repository is known. May never resolve
    /// on a backend that finds nothing; callers bound it with a timeout.
    async fn wait_for_repository(&self);
}

/// Settlement of the credential subsystem.
///
/// The engine only needs to know when authentication is no longer in
/// flight; it never sees credentials. Implementations are expected to
/// resolve eventually on their own.
#[async_trait]
pub trait AuthGate: Send + Sync {
    /// Resolves once the backend is done authenticating.
    async fn settled(&self);
}

/// Gate for backends with no credential exchange; already settled.
#[derive(Debug, Default)]
pub struct SettledAuth;

#[async_trait]
impl AuthGate for SettledAuth {
    async fn settled(&self) {}
}

/// Joins a repository-relative path onto a checkout root, producing the
/// `absolute_path` form [`Repository::show`] expects.
///
/// Separators are normalized to forward slashes so the same identifier
/// resolves identically on every platform, and a leading `/` on the
/// relative part is ignored rather than replacing the root.
pub fn absolute_repo_path(root: &Path, relative: &str) -> String {
    root.join(relative.trim_start_matches(['/', '\\']))
        .to_string_lossy()
        .replace('\\', "/")
}
