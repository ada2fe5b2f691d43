//! Owned message types for the repository worker thread.
//!
//! All communication with a worker happens via channels: `RepoRequest` in
//! over a crossbeam channel, the answer back through the `oneshot` sender
//! carried inside each request. Requests hold only owned data so they can
//! be built on any task and sent across the thread boundary.

use tokio::sync::oneshot;

use revfs_core::backend::{BackendError, CommitInfo};

/// Commands sent from async tasks to a repository worker thread.
#[derive(Debug)]
pub enum RepoRequest {
    /// Read one file's content as of a revision.
    Show {
        /// Revision to read at.
        commit: String,
        /// Absolute path of the file inside the checkout.
        absolute_path: String,
        /// Reply slot. `Ok(None)` means the path has no entry at that
        /// revision.
        reply: oneshot::Sender<Result<Option<String>, BackendError>>,
    },
    /// Look up commit metadata.
    CommitInfo {
        /// Revision to describe.
        commit: String,
        /// Reply slot.
        reply: oneshot::Sender<Result<CommitInfo, BackendError>>,
    },
}
