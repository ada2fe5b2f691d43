//! Background thread that owns a git2::Repository for its lifetime.
//!
//! git2::Repository is !Send, so it is opened inside the thread rather
//! than passed in. The loop exits when every request sender is dropped;
//! conversely, when the loop exits (or the open fails), the receiver is
//! dropped and callers see `WorkerGone` instead of hanging.

use std::path::{Path, PathBuf};

use crossbeam_channel::Receiver;
use git2::{ErrorCode, Repository};
use log::warn;

use revfs_core::backend::{BackendError, CommitInfo};

use crate::git::types::RepoRequest;

/// Entry point for the worker thread serving the checkout at `root`.
///
/// Opens the Repository and loops over incoming `RepoRequest` messages
/// until the channel is closed. Each request is answered through its own
/// reply sender; a dropped reply receiver is ignored.
pub fn repo_worker_loop(root: PathBuf, rx: Receiver<RepoRequest>) {
    let repo = match Repository::open(&root) {
        Ok(repo) => repo,
        Err(err) => {
            warn!(
                "cannot open repository at {}: {}",
                root.display(),
                err.message()
            );
            return;
        }
    };

    for request in rx {
        match request {
            RepoRequest::Show {
                commit,
                absolute_path,
                reply,
            } => {
                let _ = reply.send(show(&repo, &root, &commit, &absolute_path));
            }
            RepoRequest::CommitInfo { commit, reply } => {
                let _ = reply.send(commit_info(&repo, &commit));
            }
        }
    }
}

/// Reads the blob at `absolute_path` as of `commit`.
///
/// `Ok(None)` when the commit's tree has no entry for the path, which is
/// the legitimate answer on the empty side of an add or delete. Tree
/// entries that are not blobs (directories, submodules) also read as
/// `Ok(None)`.
fn show(
    repo: &Repository,
    root: &Path,
    commit: &str,
    absolute_path: &str,
) -> Result<Option<String>, BackendError> {
    let relative = Path::new(absolute_path)
        .strip_prefix(root)
        .map_err(|_| {
            BackendError::Failure(format!("{absolute_path} is outside {}", root.display()))
        })?
        .to_path_buf();

    let tree = resolve_commit(repo, commit)?
        .tree()
        .map_err(|err| BackendError::Failure(err.message().to_owned()))?;

    let entry = match tree.get_path(&relative) {
        Ok(entry) => entry,
        Err(err) if err.code() == ErrorCode::NotFound => return Ok(None),
        Err(err) => return Err(BackendError::Failure(err.message().to_owned())),
    };

    let object = entry
        .to_object(repo)
        .map_err(|err| BackendError::Failure(err.message().to_owned()))?;
    match object.as_blob() {
        Some(blob) => Ok(Some(String::from_utf8_lossy(blob.content()).into_owned())),
        None => Ok(None),
    }
}

/// Commit metadata for the vanished-commit diagnosis and tooling output.
fn commit_info(repo: &Repository, commit: &str) -> Result<CommitInfo, BackendError> {
    let commit = resolve_commit(repo, commit)?;
    let author = commit.author().name().unwrap_or_default().to_owned();
    Ok(CommitInfo {
        id: commit.id().to_string(),
        summary: commit.summary().unwrap_or_default().to_owned(),
        author,
        time: commit.time().seconds(),
    })
}

/// Resolves a revision string to a commit.
fn resolve_commit<'repo>(
    repo: &'repo Repository,
    commit: &str,
) -> Result<git2::Commit<'repo>, BackendError> {
    let object = repo
        .revparse_single(commit)
        .map_err(|err| classify(commit, err))?;
    object.peel_to_commit().map_err(|err| classify(commit, err))
}

/// Maps git2's not-found code to `CommitNotFound`, everything else to a
/// generic failure.
fn classify(commit: &str, err: git2::Error) -> BackendError {
    if err.code() == ErrorCode::NotFound {
        BackendError::CommitNotFound(commit.to_owned())
    } else {
        BackendError::Failure(err.message().to_owned())
    }
}
