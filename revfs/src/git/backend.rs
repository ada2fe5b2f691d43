//! git2-backed implementation of the backend seams.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use crossbeam_channel::Sender;
use log::warn;
use tokio::sync::{oneshot, watch};

use revfs_core::backend::{BackendError, BackendState, CommitInfo, GitBackend, Repository};

use crate::git::types::RepoRequest;
use crate::git::worker;

/// Handle to one checkout, served by a dedicated worker thread.
///
/// The handle itself holds no git2 state, only the checkout root and the
/// request channel, so it is freely shareable across tasks.
pub struct GitRepository {
    root: PathBuf,
    requests: Sender<RepoRequest>,
}

impl GitRepository {
    /// Finds the repository containing `path` and spawns the worker that
    /// serves it. `path` may be anywhere inside the checkout; the stored
    /// root is the discovered working directory.
    ///
    /// git2::Repository is !Send; the open here only locates the root,
    /// the worker opens its own handle for the thread's lifetime.
    ///
    /// # Errors
    ///
    /// Fails when no repository contains `path`.
    pub fn spawn(path: PathBuf) -> Result<Arc<Self>, BackendError> {
        let discovered = git2::Repository::discover(&path)
            .map_err(|err| BackendError::Failure(err.message().to_owned()))?;
        let root = discovered
            .workdir()
            .map(Path::to_path_buf)
            // Bare repository: serve trees straight from the git directory.
            .unwrap_or_else(|| discovered.path().to_path_buf());

        let (requests, rx) = crossbeam_channel::unbounded();
        let worker_root = root.clone();
        std::thread::spawn(move || worker::repo_worker_loop(worker_root, rx));
        Ok(Arc::new(Self { root, requests }))
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T, BackendError>>) -> RepoRequest,
    ) -> Result<T, BackendError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(build(reply))
            .map_err(|_| BackendError::WorkerGone)?;
        response.await.map_err(|_| BackendError::WorkerGone)?
    }
}

#[async_trait]
impl Repository for GitRepository {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn show(
        &self,
        commit: &str,
        absolute_path: &str,
    ) -> Result<Option<String>, BackendError> {
        let commit = commit.to_owned();
        let absolute_path = absolute_path.to_owned();
        self.request(|reply| RepoRequest::Show {
            commit,
            absolute_path,
            reply,
        })
        .await
    }

    async fn commit_info(&self, commit: &str) -> Result<CommitInfo, BackendError> {
        let commit = commit.to_owned();
        self.request(|reply| RepoRequest::CommitInfo { commit, reply })
            .await
    }
}

/// Repository inventory over local checkouts.
///
/// Starts in `Initializing` with an empty inventory; roots are added one
/// by one and [`LocalGitBackend::finish_discovery`] flips the state to
/// `Initialized`. Waiters are woken through a watch channel on every
/// inventory change, which is what makes the locator's bounded wait work.
pub struct LocalGitBackend {
    inner: RwLock<Inventory>,
    changed: watch::Sender<()>,
}

struct Inventory {
    state: BackendState,
    repos: Vec<Arc<dyn Repository>>,
}

impl LocalGitBackend {
    pub fn new() -> Arc<Self> {
        let (changed, _) = watch::channel(());
        Arc::new(Self {
            inner: RwLock::new(Inventory {
                state: BackendState::Initializing,
                repos: Vec::new(),
            }),
            changed,
        })
    }

    /// Locates the repository containing each path, logs and skips paths
    /// outside any checkout, and marks discovery finished.
    pub fn discover(paths: impl IntoIterator<Item = PathBuf>) -> Arc<Self> {
        let backend = Self::new();
        for path in paths {
            if let Err(err) = backend.add_repository(path.clone()) {
                warn!("skipping {}: {err}", path.display());
            }
        }
        backend.finish_discovery();
        backend
    }

    /// Adds the checkout containing `path` to the inventory and wakes
    /// waiters.
    ///
    /// # Errors
    ///
    /// Fails when no repository contains `path`.
    pub fn add_repository(&self, path: PathBuf) -> Result<(), BackendError> {
        let repo = GitRepository::spawn(path)?;
        match self.inner.write() {
            Ok(mut inner) => inner.repos.push(repo),
            Err(_) => {
                warn!("repository inventory lock poisoned");
                return Err(BackendError::Failure("inventory lock poisoned".into()));
            }
        }
        self.changed.send_replace(());
        Ok(())
    }

    /// Marks discovery complete. The inventory is authoritative afterwards.
    pub fn finish_discovery(&self) {
        match self.inner.write() {
            Ok(mut inner) => inner.state = BackendState::Initialized,
            Err(_) => warn!("repository inventory lock poisoned"),
        }
        self.changed.send_replace(());
    }
}

#[async_trait]
impl GitBackend for LocalGitBackend {
    fn state(&self) -> BackendState {
        match self.inner.read() {
            Ok(inner) => inner.state,
            Err(_) => {
                warn!("repository inventory lock poisoned");
                BackendState::Initializing
            }
        }
    }

    fn repositories(&self) -> Vec<Arc<dyn Repository>> {
        match self.inner.read() {
            Ok(inner) => inner.repos.clone(),
            Err(_) => {
                warn!("repository inventory lock poisoned");
                Vec::new()
            }
        }
    }

    async fn wait_for_repository(&self) {
        let mut changes = self.changed.subscribe();
        loop {
            if !self.repositories().is_empty() {
                return;
            }
            // Sends after `subscribe` are unseen, so a repository added
            // between the check above and this await still wakes the loop.
            if changes.changed().await.is_err() {
                return;
            }
        }
    }
}
