//! Repository location with bounded readiness waits.
//!
//! Resolution usually races backend start-up: an editor can ask for
//! pinned content before credential negotiation or repository discovery
//! has finished. The locator absorbs that race in one place so the
//! resolver itself never blocks unboundedly.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::time;

use crate::backend::{AuthGate, BackendState, GitBackend, Repository};

/// Ceiling for the repository-list wait. Location proceeds with whatever
/// is known once it elapses.
pub const DEFAULT_REPO_WAIT: Duration = Duration::from_millis(4000);

/// Finds the repository that owns a checkout path, tolerating a backend
/// that is still coming up.
pub struct RepoLocator {
    backend: Arc<dyn GitBackend>,
    auth: Arc<dyn AuthGate>,
    repo_wait: Duration,
}

impl RepoLocator {
    pub fn new(backend: Arc<dyn GitBackend>, auth: Arc<dyn AuthGate>) -> Self {
        Self {
            backend,
            auth,
            repo_wait: DEFAULT_REPO_WAIT,
        }
    }

    /// Overrides the repository-list wait ceiling.
    #[must_use]
    pub fn with_repo_wait(mut self, repo_wait: Duration) -> Self {
        self.repo_wait = repo_wait;
        self
    }

    /// Returns a handle to the repository whose root contains `root_path`.
    ///
    /// Waits for authentication to settle (unbounded, the auth subsystem
    /// bounds itself), then up to the configured ceiling for the
    /// repository list to populate when discovery has not finished or has
    /// found nothing yet. An elapsed ceiling is not an error: the match
    /// below simply runs against whatever the backend knows.
    pub async fn locate(&self, root_path: &Path) -> Option<Arc<dyn Repository>> {
        self.auth.settled().await;

        if self.backend.state() != BackendState::Initialized
            || self.backend.repositories().is_empty()
        {
            let _ = time::timeout(self.repo_wait, self.backend.wait_for_repository()).await;
        }

        closest_match(self.backend.repositories(), root_path)
    }
}

/// Picks the repository whose root is an ancestor of (or equal to)
/// `root_path`, preferring the deepest root when checkouts nest.
fn closest_match(
    repositories: Vec<Arc<dyn Repository>>,
    root_path: &Path,
) -> Option<Arc<dyn Repository>> {
    repositories
        .into_iter()
        .filter(|repo| root_path.starts_with(repo.root()))
        .max_by_key(|repo| repo.root().components().count())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::backend::{BackendError, CommitInfo, SettledAuth};

    struct StubRepo {
        root: PathBuf,
    }

    impl StubRepo {
        fn open(root: &str) -> Arc<dyn Repository> {
            Arc::new(Self {
                root: PathBuf::from(root),
            })
        }
    }

    #[async_trait]
    impl Repository for StubRepo {
        fn root(&self) -> &Path {
            &self.root
        }

        async fn show(
            &self,
            _commit: &str,
            _absolute_path: &str,
        ) -> Result<Option<String>, BackendError> {
            Ok(None)
        }

        async fn commit_info(&self, commit: &str) -> Result<CommitInfo, BackendError> {
            Err(BackendError::CommitNotFound(commit.to_owned()))
        }
    }

    #[derive(Default)]
    struct StubBackend {
        state: Mutex<BackendState>,
        repos: Mutex<Vec<Arc<dyn Repository>>>,
    }

    impl StubBackend {
        fn add_repo(&self, root: &str) {
            self.repos.lock().unwrap().push(StubRepo::open(root));
        }

        fn initialize(&self) {
            *self.state.lock().unwrap() = BackendState::Initialized;
        }
    }

    #[async_trait]
    impl GitBackend for StubBackend {
        fn state(&self) -> BackendState {
            *self.state.lock().unwrap()
        }

        fn repositories(&self) -> Vec<Arc<dyn Repository>> {
            self.repos.lock().unwrap().clone()
        }

        async fn wait_for_repository(&self) {
            while self.repositories().is_empty() {
                time::sleep(Duration::from_millis(2)).await;
            }
        }
    }

    fn locator(backend: Arc<StubBackend>) -> RepoLocator {
        RepoLocator::new(backend, Arc::new(SettledAuth))
    }

    #[tokio::test]
    async fn finds_owning_repository_without_waiting() {
        let backend = Arc::new(StubBackend::default());
        backend.add_repo("/work/repo");
        backend.initialize();

        let found = locator(backend)
            .locate(Path::new("/work/repo"))
            .await
            .unwrap();
        assert_eq!(found.root(), Path::new("/work/repo"));
    }

    #[tokio::test]
    async fn prefers_deepest_root_when_checkouts_nest() {
        let backend = Arc::new(StubBackend::default());
        backend.add_repo("/work");
        backend.add_repo("/work/repo");
        backend.initialize();

        let found = locator(backend)
            .locate(Path::new("/work/repo/src"))
            .await
            .unwrap();
        assert_eq!(found.root(), Path::new("/work/repo"));
    }

    #[tokio::test]
    async fn waits_for_discovery_to_populate() {
        let backend = Arc::new(StubBackend::default());
        let publisher = Arc::clone(&backend);
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(20)).await;
            publisher.add_repo("/work/repo");
            publisher.initialize();
        });

        let found = locator(backend)
            .with_repo_wait(Duration::from_millis(500))
            .locate(Path::new("/work/repo/src/lib.rs"))
            .await;
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn gives_up_after_the_wait_ceiling() {
        let backend = Arc::new(StubBackend::default());

        let found = locator(backend)
            .with_repo_wait(Duration::from_millis(30))
            .locate(Path::new("/work/repo"))
            .await;
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn unrelated_roots_do_not_match() {
        let backend = Arc::new(StubBackend::default());
        backend.add_repo("/elsewhere");
        backend.initialize();

        let found = locator(backend).locate(Path::new("/work/repo")).await;
        assert!(found.is_none());
    }
}
