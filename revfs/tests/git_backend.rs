//! Integration tests for the git2-backed backend.
//!
//! Exercises worker-thread round trips against real repositories in temp
//! directories: discovery, blob reads, commit lookups, and the full
//! resolution chain over a local checkout.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use revfs::git::backend::LocalGitBackend;
use revfs_core::backend::{
    absolute_repo_path, BackendError, BackendState, GitBackend, SettledAuth,
};
use revfs_core::locator::RepoLocator;
use revfs_core::notify::Notifier;
use revfs_core::resolver::{ContentResolver, FallbackProvider};
use revfs_core::session::StaticSessions;
use revfs_core::uri::{ReviewQuery, ReviewUri};

const MISSING_COMMIT: &str = "deadbeefdeadbeefdeadbeefdeadbeefdeadbeef";

/// Helper to create an empty repository in a temp directory.
fn init_repo(root: &Path) -> git2::Repository {
    git2::Repository::init(root).unwrap()
}

/// Helper to write, stage, and commit one file. Returns the commit id.
fn commit_file(repo: &git2::Repository, relative: &str, content: &str, message: &str) -> String {
    let workdir = repo.workdir().unwrap();
    let file = workdir.join(relative);
    if let Some(parent) = file.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&file, content).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(relative)).unwrap();
    index.write().unwrap();
    commit_index(repo, message)
}

/// Helper to remove a file and commit the deletion. Returns the commit id.
fn commit_removal(repo: &git2::Repository, relative: &str, message: &str) -> String {
    let workdir = repo.workdir().unwrap();
    std::fs::remove_file(workdir.join(relative)).unwrap();

    let mut index = repo.index().unwrap();
    index.remove_path(Path::new(relative)).unwrap();
    index.write().unwrap();
    commit_index(repo, message)
}

fn commit_index(repo: &git2::Repository, message: &str) -> String {
    let tree_id = repo.index().unwrap().write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let signature = git2::Signature::now("dev", "dev@example.com").unwrap();
    let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
        .unwrap()
        .to_string()
}

#[derive(Default)]
struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn error(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_owned());
    }
}

struct NoFallback;

#[async_trait]
impl FallbackProvider for NoFallback {
    async fn provide(&self, _uri: &ReviewUri) -> Option<String> {
        None
    }
}

fn resolver_over(root: PathBuf, notifier: Arc<RecordingNotifier>) -> ContentResolver {
    let backend = LocalGitBackend::discover([root]);
    let locator = RepoLocator::new(backend, Arc::new(SettledAuth));
    let resolver = ContentResolver::new(locator, Arc::new(StaticSessions::default()), notifier);
    resolver.register_fallback(Arc::new(NoFallback));
    resolver
}

fn pinned_uri(relative: &str, commit: &str, root: &Path) -> ReviewUri {
    ReviewUri::new(
        "pr-1",
        relative,
        &ReviewQuery::new(relative, commit, root.to_string_lossy()),
    )
}

#[tokio::test]
async fn discovers_and_reads_committed_content() {
    let dir = tempfile::TempDir::new().unwrap();
    let repo = init_repo(dir.path());
    let commit = commit_file(&repo, "src/lib.rs", "pub fn answer() -> u32 { 42 }\n", "add lib");

    let backend = LocalGitBackend::discover([dir.path().to_path_buf()]);
    assert_eq!(backend.state(), BackendState::Initialized);
    let repos = backend.repositories();
    assert_eq!(repos.len(), 1, "one repository discovered");
    assert_eq!(repos[0].root(), dir.path());

    let absolute = absolute_repo_path(repos[0].root(), "src/lib.rs");
    let content = repos[0].show(&commit, &absolute).await.unwrap();
    assert_eq!(content.as_deref(), Some("pub fn answer() -> u32 { 42 }\n"));
}

#[tokio::test]
async fn absent_path_reads_as_none() {
    let dir = tempfile::TempDir::new().unwrap();
    let repo = init_repo(dir.path());
    let commit = commit_file(&repo, "src/lib.rs", "fn main() {}\n", "add lib");

    let backend = LocalGitBackend::discover([dir.path().to_path_buf()]);
    let repos = backend.repositories();
    let absolute = absolute_repo_path(repos[0].root(), "src/missing.rs");

    let content = repos[0].show(&commit, &absolute).await.unwrap();
    assert!(content.is_none(), "absent path is not an error");
}

#[tokio::test]
async fn unknown_commit_is_classified() {
    let dir = tempfile::TempDir::new().unwrap();
    let repo = init_repo(dir.path());
    commit_file(&repo, "src/lib.rs", "fn main() {}\n", "add lib");

    let backend = LocalGitBackend::discover([dir.path().to_path_buf()]);
    let repos = backend.repositories();
    let absolute = absolute_repo_path(repos[0].root(), "src/lib.rs");

    let outcome = repos[0].show(MISSING_COMMIT, &absolute).await;
    assert!(matches!(outcome, Err(BackendError::CommitNotFound(_))));
}

#[tokio::test]
async fn commit_info_round_trips() {
    let dir = tempfile::TempDir::new().unwrap();
    let repo = init_repo(dir.path());
    let commit = commit_file(&repo, "src/lib.rs", "fn main() {}\n", "add lib");

    let backend = LocalGitBackend::discover([dir.path().to_path_buf()]);
    let repos = backend.repositories();

    let info = repos[0].commit_info(&commit).await.unwrap();
    assert_eq!(info.id, commit);
    assert_eq!(info.summary, "add lib");
    assert_eq!(info.author, "dev");

    let missing = repos[0].commit_info(MISSING_COMMIT).await;
    assert!(matches!(missing, Err(BackendError::CommitNotFound(_))));
}

#[tokio::test]
async fn discovers_repository_from_nested_path() {
    let dir = tempfile::TempDir::new().unwrap();
    let repo = init_repo(dir.path());
    commit_file(&repo, "src/lib.rs", "fn main() {}\n", "add lib");

    let backend = LocalGitBackend::discover([dir.path().join("src")]);
    let repos = backend.repositories();
    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0].root(), dir.path());
}

#[tokio::test]
async fn non_repository_roots_are_skipped() {
    let dir = tempfile::TempDir::new().unwrap();

    let backend = LocalGitBackend::discover([dir.path().to_path_buf()]);
    assert_eq!(backend.state(), BackendState::Initialized);
    assert!(backend.repositories().is_empty());
}

#[tokio::test]
async fn resolves_content_pinned_behind_head() {
    let dir = tempfile::TempDir::new().unwrap();
    let repo = init_repo(dir.path());
    let pinned = commit_file(&repo, "src/lib.rs", "first version\n", "add lib");
    commit_file(&repo, "src/lib.rs", "second version\n", "rewrite lib");

    let notifier = Arc::new(RecordingNotifier::default());
    let resolver = resolver_over(dir.path().to_path_buf(), notifier.clone());

    let content = resolver
        .resolve(&pinned_uri("src/lib.rs", &pinned, dir.path()))
        .await;
    assert_eq!(content, b"first version\n");
    assert!(notifier.messages().is_empty());
}

#[tokio::test]
async fn deleted_file_resolves_empty_and_silent() {
    let dir = tempfile::TempDir::new().unwrap();
    let repo = init_repo(dir.path());
    commit_file(&repo, "src/lib.rs", "short lived\n", "add lib");
    let removal = commit_removal(&repo, "src/lib.rs", "drop lib");

    let notifier = Arc::new(RecordingNotifier::default());
    let resolver = resolver_over(dir.path().to_path_buf(), notifier.clone());

    let content = resolver
        .resolve(&pinned_uri("src/lib.rs", &removal, dir.path()))
        .await;
    assert!(content.is_empty(), "no content side after the deletion");
    assert!(notifier.messages().is_empty(), "boundary emptiness is silent");
}

#[tokio::test]
async fn vanished_commit_notifies_against_real_repo() {
    let dir = tempfile::TempDir::new().unwrap();
    let repo = init_repo(dir.path());
    commit_file(&repo, "src/lib.rs", "fn main() {}\n", "add lib");

    let notifier = Arc::new(RecordingNotifier::default());
    let resolver = resolver_over(dir.path().to_path_buf(), notifier.clone());

    let content = resolver
        .resolve(&pinned_uri("src/lib.rs", MISSING_COMMIT, dir.path()))
        .await;
    assert!(content.is_empty());

    let messages = notifier.messages();
    assert_eq!(messages.len(), 1, "exactly one notification");
    assert!(messages[0].contains(MISSING_COMMIT));
}
