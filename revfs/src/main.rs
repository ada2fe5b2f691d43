//! Resolve review URIs to pinned file content.
//!
//! Entry point for the `revfs` binary. Wires the resolution engine
//! (`revfs-core`) to the git2-backed backend (`git`), the config file
//! (`config`), and the clap CLI surface (`cli`).
//!
//! # Wiring
//!
//! 1. `env_logger` first, so config and discovery warnings are visible.
//! 2. Checkout roots come from repeated `--repo` flags, falling back to
//!    the `rootPath` carried in the URI query.
//! 3. A fallback provider is always registered: the file named by
//!    `--fallback-file`, or an empty provider. The resolver treats an
//!    unregistered fallback as "engine not ready" and answers nothing,
//!    which is never what a CLI invocation means.
//! 4. Exit status: 0 with content on stdout, 1 when resolution is empty
//!    (diagnostics, if any, go to stderr), 2 for unusable arguments.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use revfs::cli::{self, CatArgs, Commands, UriArgs};
use revfs::config;
use revfs::git::backend::LocalGitBackend;
use revfs_core::backend::SettledAuth;
use revfs_core::locator::RepoLocator;
use revfs_core::notify::Notifier;
use revfs_core::resolver::{ContentResolver, FallbackProvider};
use revfs_core::session::StaticSessions;
use revfs_core::uri::{ReviewQuery, ReviewUri};

/// Prints resolver notifications to stderr.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn error(&self, message: &str) {
        eprintln!("revfs: {message}");
    }
}

/// Serves a fixed file as the fallback tier.
struct FileFallback {
    path: PathBuf,
}

#[async_trait]
impl FallbackProvider for FileFallback {
    async fn provide(&self, _uri: &ReviewUri) -> Option<String> {
        tokio::fs::read_to_string(&self.path).await.ok()
    }
}

/// Registered when no `--fallback-file` is given; never has content.
struct EmptyFallback;

#[async_trait]
impl FallbackProvider for EmptyFallback {
    async fn provide(&self, _uri: &ReviewUri) -> Option<String> {
        None
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let args = cli::parse_args();

    match args.command {
        Commands::Cat(args) => handle_cat(args).await,
        Commands::Uri(args) => handle_uri(args),
    }
}

/// Resolves the identifier and prints the content.
async fn handle_cat(args: CatArgs) -> ExitCode {
    let uri = match identifier_from(&args) {
        Ok(uri) => uri,
        Err(message) => {
            eprintln!("revfs: {message}");
            return ExitCode::from(2);
        }
    };

    let mut roots = args.repos;
    if roots.is_empty() {
        if let Some(root) = uri.decode_query().and_then(|query| query.root_path) {
            roots.push(PathBuf::from(root));
        }
    }

    let config = config::load();
    let repo_wait = args
        .wait_ms
        .map(Duration::from_millis)
        .or_else(|| config.repo_wait());

    let backend = LocalGitBackend::discover(roots);
    let mut locator = RepoLocator::new(backend, Arc::new(SettledAuth));
    if let Some(repo_wait) = repo_wait {
        locator = locator.with_repo_wait(repo_wait);
    }

    let resolver = ContentResolver::new(
        locator,
        Arc::new(StaticSessions::default()),
        Arc::new(ConsoleNotifier),
    );
    match args.fallback_file {
        Some(path) => resolver.register_fallback(Arc::new(FileFallback { path })),
        None => resolver.register_fallback(Arc::new(EmptyFallback)),
    }

    let content = resolver.resolve(&uri).await;
    if content.is_empty() {
        return ExitCode::FAILURE;
    }
    match std::io::stdout().write_all(&content) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("revfs: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Builds and prints the review URI for a pinned file.
fn handle_uri(args: UriArgs) -> ExitCode {
    match compose_uri(&args.path, args.commit, &args.root, args.authority) {
        Ok(uri) => {
            println!("{uri}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("revfs: {message}");
            ExitCode::from(2)
        }
    }
}

/// Builds the identifier from either the URI argument or the component
/// flags.
fn identifier_from(args: &CatArgs) -> Result<ReviewUri, String> {
    if let Some(uri) = &args.uri {
        return ReviewUri::parse(uri).map_err(|err| err.to_string());
    }
    match (&args.path, &args.commit, &args.root) {
        (Some(path), Some(commit), Some(root)) => {
            compose_uri(path, commit.clone(), root, args.authority.clone())
        }
        _ => Err(String::from(
            "expected a review URI or --path, --commit and --root",
        )),
    }
}

/// Builds a review URI from components. `path` may be absolute (inside
/// `root`) or relative to it.
fn compose_uri(
    path: &Path,
    commit: String,
    root: &Path,
    authority: String,
) -> Result<ReviewUri, String> {
    let relative = match path.strip_prefix(root) {
        Ok(stripped) => stripped.to_path_buf(),
        Err(_) if path.is_relative() => path.to_path_buf(),
        Err(_) => {
            return Err(format!(
                "{} is outside the checkout root {}",
                path.display(),
                root.display()
            ))
        }
    };
    let relative = relative.to_string_lossy().replace('\\', "/");

    let query = ReviewQuery::new(relative.clone(), commit, root.to_string_lossy().into_owned());
    Ok(ReviewUri::new(authority, relative, &query))
}
