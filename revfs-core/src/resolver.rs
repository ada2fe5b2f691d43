//! The content-resolution chain.
//!
//! [`ContentResolver::resolve`] turns a review URI into the bytes of the
//! pinned file version. It tries an ordered chain of sources (cached base
//! content, a backend `show`, the registered fallback) and classifies an
//! all-empty outcome so the user hears about the two conditions they can
//! act on and nothing else. Resolution never fails: every internal error
//! maps to an empty tier, and the worst overall outcome is an empty
//! buffer.

use std::path::Path;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use log::{debug, warn};

use crate::backend::{absolute_repo_path, Repository};
use crate::locator::RepoLocator;
use crate::notify::Notifier;
use crate::session::{find_live, find_obsolete, SessionProvider};
use crate::uri::ReviewUri;

/// Content source of last resort, registered by the surface that owns the
/// review data (it typically re-fetches from the remote).
#[async_trait]
pub trait FallbackProvider: Send + Sync {
    /// Content for `uri`, or `None` when this provider has nothing.
    async fn provide(&self, uri: &ReviewUri) -> Option<String>;
}

/// Resolves review URIs to file content.
///
/// One resolver serves every review session. The fallback slot starts
/// empty and is filled by [`ContentResolver::register_fallback`]; until
/// then every resolution yields an empty buffer without touching the
/// backend, since a chain that cannot run to completion would misreport
/// transient gaps as missing content.
pub struct ContentResolver {
    locator: RepoLocator,
    sessions: Arc<dyn SessionProvider>,
    notifier: Arc<dyn Notifier>,
    fallback: RwLock<Option<Arc<dyn FallbackProvider>>>,
}

impl ContentResolver {
    pub fn new(
        locator: RepoLocator,
        sessions: Arc<dyn SessionProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            locator,
            sessions,
            notifier,
            fallback: RwLock::new(None),
        }
    }

    /// Installs the fallback provider. A later registration replaces an
    /// earlier one.
    pub fn register_fallback(&self, provider: Arc<dyn FallbackProvider>) {
        match self.fallback.write() {
            Ok(mut slot) => *slot = Some(provider),
            Err(_) => warn!("fallback slot lock poisoned"),
        }
    }

    /// Resolves `uri` to the bytes of the pinned file version.
    ///
    /// Never fails. An empty buffer means "no content", which is the
    /// correct answer for the empty side of an add or delete, for
    /// identifiers with an incomplete payload, and for every internal
    /// failure after the chain has been exhausted. At most one user
    /// notification is raised per call:
    ///
    /// * no repository owns the identifier's root path, or
    /// * the pinned commit is gone from the local object store and the
    ///   identifier is not a leftover of a superseded diff.
    pub async fn resolve(&self, uri: &ReviewUri) -> Vec<u8> {
        let Some(fallback) = self.fallback() else {
            return Vec::new();
        };

        let query = uri.decode_query().unwrap_or_default();
        let (Some(path), Some(commit)) = (query.path, query.commit) else {
            return Vec::new();
        };
        let root_path = query.root_path.unwrap_or_default();

        let Some(repository) = self.locator.locate(Path::new(&root_path)).await else {
            self.notifier.error(&format!(
                "We couldn't find an open repository for {commit} locally."
            ));
            return Vec::new();
        };

        match self
            .try_chain(uri, repository.as_ref(), &commit, &path, fallback.as_ref())
            .await
        {
            Some(content) => content.into_bytes(),
            None => {
                self.explain_empty(uri, repository.as_ref(), &commit).await;
                Vec::new()
            }
        }
    }

    /// Runs the source chain. A tier wins by producing non-empty content;
    /// empty output and errors both fall through to the next tier.
    async fn try_chain(
        &self,
        uri: &ReviewUri,
        repository: &dyn Repository,
        commit: &str,
        path: &str,
        fallback: &dyn FallbackProvider,
    ) -> Option<String> {
        if let Some(change) = find_live(self.sessions.as_ref(), uri) {
            debug!("trying cached base content for {uri}");
            if let Some(base) = change.base_content().await.filter(|base| !base.is_empty()) {
                return Some(base);
            }
        }

        let absolute = absolute_repo_path(repository.root(), path);
        debug!("trying backend show {commit} {absolute}");
        match repository.show(commit, &absolute).await {
            Ok(Some(content)) if !content.is_empty() => return Some(content),
            Ok(_) => {}
            Err(err) => debug!("show {commit} {absolute} failed: {err}"),
        }

        debug!("trying fallback provider for {uri}");
        fallback
            .provide(uri)
            .await
            .filter(|content| !content.is_empty())
    }

    /// Classifies an exhausted chain. Silence is deliberate when the
    /// commit still exists (the file is simply absent at that revision)
    /// and when the identifier belongs to a superseded diff.
    async fn explain_empty(&self, uri: &ReviewUri, repository: &dyn Repository, commit: &str) {
        match repository.commit_info(commit).await {
            Ok(_) => {}
            Err(err) => {
                warn!("commit lookup for {commit} failed: {err}");
                if find_obsolete(self.sessions.as_ref(), uri).is_none() {
                    self.notifier.error(&format!(
                        "We couldn't find commit {commit} locally. You may want to sync \
                         the branch with remote. Sometimes commits can disappear after a \
                         force-push."
                    ));
                }
            }
        }
    }

    fn fallback(&self) -> Option<Arc<dyn FallbackProvider>> {
        match self.fallback.read() {
            Ok(slot) => slot.clone(),
            Err(_) => {
                warn!("fallback slot lock poisoned");
                None
            }
        }
    }
}
