//! Review sessions and per-file change representations.
//!
//! A review session owns two disjoint ordered collections of change
//! representations: *live* changes that are part of the current diff, and
//! *obsolete* ones superseded by a later push, kept around so identifiers
//! handed out earlier can still be recognized. The resolver reads both
//! through the [`SessionProvider`] seam and never mutates them.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use log::{debug, warn};
use tokio::sync::OnceCell;

use crate::backend::{absolute_repo_path, Repository};
use crate::uri::ReviewUri;

/// One file's change within one review session.
#[async_trait]
pub trait FileChange: Send + Sync {
    /// The virtual identifier this change targets. Lookups match on its
    /// authority and path only; the query plays no part.
    fn target(&self) -> &ReviewUri;

    /// The pre-change ("base") version of the file, computed on demand
    /// and memoized by the representation itself. `None` when the file
    /// has no base, e.g. it was added by this change.
    async fn base_content(&self) -> Option<String>;
}

/// One review session's change collections.
pub trait ReviewSession: Send + Sync {
    /// Changes in the current diff, in presentation order.
    fn live_changes(&self) -> Vec<Arc<dyn FileChange>>;

    /// Changes superseded by a later push.
    fn obsolete_changes(&self) -> Vec<Arc<dyn FileChange>>;
}

/// Read-only view of every active review session, in session order.
///
/// The resolver receives one of these at construction instead of scanning
/// a global registry, so embedders decide what "active" means.
pub trait SessionProvider: Send + Sync {
    fn sessions(&self) -> Vec<Arc<dyn ReviewSession>>;
}

/// First live change across all sessions whose target matches `uri`.
pub fn find_live(provider: &dyn SessionProvider, uri: &ReviewUri) -> Option<Arc<dyn FileChange>> {
    find_in(provider, uri, |session| session.live_changes())
}

/// First obsolete change across all sessions whose target matches `uri`.
pub fn find_obsolete(
    provider: &dyn SessionProvider,
    uri: &ReviewUri,
) -> Option<Arc<dyn FileChange>> {
    find_in(provider, uri, |session| session.obsolete_changes())
}

fn find_in(
    provider: &dyn SessionProvider,
    uri: &ReviewUri,
    collection: impl Fn(&dyn ReviewSession) -> Vec<Arc<dyn FileChange>>,
) -> Option<Arc<dyn FileChange>> {
    provider.sessions().into_iter().find_map(|session| {
        collection(session.as_ref()).into_iter().find(|change| {
            let target = change.target();
            target.authority == uri.authority && target.path == uri.path
        })
    })
}

/// A change whose base is the file as of `base_commit` in the repository
/// that owns it, fetched lazily and memoized after the first successful
/// read. A failed fetch is retried on the next call.
pub struct GitFileChange {
    target: ReviewUri,
    repository: Arc<dyn Repository>,
    base_commit: String,
    path: String,
    base: OnceCell<Option<String>>,
}

impl GitFileChange {
    /// `path` is repository-relative; `target` is the identifier this
    /// change will answer for.
    pub fn new(
        target: ReviewUri,
        repository: Arc<dyn Repository>,
        base_commit: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            target,
            repository,
            base_commit: base_commit.into(),
            path: path.into(),
            base: OnceCell::new(),
        }
    }
}

#[async_trait]
impl FileChange for GitFileChange {
    fn target(&self) -> &ReviewUri {
        &self.target
    }

    async fn base_content(&self) -> Option<String> {
        let fetch = self.base.get_or_try_init(|| async {
            let absolute = absolute_repo_path(self.repository.root(), &self.path);
            self.repository.show(&self.base_commit, &absolute).await
        });
        match fetch.await {
            Ok(base) => base.clone(),
            Err(err) => {
                debug!("base content fetch for {} failed: {err}", self.target);
                None
            }
        }
    }
}

/// In-memory session for embedders that do not bring their own model.
///
/// Readers get a snapshot of the `Arc` list, which is all the resolver
/// needs; the owning surface replaces the live set wholesale when the
/// diff is recomputed, or moves it aside with [`ReviewModel::supersede`]
/// after a force-push.
#[derive(Default)]
pub struct ReviewModel {
    live: RwLock<Vec<Arc<dyn FileChange>>>,
    obsolete: RwLock<Vec<Arc<dyn FileChange>>>,
}

impl ReviewModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the live set.
    pub fn set_live(&self, changes: Vec<Arc<dyn FileChange>>) {
        match self.live.write() {
            Ok(mut live) => *live = changes,
            Err(_) => warn!("live change list lock poisoned"),
        }
    }

    /// Appends one live change.
    pub fn push_live(&self, change: Arc<dyn FileChange>) {
        match self.live.write() {
            Ok(mut live) => live.push(change),
            Err(_) => warn!("live change list lock poisoned"),
        }
    }

    /// Moves every live change to the obsolete collection. Called when a
    /// new head replaces the diff the changes were computed against.
    pub fn supersede(&self) {
        let (Ok(mut live), Ok(mut obsolete)) = (self.live.write(), self.obsolete.write()) else {
            warn!("change list lock poisoned");
            return;
        };
        obsolete.append(&mut live);
    }
}

impl ReviewSession for ReviewModel {
    fn live_changes(&self) -> Vec<Arc<dyn FileChange>> {
        match self.live.read() {
            Ok(live) => live.clone(),
            Err(_) => {
                warn!("live change list lock poisoned");
                Vec::new()
            }
        }
    }

    fn obsolete_changes(&self) -> Vec<Arc<dyn FileChange>> {
        match self.obsolete.read() {
            Ok(obsolete) => obsolete.clone(),
            Err(_) => {
                warn!("obsolete change list lock poisoned");
                Vec::new()
            }
        }
    }
}

/// Fixed list of sessions, for embedders whose sessions are known up
/// front and for tests.
#[derive(Default)]
pub struct StaticSessions {
    sessions: Vec<Arc<dyn ReviewSession>>,
}

impl StaticSessions {
    pub fn new(sessions: Vec<Arc<dyn ReviewSession>>) -> Self {
        Self { sessions }
    }

    pub fn single(session: Arc<dyn ReviewSession>) -> Self {
        Self::new(vec![session])
    }
}

impl SessionProvider for StaticSessions {
    fn sessions(&self) -> Vec<Arc<dyn ReviewSession>> {
        self.sessions.clone()
    }
}
