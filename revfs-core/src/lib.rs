//! Content-resolution engine for revfs.
//!
//! Maps virtual review URIs ("file `path` as of `commit` in the checkout
//! at `rootPath`") onto file content through an ordered chain of sources:
//! a session's cached base content, the version-control backend, then a
//! registered fallback. The engine is backend-agnostic; the `revfs`
//! binary plugs a git2-backed implementation into the seams declared in
//! [`backend`], and tests plug in in-memory fakes.
//!
//! Resolution is total: [`resolver::ContentResolver::resolve`] always
//! returns a buffer, empty when nothing resolves, and raises at most one
//! user notification per call through [`notify::Notifier`].

pub mod backend;
pub mod locator;
pub mod notify;
pub mod resolver;
pub mod session;
pub mod uri;
