//! Review URIs and their JSON query payload.
//!
//! A review URI is a virtual identifier: it names "file `path` as of
//! `commit` inside the checkout rooted at `rootPath`", never a file that
//! exists on disk under that name. The authority and path components
//! identify the logical file within a review (change lookups match on
//! exactly these two), while the query string carries the JSON payload the
//! resolver decodes. All types here are fully owned so identifiers can be
//! stored in session models and sent across tasks.

use std::borrow::Cow;
use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scheme of the textual form, as in `review://pr-42/src/lib.rs?{...}`.
pub const SCHEME: &str = "review";

/// Bytes escaped in the textual form's path: `%` because it introduces an
/// escape sequence, `?` because it would start the query early.
const PATH_ESCAPES: &AsciiSet = &CONTROLS.add(b'%').add(b'?');

/// The authority additionally cannot carry a raw `/`, which ends it.
const AUTHORITY_ESCAPES: &AsciiSet = &PATH_ESCAPES.add(b'/');

/// Errors from parsing the textual form of a review URI.
#[derive(Debug, Error)]
pub enum UriError {
    /// The input does not start with `review://`.
    #[error("not a review:// identifier: {0}")]
    Scheme(String),
    /// The input has a scheme but no authority component.
    #[error("missing authority in review identifier: {0}")]
    Authority(String),
}

/// Decoded query payload of a review URI.
///
/// The wire form is a JSON object with keys `path`, `commit` and
/// `rootPath`, any subset of which may be present. Missing keys decode to
/// `None` rather than failing: a partial payload is a valid identifier
/// that simply cannot produce content. `path` is repository-relative;
/// `rootPath` is the absolute root of the local checkout, when known.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewQuery {
    /// Repository-relative path of the file, duplicated from the URI path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Revision the content is pinned to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    /// Absolute root of the local checkout.
    #[serde(default, rename = "rootPath", skip_serializing_if = "Option::is_none")]
    pub root_path: Option<String>,
}

impl ReviewQuery {
    /// Builds a fully populated payload.
    pub fn new(
        path: impl Into<String>,
        commit: impl Into<String>,
        root_path: impl Into<String>,
    ) -> Self {
        Self {
            path: Some(path.into()),
            commit: Some(commit.into()),
            root_path: Some(root_path.into()),
        }
    }

    /// Serializes the payload to its JSON wire form.
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parses a JSON wire payload. Returns `None` when the input is not a
    /// JSON object; missing keys are tolerated and surface as `None` fields.
    pub fn decode(query: &str) -> Option<Self> {
        serde_json::from_str(query).ok()
    }
}

/// A virtual file identifier.
///
/// Nothing here validates that `query` decodes; that happens when the
/// resolver asks, so that an identifier with a malformed payload can still
/// be stored, displayed and compared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReviewUri {
    /// Review the file belongs to, e.g. `pr-42`.
    pub authority: String,
    /// File path within the review, always with a leading `/`.
    pub path: String,
    /// Raw query string, normally an encoded [`ReviewQuery`].
    pub query: String,
}

impl ReviewUri {
    /// Builds an identifier from components, encoding the payload.
    ///
    /// The path is normalized to carry a leading `/` so that lookups by
    /// authority and path behave the same whether the identifier came from
    /// [`ReviewUri::parse`] or from a session model.
    pub fn new(authority: impl Into<String>, path: impl Into<String>, query: &ReviewQuery) -> Self {
        Self {
            authority: authority.into(),
            path: normalize_path(path.into()),
            query: query.encode(),
        }
    }

    /// Parses the textual `review://authority/path?query` form.
    ///
    /// Percent-escapes in the authority and path are decoded; the query is
    /// taken verbatim from the first unescaped `?` to the end of the input.
    ///
    /// # Errors
    ///
    /// Returns [`UriError::Scheme`] when the input does not start with
    /// `review://`, and [`UriError::Authority`] when the authority
    /// component is empty.
    pub fn parse(input: &str) -> Result<Self, UriError> {
        let rest = input
            .strip_prefix(SCHEME)
            .and_then(|rest| rest.strip_prefix("://"))
            .ok_or_else(|| UriError::Scheme(input.to_owned()))?;

        let (location, query) = match rest.split_once('?') {
            Some((location, query)) => (location, query),
            None => (rest, ""),
        };
        let (authority, path) = match location.split_once('/') {
            Some((authority, path)) => (authority, format!("/{}", unescape(path))),
            None => (location, String::from("/")),
        };
        if authority.is_empty() {
            return Err(UriError::Authority(input.to_owned()));
        }

        Ok(Self {
            authority: unescape(authority).into_owned(),
            path,
            query: query.to_owned(),
        })
    }

    /// Decodes the query payload, if it is well-formed JSON.
    pub fn decode_query(&self) -> Option<ReviewQuery> {
        ReviewQuery::decode(&self.query)
    }
}

impl fmt::Display for ReviewUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{SCHEME}://{}{}",
            utf8_percent_encode(&self.authority, AUTHORITY_ESCAPES),
            utf8_percent_encode(&self.path, PATH_ESCAPES)
        )?;
        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }
        Ok(())
    }
}

fn normalize_path(path: String) -> String {
    if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    }
}

fn unescape(component: &str) -> Cow<'_, str> {
    percent_decode_str(component).decode_utf8_lossy()
}
