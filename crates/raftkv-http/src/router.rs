use std::borrow::Cow;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler::{dispatch, AppState};

/// HTTP endpoint paths served by the front door.
pub mod endpoints {
    /// Prefix for key access. Matched as a plain string prefix, so `/key`,
    /// `/key/name` and `/keyfoo` all land on the key handler.
    pub const KEY: &str = "/key";
    pub const JOIN: &str = "/join";
    pub const STATUS: &str = "/status";
}

/// Handler selected for a request path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Key,
    Join,
    Status,
    NotFound,
}

impl Route {
    /// Resolve a URL path. The key prefix is checked before the exact matches.
    pub fn resolve(path: &str) -> Self {
        if path.starts_with(endpoints::KEY) {
            Self::Key
        } else if path == endpoints::JOIN {
            Self::Join
        } else if path == endpoints::STATUS {
            Self::Status
        } else {
            Self::NotFound
        }
    }
}

/// Extract the key name from a `/key/<name>` path.
///
/// The path must split on `/` into exactly `["", "key", name]`; any other
/// shape yields the empty string, meaning no key was supplied.
pub fn key_from_path(path: &str) -> &str {
    let mut parts = path.split('/');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(_), Some(key), None) => key,
        _ => "",
    }
}

/// Percent-decode a request path.
///
/// Returns the decoded path and whether it was valid UTF-8. An invalid path is
/// still returned, lossily decoded, so it can be routed.
pub fn decode_path(raw: &str) -> (Cow<'_, str>, bool) {
    match urlencoding::decode(raw) {
        Ok(path) => (path, true),
        Err(_) => {
            let bytes = urlencoding::decode_binary(raw.as_bytes());
            (Cow::Owned(String::from_utf8_lossy(&bytes).into_owned()), false)
        }
    }
}

/// Build the axum router. Every request goes through [`dispatch`], which
/// applies the route table above. Request bodies are unbounded.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .fallback(dispatch)
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
}
