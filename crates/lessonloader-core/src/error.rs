//! Error types for the loading layer.
//!
//! Item-level failures never reach `load_one` callers; they are folded into
//! fallback units. Only a collection that cannot produce any unit surfaces
//! a `LoadError`.

use std::time::Duration;

use thiserror::Error;

/// Errors produced while loading units or collections.
///
/// `Clone` because a single coalesced result is handed to every waiting caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Loader failed: {0}")]
    Loader(String),

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("Module for {0} has no exports")]
    EmptyModule(String),

    #[error("Collection {collection} failed to load: {reason}")]
    CollectionFailed { collection: String, reason: String },

    #[error("Collection {collection} did not finish within {timeout:?}")]
    CollectionTimeout { collection: String, timeout: Duration },

    #[error("Background load for {0} was aborted")]
    TaskAborted(String),
}

pub type LoadResult<T> = Result<T, LoadError>;

/// Longest response body excerpt kept in an error message, in bytes
const BODY_EXCERPT_BYTES: usize = 500;

/// Failures talking to the remote content service.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("{url}: credentials rejected (HTTP {status})")]
    Unauthorized { url: String, status: u16 },

    #[error("{url}: not found")]
    NotFound { url: String },

    #[error("{url}: rate limited")]
    RateLimited { url: String },

    #[error("{url}: HTTP {status}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error(transparent)]
    Network(#[from] reqwest::Error),
}

impl SourceError {
    /// Classify a non-success response for `url`.
    pub fn from_response(url: &str, status: reqwest::StatusCode, body: &str) -> Self {
        let url = url.to_string();
        match status.as_u16() {
            401 | 403 => SourceError::Unauthorized {
                url,
                status: status.as_u16(),
            },
            404 => SourceError::NotFound { url },
            429 => SourceError::RateLimited { url },
            code => SourceError::Status {
                url,
                status: code,
                body: body_excerpt(body),
            },
        }
    }

    /// Worth retrying after a pause.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SourceError::RateLimited { .. })
    }
}

fn body_excerpt(body: &str) -> String {
    let body = body.trim();
    if body.len() <= BODY_EXCERPT_BYTES {
        return body.to_string();
    }
    let mut cut = BODY_EXCERPT_BYTES;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{} [{} more bytes]", &body[..cut], body.len() - cut)
}
