//! Collaborators that know which units make up a collection.
//!
//! The loader asks a `ContentSource` for the ordered ID manifest of a
//! collection and, when that is empty or unreachable, for the whole
//! collection in one bulk call.
//!
//! - `HttpContentSource`: a remote CMS / document store over HTTP
//! - `DirectorySource`: manifests and units laid out on disk

pub mod directory;
pub mod http;

use anyhow::Result;
use futures::future::BoxFuture;
use serde::Deserialize;

use crate::models::ContentUnit;

pub use directory::DirectorySource;
pub use http::HttpContentSource;

pub trait ContentSource: Send + Sync {
    /// IDs belonging to a collection. May be empty.
    fn fetch_manifest<'a>(&'a self, collection_id: &'a str) -> BoxFuture<'a, Result<Vec<String>>>;

    /// Every unit of a collection in one call; the degrade path when the
    /// manifest is unusable.
    fn fetch_bulk_collection<'a>(
        &'a self,
        collection_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ContentUnit>>>;
}

#[derive(Debug, Deserialize)]
struct ManifestItem {
    id: String,
}

/// Accepted manifest shapes: `["a", "b"]`, `{ "ids": [...] }`, or `[{ "id": "a" }, ...]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ManifestDocument {
    Ids(Vec<String>),
    Wrapped { ids: Vec<String> },
    Items(Vec<ManifestItem>),
}

impl ManifestDocument {
    pub(crate) fn into_ids(self) -> Vec<String> {
        match self {
            ManifestDocument::Ids(ids) | ManifestDocument::Wrapped { ids } => ids,
            ManifestDocument::Items(items) => items.into_iter().map(|item| item.id).collect(),
        }
    }
}
