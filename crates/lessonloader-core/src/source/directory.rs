//! On-disk collaborator: `<root>/<collection>/manifest.json` plus one JSON
//! module file per unit.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, warn};

use super::{ContentSource, ManifestDocument};
use crate::models::ContentUnit;
use crate::normalize::normalize_payload;
use crate::registry::{export_candidates, read_module, DEFAULT_EXPORT_KEYS, MANIFEST_FILE};

#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_dir(&self, collection_id: &str) -> PathBuf {
        self.root.join(collection_id)
    }

    pub async fn manifest(&self, collection_id: &str) -> Result<Vec<String>> {
        let path = self.collection_dir(collection_id).join(MANIFEST_FILE);
        let contents = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        let document: ManifestDocument = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse manifest: {}", path.display()))?;
        Ok(document.into_ids())
    }

    /// Read every unit file in the collection directory. Unreadable files are
    /// skipped with a warning; a missing directory is an error.
    pub async fn bulk_collection(&self, collection_id: &str) -> Result<Vec<ContentUnit>> {
        let dir = self.collection_dir(collection_id);
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .with_context(|| format!("Failed to read collection directory: {}", dir.display()))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_json = path.extension().is_some_and(|ext| ext == "json");
            let is_manifest = path.file_name().is_some_and(|name| name == MANIFEST_FILE);
            if is_json && !is_manifest {
                paths.push(path);
            }
        }
        paths.sort();

        let mut units = Vec::with_capacity(paths.len());
        for path in paths {
            let Some(id) = path.file_stem().map(|stem| stem.to_string_lossy().into_owned()) else {
                continue;
            };
            match read_module(&path).await {
                Ok(module) => {
                    let Some(payload) =
                        module.into_extracted(&export_candidates(&DEFAULT_EXPORT_KEYS, &id))
                    else {
                        warn!(id = %id, "Module file has no exports");
                        continue;
                    };
                    units.push(ContentUnit::from_payload(
                        &id,
                        collection_id,
                        normalize_payload(payload),
                    ));
                }
                Err(e) => warn!(id = %id, error = %e, "Skipping unreadable unit file"),
            }
        }

        debug!(collection = collection_id, count = units.len(), "Read collection from disk");
        Ok(units)
    }
}

impl ContentSource for DirectorySource {
    fn fetch_manifest<'a>(&'a self, collection_id: &'a str) -> BoxFuture<'a, Result<Vec<String>>> {
        self.manifest(collection_id).boxed()
    }

    fn fetch_bulk_collection<'a>(
        &'a self,
        collection_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ContentUnit>>> {
        self.bulk_collection(collection_id).boxed()
    }
}
