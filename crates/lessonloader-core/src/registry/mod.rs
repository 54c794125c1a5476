//! Content registry: the static map from unit ID to loader.
//!
//! The registry is built once through `RegistryBuilder` and is immutable
//! afterwards. Unknown IDs resolve to `None`, which callers treat as
//! "unavailable, use a fallback" rather than as an error.

pub mod loaders;
pub mod module;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::debug;

use crate::error::{LoadError, LoadResult};
use crate::ids::{self, ContentId, ORDINAL_MARKER};

pub use loaders::{file_loader, http_loader, loader_fn, read_module, static_loader};
pub use module::RawModule;

/// Produces the raw module for one unit.
pub type LoaderFn = Arc<dyn Fn() -> BoxFuture<'static, Result<RawModule>> + Send + Sync>;

/// Export names tried in order when pulling the payload out of a module.
/// `{n}` is replaced with the unit's ordinal.
pub const DEFAULT_EXPORT_KEYS: [&str; 3] = ["default", "lesson{n}", "lesson"];

/// File name reserved for collection manifests in content directories.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Expand export-key templates for `id`. Templates needing an ordinal are
/// dropped when the ID has none.
pub fn export_candidates<S: AsRef<str>>(keys: &[S], id: &str) -> Vec<String> {
    let ordinal = ContentId::parse(id).ordinal();
    keys.iter()
        .map(AsRef::as_ref)
        .filter_map(|key| match (key.contains("{n}"), ordinal) {
            (false, _) => Some(key.to_string()),
            (true, Some(n)) => Some(key.replace("{n}", &n.to_string())),
            (true, None) => None,
        })
        .collect()
}

#[derive(Clone)]
pub struct RegistryEntry {
    pub collection_id: String,
    pub loader: LoaderFn,
}

impl std::fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("collection_id", &self.collection_id)
            .finish_non_exhaustive()
    }
}

pub struct ContentRegistry {
    entries: HashMap<String, RegistryEntry>,
    export_keys: Vec<String>,
}

impl ContentRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn resolve_loader(&self, id: &str) -> Option<RegistryEntry> {
        self.entries.get(id).cloned()
    }

    pub fn is_known(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// All registered IDs, sorted.
    pub fn list_known_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Registered IDs belonging to `collection_id`, sorted by ordinal.
    pub fn ids_in_collection(&self, collection_id: &str) -> Vec<String> {
        let mut ids: Vec<&String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.collection_id == collection_id)
            .map(|(id, _)| id)
            .collect();
        ids.sort_by_key(|&id| (ContentId::parse(id).order(), id.as_str()));
        ids.into_iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Export names to try for `id`, with `{n}` substituted.
    pub fn export_candidates(&self, id: &str) -> Vec<String> {
        export_candidates(&self.export_keys, id)
    }

    /// Pull the payload for `id` out of a loaded module.
    pub fn extract_payload(&self, id: &str, module: RawModule) -> LoadResult<Value> {
        module
            .into_extracted(&self.export_candidates(id))
            .ok_or_else(|| LoadError::EmptyModule(id.to_string()))
    }
}

pub struct RegistryBuilder {
    entries: HashMap<String, RegistryEntry>,
    export_keys: Vec<String>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            export_keys: DEFAULT_EXPORT_KEYS.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Register `id`, deriving its collection from the naming convention.
    pub fn register(self, id: impl Into<String>, loader: LoaderFn) -> Self {
        let id = id.into();
        let collection = ids::collection_of(&id).to_string();
        self.register_in(collection, id, loader)
    }

    pub fn register_in(
        mut self,
        collection_id: impl Into<String>,
        id: impl Into<String>,
        loader: LoaderFn,
    ) -> Self {
        self.entries.insert(
            id.into(),
            RegistryEntry {
                collection_id: collection_id.into(),
                loader,
            },
        );
        self
    }

    /// Register `{collection}-lesson-{n}` for each ordinal.
    ///
    /// The factory returns `None` for ordinals that intentionally have no
    /// content; those IDs stay unknown.
    pub fn register_range<I, F>(mut self, collection_id: &str, ordinals: I, factory: F) -> Self
    where
        I: IntoIterator<Item = u32>,
        F: Fn(&str, u32) -> Option<LoaderFn>,
    {
        for ordinal in ordinals {
            let id = format!("{}{}{}", collection_id, ORDINAL_MARKER, ordinal);
            if let Some(loader) = factory(&id, ordinal) {
                self = self.register_in(collection_id, id, loader);
            }
        }
        self
    }

    /// Replace the export names tried during extraction.
    pub fn export_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.export_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Register every `<root>/<collection>/<id>.json` as a file-backed unit.
    ///
    /// `manifest.json` files are skipped. Runs once at startup, so plain
    /// blocking IO is used.
    pub fn scan_directory(mut self, root: &Path) -> Result<Self> {
        let collections = std::fs::read_dir(root)
            .with_context(|| format!("Failed to read content directory: {}", root.display()))?;

        for collection in collections {
            let collection = collection?;
            if !collection.file_type()?.is_dir() {
                continue;
            }
            let collection_id = collection.file_name().to_string_lossy().into_owned();

            for file in std::fs::read_dir(collection.path())? {
                let path = file?.path();
                let is_json = path.extension().is_some_and(|ext| ext == "json");
                let is_manifest = path.file_name().is_some_and(|name| name == MANIFEST_FILE);
                if !is_json || is_manifest {
                    continue;
                }
                let Some(id) = path.file_stem().map(|stem| stem.to_string_lossy().into_owned())
                else {
                    continue;
                };
                self = self.register_in(collection_id.clone(), id, file_loader(path));
            }
        }

        debug!(count = self.entries.len(), root = %root.display(), "Scanned content directory");
        Ok(self)
    }

    pub fn build(self) -> ContentRegistry {
        ContentRegistry {
            entries: self.entries,
            export_keys: self.export_keys,
        }
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
