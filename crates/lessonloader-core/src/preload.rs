//! Fire-and-forget warming of likely-next content.

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::coordinator::ContentLoader;
use crate::ids::ContentId;

impl ContentLoader {
    /// Best guess at the unit a reader opens after `current_id`: the next
    /// ordinal in the same collection, else the first unit of the next
    /// collection. Only registered IDs are returned.
    pub fn next_candidate(&self, current_id: &str) -> Option<String> {
        let parsed = ContentId::parse(current_id);
        let registry = self.registry();

        parsed
            .successor()
            .filter(|id| registry.is_known(id))
            .or_else(|| parsed.first_of_next_collection().filter(|id| registry.is_known(id)))
    }

    /// Start loading the unit after `current_id` in the background and return
    /// its ID. Returns `None` when there is no known next unit or no Tokio
    /// runtime to run the load on.
    pub fn preload_next(&self, current_id: &str) -> Option<String> {
        let next = self.next_candidate(current_id)?;
        if self.cached_unit(&next).is_some() {
            debug!(current = current_id, next = %next, "Next unit already cached");
            return Some(next);
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!(current = current_id, "No runtime, skipping preload");
            return None;
        };

        let loader = self.clone();
        let id = next.clone();
        runtime.spawn(async move {
            let unit = loader.load_one(&id).await;
            debug!(id = %id, fallback = unit.is_fallback, "Preloaded next unit");
        });
        Some(next)
    }

    /// Start background loads for `ids`. Returns how many were started;
    /// already-cached IDs are skipped.
    pub fn preload<I, S>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("No runtime, skipping preload");
            return 0;
        };

        let mut started = 0;
        for id in ids {
            let id = id.into();
            if self.cached_unit(&id).is_some() {
                continue;
            }
            let loader = self.clone();
            runtime.spawn(async move {
                loader.load_one(&id).await;
            });
            started += 1;
        }
        debug!(started = started, "Preload started");
        started
    }

    /// Load whole collections one after another in the background, e.g. the
    /// first few modules at startup. Failures are logged and skipped.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn warm_collections(&self, collection_ids: Vec<String>) -> JoinHandle<()> {
        let loader = self.clone();
        tokio::spawn(async move {
            for collection_id in collection_ids {
                match loader.load_collection(&collection_id, None).await {
                    Ok(units) => debug!(collection = %collection_id, count = units.len(), "Warmed collection"),
                    Err(e) => warn!(collection = %collection_id, error = %e, "Failed to warm collection"),
                }
            }
        })
    }
}
