//! The load coordinator.
//!
//! `ContentLoader` owns the caches and in-flight tables. Every unit load runs
//! in its own Tokio task whose output is shared between callers, so a load
//! started by one caller finishes even if that caller goes away.

mod collection;
pub mod progress;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::cache::{Clock, CollectionCache, SystemClock, UnitCache};
use crate::config::LoaderConfig;
use crate::error::LoadResult;
use crate::fallback::generate_fallback;
use crate::models::{ContentUnit, LoadProgress};
use crate::normalize::normalize_payload;
use crate::registry::{ContentRegistry, RegistryEntry};
use crate::retry::RetryPolicy;
use crate::source::ContentSource;

pub use progress::{ProgressCallback, ProgressHub, Subscription};

type PendingUnit = Shared<BoxFuture<'static, ContentUnit>>;
type PendingCollection = Shared<BoxFuture<'static, LoadResult<Vec<ContentUnit>>>>;

/// Snapshot of cache and in-flight sizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderStats {
    pub cached_units: usize,
    pub cached_collections: usize,
    pub units_in_flight: usize,
    pub collections_in_flight: usize,
    pub known_ids: usize,
}

struct Inner {
    registry: ContentRegistry,
    source: Arc<dyn ContentSource>,
    config: LoaderConfig,
    retry: RetryPolicy,
    units: UnitCache,
    collections: CollectionCache,
    units_in_flight: Mutex<HashMap<String, PendingUnit>>,
    collections_in_flight: Mutex<HashMap<String, PendingCollection>>,
    progress: ProgressHub,
}

/// Cheap to clone; clones share caches and in-flight state.
#[derive(Clone)]
pub struct ContentLoader {
    inner: Arc<Inner>,
}

pub struct ContentLoaderBuilder {
    registry: ContentRegistry,
    source: Arc<dyn ContentSource>,
    config: LoaderConfig,
    clock: Arc<dyn Clock>,
}

impl ContentLoaderBuilder {
    pub fn config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Clock used for cache ages. Tests pass a `ManualClock`.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> ContentLoader {
        let ttl = self.config.ttl();
        let schema = self.config.schema_version.clone();

        ContentLoader {
            inner: Arc::new(Inner {
                retry: RetryPolicy::from_config(&self.config),
                units: UnitCache::with_clock(ttl, schema.clone(), Arc::clone(&self.clock)),
                collections: CollectionCache::with_clock(ttl, schema, self.clock),
                registry: self.registry,
                source: self.source,
                config: self.config,
                units_in_flight: Mutex::new(HashMap::new()),
                collections_in_flight: Mutex::new(HashMap::new()),
                progress: ProgressHub::new(),
            }),
        }
    }
}

impl ContentLoader {
    pub fn builder(registry: ContentRegistry, source: impl ContentSource + 'static) -> ContentLoaderBuilder {
        Self::builder_with_source(registry, Arc::new(source))
    }

    pub fn builder_with_source(registry: ContentRegistry, source: Arc<dyn ContentSource>) -> ContentLoaderBuilder {
        ContentLoaderBuilder {
            registry,
            source,
            config: LoaderConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn new(registry: ContentRegistry, source: impl ContentSource + 'static) -> Self {
        Self::builder(registry, source).build()
    }

    pub fn registry(&self) -> &ContentRegistry {
        &self.inner.registry
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.inner.config
    }

    /// Load one unit. Never fails: unknown ids and loads that exhaust their
    /// retries resolve to a fallback unit.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn load_one(&self, id: &str) -> ContentUnit {
        if let Some(unit) = self.inner.units.get(id) {
            debug!(id = id, "Unit cache hit");
            return unit;
        }

        let pending = {
            let mut in_flight = self.inner.units_in_flight.lock();
            match in_flight.get(id) {
                Some(pending) => {
                    debug!(id = id, "Joining in-flight unit load");
                    pending.clone()
                }
                None => {
                    // A load may have finished between the cache check and the lock
                    if let Some(unit) = self.inner.units.get(id) {
                        return unit;
                    }
                    let Some(entry) = self.inner.registry.resolve_loader(id) else {
                        debug!(id = id, "Unknown id, using fallback");
                        return generate_fallback(id);
                    };
                    let pending = self.spawn_unit_load(id.to_string(), entry);
                    in_flight.insert(id.to_string(), pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    fn spawn_unit_load(&self, id: String, entry: RegistryEntry) -> PendingUnit {
        let loader = self.clone();
        let task_id = id.clone();
        let handle = tokio::spawn(async move { loader.load_and_store(&task_id, entry).await });

        let inner = Arc::clone(&self.inner);
        async move {
            match handle.await {
                Ok(unit) => unit,
                Err(e) => {
                    error!(id = %id, error = %e, "Unit load task aborted");
                    inner.units_in_flight.lock().remove(&id);
                    generate_fallback(&id)
                }
            }
        }
        .boxed()
        .shared()
    }

    async fn load_and_store(&self, id: &str, entry: RegistryEntry) -> ContentUnit {
        let started = Instant::now();
        let loader = Arc::clone(&entry.loader);

        let result = self
            .inner
            .retry
            .run(id, || loader())
            .await
            .and_then(|module| self.inner.registry.extract_payload(id, module));

        let unit = match result {
            Ok(payload) => {
                let unit = ContentUnit::from_payload(id, &entry.collection_id, normalize_payload(payload));
                self.inner.units.put(id, unit.clone());
                debug!(
                    id = id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Unit loaded"
                );
                unit
            }
            Err(e) => {
                warn!(id = id, error = %e, "Unit load failed, using fallback");
                let mut unit = generate_fallback(id);
                unit.collection_id = entry.collection_id.clone();
                unit
            }
        };

        self.inner.units_in_flight.lock().remove(id);
        unit
    }

    /// Cached unit, if present and still valid. Never triggers a load.
    pub fn cached_unit(&self, id: &str) -> Option<ContentUnit> {
        self.inner.units.get(id)
    }

    /// Human readable age of a cached unit.
    pub fn unit_age(&self, id: &str) -> Option<String> {
        self.inner.units.age_display(id)
    }

    /// Register a progress callback for `collection_id`. If a load of that
    /// collection is in flight, the current snapshot is delivered at once.
    pub fn subscribe<F>(&self, collection_id: &str, callback: F) -> Subscription
    where
        F: Fn(&LoadProgress) + Send + Sync + 'static,
    {
        self.inner.progress.subscribe(collection_id, Arc::new(callback))
    }

    /// Latest progress snapshot for a collection.
    pub fn progress(&self, collection_id: &str) -> Option<LoadProgress> {
        self.inner.progress.current(collection_id)
    }

    /// Drop cached content for one collection (its collection entry and every
    /// cached unit belonging to it) or, with `None`, everything.
    ///
    /// In-flight loads are not cancelled; they repopulate the cache when they
    /// finish.
    pub fn clear_cache(&self, collection_id: Option<&str>) {
        match collection_id {
            Some(collection) => {
                self.inner.collections.invalidate(collection);
                let units = self
                    .inner
                    .units
                    .invalidate_where(|_, unit| unit.collection_id == collection);
                self.inner.progress.clear(Some(collection));
                info!(collection = collection, units = units, "Cleared collection cache");
            }
            None => {
                self.inner.units.invalidate_all();
                self.inner.collections.invalidate_all();
                self.inner.progress.clear(None);
                info!("Cleared all caches");
            }
        }
    }

    /// Remove expired or schema-stale entries from both caches.
    pub fn purge_expired(&self) -> usize {
        let removed = self.inner.units.purge_expired() + self.inner.collections.purge_expired();
        if removed > 0 {
            debug!(removed = removed, "Purged expired cache entries");
        }
        removed
    }

    pub fn stats(&self) -> LoaderStats {
        LoaderStats {
            cached_units: self.inner.units.len(),
            cached_collections: self.inner.collections.len(),
            units_in_flight: self.inner.units_in_flight.lock().len(),
            collections_in_flight: self.inner.collections_in_flight.lock().len(),
            known_ids: self.inner.registry.len(),
        }
    }
}

impl std::fmt::Debug for ContentLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentLoader")
            .field("stats", &self.stats())
            .finish()
    }
}
