use std::collections::HashSet;
use std::sync::Arc;

use futures::future::{join_all, FutureExt};
use tracing::{debug, error, info, warn};

use super::{ContentLoader, PendingCollection, ProgressCallback};
use crate::error::{LoadError, LoadResult};
use crate::models::{ContentUnit, LoadProgress};
use crate::normalize::normalize_payload;

const BULK_LABEL: &str = "Loading full collection";

impl ContentLoader {
    /// Load every unit of a collection, ordered by `order`.
    ///
    /// A result containing fallback units is returned but not cached, so the
    /// next call retries the units that failed. Concurrent calls for the same
    /// collection share one pipeline. The optional callback is subscribed for
    /// the duration of this call only.
    /// If the call outlives `collection_timeout` it returns
    /// `LoadError::CollectionTimeout`, but the pipeline keeps running and
    /// still fills the cache.
    pub async fn load_collection(
        &self,
        collection_id: &str,
        on_progress: Option<ProgressCallback>,
    ) -> LoadResult<Vec<ContentUnit>> {
        if let Some(units) = self.inner.collections.get(collection_id) {
            debug!(collection = collection_id, "Collection cache hit");
            return Ok(units);
        }

        let _subscription = on_progress.map(|callback| self.inner.progress.subscribe(collection_id, callback));

        let pending = {
            let mut in_flight = self.inner.collections_in_flight.lock();
            match in_flight.get(collection_id) {
                Some(pending) => {
                    debug!(collection = collection_id, "Joining in-flight collection load");
                    pending.clone()
                }
                None => {
                    if let Some(units) = self.inner.collections.get(collection_id) {
                        return Ok(units);
                    }
                    let pending = self.spawn_collection_load(collection_id.to_string());
                    in_flight.insert(collection_id.to_string(), pending.clone());
                    pending
                }
            }
        };

        let timeout = self.inner.config.collection_timeout();
        match tokio::time::timeout(timeout, pending).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    collection = collection_id,
                    timeout_ms = timeout.as_millis() as u64,
                    "Collection load exceeded caller timeout, continuing in background"
                );
                Err(LoadError::CollectionTimeout {
                    collection: collection_id.to_string(),
                    timeout,
                })
            }
        }
    }

    fn spawn_collection_load(&self, collection_id: String) -> PendingCollection {
        let loader = self.clone();
        let task_collection = collection_id.clone();
        let handle = tokio::spawn(async move { loader.run_collection_load(&task_collection).await });

        let inner = Arc::clone(&self.inner);
        async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => {
                    error!(collection = %collection_id, error = %e, "Collection load task aborted");
                    inner.collections_in_flight.lock().remove(&collection_id);
                    inner
                        .progress
                        .publish(&collection_id, LoadProgress::failed(e.to_string()));
                    Err(LoadError::TaskAborted(collection_id))
                }
            }
        }
        .boxed()
        .shared()
    }

    async fn run_collection_load(&self, collection_id: &str) -> LoadResult<Vec<ContentUnit>> {
        info!(collection = collection_id, "Starting collection load");
        self.inner.progress.publish(collection_id, LoadProgress::preparing());

        let result = match self.manifest_ids(collection_id).await {
            Ok(ids) => Ok(self.load_batches(collection_id, &ids).await),
            Err(manifest_problem) => self.load_bulk(collection_id, &manifest_problem).await,
        };

        match &result {
            Ok(units) => {
                let fallbacks = units.iter().filter(|unit| unit.is_fallback).count();
                // Placeholders must not outlive the failure that produced them
                if fallbacks == 0 {
                    self.inner.collections.put(collection_id, units.clone());
                } else {
                    debug!(
                        collection = collection_id,
                        fallbacks = fallbacks,
                        "Collection has placeholder units, not caching"
                    );
                }
                self.inner
                    .progress
                    .publish(collection_id, LoadProgress::complete(units.len(), units.len()));
                info!(
                    collection = collection_id,
                    count = units.len(),
                    fallbacks = fallbacks,
                    "Collection loaded"
                );
            }
            Err(e) => {
                error!(collection = collection_id, error = %e, "Collection load failed");
                self.inner
                    .progress
                    .publish(collection_id, LoadProgress::failed(e.to_string()));
            }
        }

        self.inner.collections_in_flight.lock().remove(collection_id);
        result
    }

    /// Manifest IDs with blanks and duplicates removed, or a description of
    /// why the manifest cannot be used.
    async fn manifest_ids(&self, collection_id: &str) -> Result<Vec<String>, String> {
        let timeout = self.inner.config.manifest_timeout();
        let ids = match tokio::time::timeout(timeout, self.inner.source.fetch_manifest(collection_id)).await {
            Ok(Ok(ids)) => ids,
            Ok(Err(e)) => {
                warn!(collection = collection_id, error = %e, "Manifest fetch failed");
                return Err(format!("manifest fetch failed: {:#}", e));
            }
            Err(_) => {
                warn!(
                    collection = collection_id,
                    timeout_ms = timeout.as_millis() as u64,
                    "Manifest fetch timed out"
                );
                return Err(format!("manifest fetch timed out after {}ms", timeout.as_millis()));
            }
        };

        let ids = dedupe_ids(ids);
        if ids.is_empty() {
            warn!(collection = collection_id, "Manifest is empty");
            return Err("manifest is empty".to_string());
        }
        Ok(ids)
    }

    async fn load_batches(&self, collection_id: &str, ids: &[String]) -> Vec<ContentUnit> {
        let total = ids.len();
        let batch_size = self.inner.config.batch_size();
        let batches = total.div_ceil(batch_size);
        let mut units = Vec::with_capacity(total);

        self.inner
            .progress
            .publish(collection_id, LoadProgress::loading(total, 0, None));

        for (index, batch) in ids.chunks(batch_size).enumerate() {
            debug!(
                collection = collection_id,
                batch = index + 1,
                batches = batches,
                "Loading batch"
            );

            let loaded = join_all(batch.iter().map(|id| self.load_one(id))).await;
            let label = loaded.last().map(|unit| unit.label().to_string());
            units.extend(loaded);

            self.inner
                .progress
                .publish(collection_id, LoadProgress::loading(total, units.len(), label));

            if index + 1 < batches {
                tokio::time::sleep(self.inner.config.batch_pause()).await;
            }
        }

        units.sort_by_key(|unit| unit.order);
        units
    }

    async fn load_bulk(&self, collection_id: &str, manifest_problem: &str) -> LoadResult<Vec<ContentUnit>> {
        info!(collection = collection_id, "Falling back to bulk collection load");
        self.inner.progress.publish(
            collection_id,
            LoadProgress::loading(0, 0, Some(BULK_LABEL.to_string())),
        );

        let timeout = self.inner.config.manifest_timeout();
        let fetched = tokio::time::timeout(timeout, self.inner.source.fetch_bulk_collection(collection_id)).await;

        let failed = |reason: String| LoadError::CollectionFailed {
            collection: collection_id.to_string(),
            reason: format!("{}; {}", manifest_problem, reason),
        };

        let units = match fetched {
            Ok(Ok(units)) if units.is_empty() => return Err(failed("bulk load returned no units".to_string())),
            Ok(Ok(units)) => units,
            Ok(Err(e)) => return Err(failed(format!("bulk load failed: {:#}", e))),
            Err(_) => {
                return Err(failed(format!("bulk load timed out after {}ms", timeout.as_millis())));
            }
        };

        let mut units: Vec<ContentUnit> = units
            .into_iter()
            .map(|mut unit| {
                if unit.collection_id.is_empty() {
                    unit.collection_id = collection_id.to_string();
                }
                unit.payload = normalize_payload(unit.payload);
                unit
            })
            .collect();
        units.sort_by_key(|unit| unit.order);

        for unit in units.iter().filter(|unit| !unit.is_fallback) {
            self.inner.units.put(&unit.id, unit.clone());
        }

        Ok(units)
    }
}

fn dedupe_ids(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_ids_keeps_first_occurrence() {
        let ids = vec!["b", "a", " ", "b", "c", "a"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(dedupe_ids(ids), vec!["b", "a", "c"]);
    }
}
