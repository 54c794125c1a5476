#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::future::{BoxFuture, FutureExt};
use lessonloader_core::registry::{loader_fn, LoaderFn};
use lessonloader_core::{ContentSource, ContentUnit, LoadProgress, RawModule};
use parking_lot::Mutex;
use serde_json::json;

/// In-memory `ContentSource` with call counters.
#[derive(Default)]
pub struct MockSource {
    manifests: Mutex<HashMap<String, Vec<String>>>,
    bulk: Mutex<HashMap<String, Vec<ContentUnit>>>,
    pub manifest_calls: AtomicUsize,
    pub bulk_calls: AtomicUsize,
    pub manifest_delay: Mutex<Option<Duration>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_manifest(self, collection_id: &str, ids: &[&str]) -> Self {
        self.manifests.lock().insert(
            collection_id.to_string(),
            ids.iter().map(|id| id.to_string()).collect(),
        );
        self
    }

    pub fn with_bulk(self, collection_id: &str, units: Vec<ContentUnit>) -> Self {
        self.bulk.lock().insert(collection_id.to_string(), units);
        self
    }

    pub fn with_manifest_delay(self, delay: Duration) -> Self {
        *self.manifest_delay.lock() = Some(delay);
        self
    }

    pub fn manifest_calls(&self) -> usize {
        self.manifest_calls.load(Ordering::SeqCst)
    }

    pub fn bulk_calls(&self) -> usize {
        self.bulk_calls.load(Ordering::SeqCst)
    }
}

impl ContentSource for MockSource {
    fn fetch_manifest<'a>(&'a self, collection_id: &'a str) -> BoxFuture<'a, Result<Vec<String>>> {
        async move {
            self.manifest_calls.fetch_add(1, Ordering::SeqCst);
            let delay = *self.manifest_delay.lock();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            match self.manifests.lock().get(collection_id) {
                Some(ids) => Ok(ids.clone()),
                None => anyhow::bail!("no manifest for {}", collection_id),
            }
        }
        .boxed()
    }

    fn fetch_bulk_collection<'a>(&'a self, collection_id: &'a str) -> BoxFuture<'a, Result<Vec<ContentUnit>>> {
        async move {
            self.bulk_calls.fetch_add(1, Ordering::SeqCst);
            match self.bulk.lock().get(collection_id) {
                Some(units) => Ok(units.clone()),
                None => anyhow::bail!("bulk endpoint unavailable"),
            }
        }
        .boxed()
    }
}

/// Loader that counts invocations and resolves to `{"title": title}` after `delay`.
pub fn counting_loader(title: &str, delay: Duration, calls: Arc<AtomicUsize>) -> LoaderFn {
    let title = title.to_string();
    loader_fn(move || {
        let title = title.clone();
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            Ok(RawModule::new().with_export("default", json!({ "title": title })))
        }
    })
}

/// Loader whose module payload carries an explicit `order`.
pub fn ordered_loader(title: &str, order: i64) -> LoaderFn {
    let title = title.to_string();
    loader_fn(move || {
        let title = title.clone();
        async move { Ok(RawModule::new().with_export("default", json!({ "title": title, "order": order }))) }
    })
}

/// Loader that always fails, counting attempts.
pub fn failing_loader(calls: Arc<AtomicUsize>) -> LoaderFn {
    loader_fn(move || {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("module import failed")
        }
    })
}

/// Loader that fails its first `failures` invocations, then succeeds.
pub fn flaky_loader(title: &str, failures: usize, calls: Arc<AtomicUsize>) -> LoaderFn {
    let title = title.to_string();
    loader_fn(move || {
        let title = title.clone();
        let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            if attempt <= failures {
                anyhow::bail!("transient import failure {}", attempt);
            }
            Ok(RawModule::new().with_export("default", json!({ "title": title })))
        }
    })
}

pub fn unit(id: &str, collection_id: &str, order: i64) -> ContentUnit {
    ContentUnit {
        id: id.to_string(),
        collection_id: collection_id.to_string(),
        order,
        payload: json!({ "title": id }),
        is_fallback: false,
    }
}

/// Progress callback that records every snapshot it receives.
pub fn recorder() -> (
    Arc<dyn Fn(&LoadProgress) + Send + Sync>,
    Arc<Mutex<Vec<LoadProgress>>>,
) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let callback: Arc<dyn Fn(&LoadProgress) + Send + Sync> =
        Arc::new(move |progress: &LoadProgress| sink.lock().push(progress.clone()));
    (callback, seen)
}
