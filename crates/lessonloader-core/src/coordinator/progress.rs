//! Progress snapshots and their subscribers.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::error;

use crate::models::LoadProgress;

pub type ProgressCallback = Arc<dyn Fn(&LoadProgress) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_token: u64,
    by_collection: HashMap<String, Vec<(u64, ProgressCallback)>>,
}

/// Latest snapshot per collection plus the callbacks watching it.
///
/// Callbacks are invoked outside of any lock, so they may call back into the
/// loader. A panicking callback is logged and skipped; it never affects the
/// load or the other subscribers.
#[derive(Default)]
pub struct ProgressHub {
    states: Mutex<HashMap<String, LoadProgress>>,
    listeners: Arc<Mutex<Listeners>>,
}

impl ProgressHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot for `collection_id` and notify its subscribers.
    pub fn publish(&self, collection_id: &str, progress: LoadProgress) {
        self.states
            .lock()
            .insert(collection_id.to_string(), progress.clone());

        let callbacks: Vec<ProgressCallback> = self
            .listeners
            .lock()
            .by_collection
            .get(collection_id)
            .map(|list| list.iter().map(|(_, callback)| Arc::clone(callback)).collect())
            .unwrap_or_default();

        for callback in callbacks {
            notify(collection_id, &callback, &progress);
        }
    }

    pub fn current(&self, collection_id: &str) -> Option<LoadProgress> {
        self.states.lock().get(collection_id).cloned()
    }

    /// Register `callback`. If a load is in flight, the current snapshot is
    /// replayed to it immediately.
    pub fn subscribe(&self, collection_id: &str, callback: ProgressCallback) -> Subscription {
        let token = {
            let mut listeners = self.listeners.lock();
            listeners.next_token += 1;
            let token = listeners.next_token;
            listeners
                .by_collection
                .entry(collection_id.to_string())
                .or_default()
                .push((token, Arc::clone(&callback)));
            token
        };

        if let Some(state) = self.current(collection_id).filter(LoadProgress::is_in_flight) {
            notify(collection_id, &callback, &state);
        }

        Subscription {
            listeners: Arc::downgrade(&self.listeners),
            collection_id: collection_id.to_string(),
            token,
        }
    }

    pub fn listener_count(&self, collection_id: &str) -> usize {
        self.listeners
            .lock()
            .by_collection
            .get(collection_id)
            .map_or(0, Vec::len)
    }

    /// Forget finished snapshots for one collection or for all of them.
    /// In-flight snapshots are kept; their loads are still running.
    pub fn clear(&self, collection_id: Option<&str>) {
        let mut states = self.states.lock();
        match collection_id {
            Some(id) => {
                if states.get(id).is_some_and(|state| !state.is_in_flight()) {
                    states.remove(id);
                }
            }
            None => states.retain(|_, state| state.is_in_flight()),
        }
    }
}

fn notify(collection_id: &str, callback: &ProgressCallback, progress: &LoadProgress) {
    if catch_unwind(AssertUnwindSafe(|| callback(progress))).is_err() {
        error!(
            collection = collection_id,
            phase = ?progress.phase,
            "Progress callback panicked"
        );
    }
}

/// Handle returned by `subscribe`. Dropping it (or calling `unsubscribe`)
/// removes the callback.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    listeners: Weak<Mutex<Listeners>>,
    collection_id: String,
    token: u64,
}

impl Subscription {
    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(listeners) = self.listeners.upgrade() else {
            return;
        };
        let mut listeners = listeners.lock();
        if let Some(list) = listeners.by_collection.get_mut(&self.collection_id) {
            list.retain(|(token, _)| *token != self.token);
            if list.is_empty() {
                listeners.by_collection.remove(&self.collection_id);
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("collection_id", &self.collection_id)
            .field("token", &self.token)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (ProgressCallback, Arc<Mutex<Vec<LoadProgress>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: ProgressCallback = Arc::new(move |p: &LoadProgress| sink.lock().push(p.clone()));
        (callback, seen)
    }

    #[test]
    fn test_publish_reaches_subscribers() {
        let hub = ProgressHub::new();
        let (callback, seen) = recorder();
        let _sub = hub.subscribe("m1", callback);

        hub.publish("m1", LoadProgress::preparing());
        hub.publish("m2", LoadProgress::preparing());
        hub.publish("m1", LoadProgress::complete(1, 1));

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1], LoadProgress::complete(1, 1));
    }

    #[test]
    fn test_replay_only_while_in_flight() {
        let hub = ProgressHub::new();
        hub.publish("m1", LoadProgress::loading(4, 2, None));
        let (callback, seen) = recorder();
        let _sub = hub.subscribe("m1", callback);
        assert_eq!(seen.lock().len(), 1);

        hub.publish("m2", LoadProgress::complete(1, 1));
        let (callback, seen) = recorder();
        let _sub2 = hub.subscribe("m2", callback);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_drop_unsubscribes() {
        let hub = ProgressHub::new();
        let (callback, seen) = recorder();
        let sub = hub.subscribe("m1", callback);
        assert_eq!(hub.listener_count("m1"), 1);

        sub.unsubscribe();
        assert_eq!(hub.listener_count("m1"), 0);
        hub.publish("m1", LoadProgress::preparing());
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_clear_keeps_in_flight_states() {
        let hub = ProgressHub::new();
        hub.publish("done", LoadProgress::complete(1, 1));
        hub.publish("busy", LoadProgress::loading(2, 1, None));

        hub.clear(None);
        assert!(hub.current("done").is_none());
        assert!(hub.current("busy").is_some());
    }

    #[test]
    fn test_panicking_callback_does_not_starve_others() {
        let hub = ProgressHub::new();
        let panicking: ProgressCallback = Arc::new(|p: &LoadProgress| {
            if p.loaded == 2 {
                panic!("render failed");
            }
        });
        let _bad = hub.subscribe("m1", panicking);
        let (callback, seen) = recorder();
        let _good = hub.subscribe("m1", callback);

        hub.publish("m1", LoadProgress::loading(2, 2, None));
        hub.publish("m1", LoadProgress::complete(2, 2));

        assert_eq!(seen.lock().len(), 2);
        assert_eq!(hub.current("m1"), Some(LoadProgress::complete(2, 2)));
    }

    #[test]
    fn test_panicking_callback_on_replay() {
        let hub = ProgressHub::new();
        hub.publish("m1", LoadProgress::preparing());
        let panicking: ProgressCallback = Arc::new(|_: &LoadProgress| panic!("render failed"));
        let sub = hub.subscribe("m1", panicking);
        assert_eq!(hub.listener_count("m1"), 1);
        drop(sub);
    }
}
