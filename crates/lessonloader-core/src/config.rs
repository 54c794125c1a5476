//! Loader tuning knobs.
//!
//! One set of constants governs every load path: per-item timeouts, retry
//! attempts, batch sizing and the caller-facing collection timeout. All fields
//! are optional in serialized form and fall back to the defaults below.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Cache entries older than 24 hours are misses.
/// Lesson content changes with app releases, not during a session.
pub const DEFAULT_TTL_MINUTES: i64 = 24 * 60;

/// Bump when the shape of cached units changes; older entries become misses.
pub const DEFAULT_SCHEMA_VERSION: &str = "1.0.0";

/// Units loaded concurrently per batch.
/// Kept small so constrained clients are not flooded with parallel fetches.
pub const DEFAULT_BATCH_SIZE: usize = 2;

/// Pause between batches in milliseconds.
pub const DEFAULT_BATCH_PAUSE_MS: u64 = 300;

/// Timeout for a single loader attempt in milliseconds.
pub const DEFAULT_ITEM_TIMEOUT_MS: u64 = 8_000;

/// Attempts per unit before falling back to placeholder content.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base retry delay in milliseconds; attempt `n` waits `n * base`.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;

/// Timeout for manifest and bulk collaborator calls in milliseconds.
pub const DEFAULT_MANIFEST_TIMEOUT_MS: u64 = 15_000;

/// How long a `load_collection` caller waits before giving up, in milliseconds.
pub const DEFAULT_COLLECTION_TIMEOUT_MS: u64 = 60_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoaderConfig {
    pub ttl_minutes: i64,
    pub schema_version: String,
    pub batch_size: usize,
    pub batch_pause_ms: u64,
    pub item_timeout_ms: u64,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub manifest_timeout_ms: u64,
    pub collection_timeout_ms: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: DEFAULT_TTL_MINUTES,
            schema_version: DEFAULT_SCHEMA_VERSION.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            batch_pause_ms: DEFAULT_BATCH_PAUSE_MS,
            item_timeout_ms: DEFAULT_ITEM_TIMEOUT_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            manifest_timeout_ms: DEFAULT_MANIFEST_TIMEOUT_MS,
            collection_timeout_ms: DEFAULT_COLLECTION_TIMEOUT_MS,
        }
    }
}

impl LoaderConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.ttl_minutes.max(0))
    }

    /// Batch size, never zero.
    pub fn batch_size(&self) -> usize {
        self.batch_size.max(1)
    }

    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }

    pub fn item_timeout(&self) -> Duration {
        Duration::from_millis(self.item_timeout_ms)
    }

    /// Attempt count, never zero.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn manifest_timeout(&self) -> Duration {
        Duration::from_millis(self.manifest_timeout_ms)
    }

    pub fn collection_timeout(&self) -> Duration {
        Duration::from_millis(self.collection_timeout_ms)
    }
}
