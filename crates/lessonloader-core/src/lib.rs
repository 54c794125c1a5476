//! Progressive content loading with caching.
//!
//! - `registry`: which content units exist and how to produce each one
//! - `cache`: TTL and schema-versioned storage for units and collections
//! - `coordinator`: `ContentLoader`, de-duplicated unit and collection loads
//!   with retries, batching and progress reporting
//! - `source`: manifest and bulk retrieval for whole collections
//! - `fallback`: placeholder units when nothing else works

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod fallback;
pub mod ids;
pub mod models;
pub mod normalize;
pub mod preload;
pub mod registry;
pub mod retry;
pub mod source;

pub use cache::{Clock, ManualClock, SystemClock, TtlCache};
pub use config::LoaderConfig;
pub use coordinator::{ContentLoader, ContentLoaderBuilder, LoaderStats, ProgressCallback, Subscription};
pub use error::{LoadError, LoadResult, SourceError};
pub use fallback::generate_fallback;
pub use ids::ContentId;
pub use models::{ContentUnit, LoadPhase, LoadProgress};
pub use normalize::normalize_payload;
pub use registry::{ContentRegistry, RawModule, RegistryBuilder};
pub use source::{ContentSource, DirectorySource, HttpContentSource};
