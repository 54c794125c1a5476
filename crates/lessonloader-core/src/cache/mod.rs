//! In-memory caching for loaded units and collections.
//!
//! This module provides `TtlCache`, a string-keyed store whose entries carry
//! their load time and schema version. An entry is served only while it is
//! younger than the TTL and was written under the current schema version;
//! anything else is a miss and is dropped on the spot.
//!
//! Two instantiations are used by the loader:
//! - `UnitCache`: one entry per unit ID
//! - `CollectionCache`: the ordered unit list per collection ID

pub mod clock;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{CacheEntry, TtlCache};

use crate::models::ContentUnit;

pub type UnitCache = TtlCache<ContentUnit>;
pub type CollectionCache = TtlCache<Vec<ContentUnit>>;
