//! Data models shared by the loader and its callers.
//!
//! - `ContentUnit`: a loaded (or synthesized) lesson unit
//! - `LoadProgress`, `LoadPhase`: per-collection progress snapshots

pub mod progress;
pub mod unit;

pub use progress::{LoadPhase, LoadProgress};
pub use unit::ContentUnit;
