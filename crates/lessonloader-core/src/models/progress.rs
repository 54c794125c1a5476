//! Per-collection progress snapshots.
//!
//! A snapshot is replaced on every update, never mutated in place, so a
//! subscriber always sees a consistent view.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum LoadPhase {
    Preparing,
    Loading,
    Complete,
    Error,
}

impl LoadPhase {
    /// `Complete` and `Error` end an attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoadPhase::Complete | LoadPhase::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct LoadProgress {
    pub total: usize,
    pub loaded: usize,
    pub current_item_label: Option<String>,
    pub phase: LoadPhase,
    pub error: Option<String>,
}

impl LoadProgress {
    pub fn preparing() -> Self {
        Self {
            total: 0,
            loaded: 0,
            current_item_label: None,
            phase: LoadPhase::Preparing,
            error: None,
        }
    }

    pub fn loading(total: usize, loaded: usize, label: Option<String>) -> Self {
        Self {
            total,
            loaded,
            current_item_label: label,
            phase: LoadPhase::Loading,
            error: None,
        }
    }

    pub fn complete(total: usize, loaded: usize) -> Self {
        Self {
            total,
            loaded,
            current_item_label: None,
            phase: LoadPhase::Complete,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            total: 0,
            loaded: 0,
            current_item_label: None,
            phase: LoadPhase::Error,
            error: Some(message.into()),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        !self.phase.is_terminal()
    }

    /// Completion percentage, 0 while the total is unknown.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return if self.phase == LoadPhase::Complete { 100 } else { 0 };
        }
        ((self.loaded.min(self.total) * 100) / self.total) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent() {
        assert_eq!(LoadProgress::preparing().percent(), 0);
        assert_eq!(LoadProgress::loading(4, 1, None).percent(), 25);
        assert_eq!(LoadProgress::complete(0, 0).percent(), 100);
    }

    #[test]
    fn test_terminal_phases() {
        assert!(LoadProgress::preparing().is_in_flight());
        assert!(LoadProgress::loading(2, 0, None).is_in_flight());
        assert!(!LoadProgress::complete(2, 2).is_in_flight());
        assert!(!LoadProgress::failed("boom").is_in_flight());
    }

    #[test]
    fn test_phase_serializes_lowercase() {
        let json = serde_json::to_string(&LoadPhase::Complete).unwrap();
        assert_eq!(json, "\"complete\"");
    }
}
