//! The atomic loadable item.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::ContentId;

/// A loaded lesson unit.
///
/// Units are never patched after creation; a reload replaces the cached
/// entry wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct ContentUnit {
    pub id: String,
    #[serde(default)]
    pub collection_id: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub is_fallback: bool,
}

impl ContentUnit {
    /// Build a unit from an extracted payload.
    ///
    /// The payload's own `order` wins when it is an integer; otherwise the
    /// ordinal encoded in the ID is used.
    pub fn from_payload(id: &str, collection_id: &str, payload: Value) -> Self {
        let order = payload
            .get("order")
            .and_then(Value::as_i64)
            .unwrap_or_else(|| ContentId::parse(id).order());
        Self {
            id: id.to_string(),
            collection_id: collection_id.to_string(),
            order,
            payload,
            is_fallback: false,
        }
    }

    /// Payload title, if the payload carries one.
    pub fn title(&self) -> Option<&str> {
        self.payload.get("title").and_then(Value::as_str)
    }

    /// Label for progress displays: the title, or the ID.
    pub fn label(&self) -> &str {
        self.title().unwrap_or(&self.id)
    }
}
