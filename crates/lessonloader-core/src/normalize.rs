//! Structural normalization of loaded payloads.
//!
//! Missing optional structure is filled with empty defaults; a unit is never
//! rejected for its shape.

use serde_json::{json, Map, Value};

const ARRAY_FIELDS: [&str; 4] = ["sections", "slides", "keyPoints", "resources"];

fn default_content() -> Value {
    json!({
        "type": "mixed",
        "introduction": "Lesson content loading...",
        "sections": [],
        "slides": [],
        "summary": "",
        "keyPoints": [],
        "resources": []
    })
}

fn ensure_array(object: &mut Map<String, Value>, key: &str) {
    let present = object.get(key).is_some_and(Value::is_array);
    if !present {
        object.insert(key.to_string(), Value::Array(Vec::new()));
    }
}

fn normalize_section(index: usize, section: Value) -> Value {
    let mut section = match section {
        Value::Object(map) => map,
        Value::String(text) => {
            let mut map = Map::new();
            map.insert("content".to_string(), Value::String(text));
            map
        }
        _ => Map::new(),
    };
    section
        .entry("id")
        .or_insert_with(|| Value::String(format!("section-{}", index)));
    section
        .entry("title")
        .or_insert_with(|| Value::String(format!("Section {}", index + 1)));
    section
        .entry("content")
        .or_insert_with(|| Value::String(String::new()));
    Value::Object(section)
}

/// Ensure `content`, its arrays, `tasks`, and per-section identity fields exist.
///
/// Non-object payloads are kept under a `data` key.
pub fn normalize_payload(payload: Value) -> Value {
    let mut root = match payload {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("data".to_string(), other);
            map
        }
    };

    let content = root.entry("content").or_insert_with(default_content);
    if !content.is_object() {
        *content = default_content();
    }
    if let Value::Object(content) = content {
        for key in ARRAY_FIELDS {
            ensure_array(content, key);
        }
        if let Some(Value::Array(sections)) = content.get_mut("sections") {
            let normalized = std::mem::take(sections)
                .into_iter()
                .enumerate()
                .map(|(index, section)| normalize_section(index, section))
                .collect();
            *sections = normalized;
        }
    }

    ensure_array(&mut root, "tasks");
    Value::Object(root)
}
