//! Placeholder units for content that cannot be loaded.
//!
//! Pure and infallible: this is the backstop that guarantees `load_one`
//! always returns a unit.

use serde_json::{json, Value};

use crate::ids::ContentId;
use crate::models::ContentUnit;
use crate::normalize::normalize_payload;

pub fn generate_fallback(id: &str) -> ContentUnit {
    let parsed = ContentId::parse(id);
    let title = match parsed.ordinal() {
        Some(ordinal) => format!("{} · Lesson {}", parsed.collection(), ordinal),
        None => format!("Lesson {}", id),
    };

    ContentUnit {
        id: id.to_string(),
        collection_id: parsed.collection().to_string(),
        order: parsed.order(),
        payload: placeholder_payload(title),
        is_fallback: true,
    }
}

fn placeholder_payload(title: String) -> Value {
    normalize_payload(json!({
        "title": title,
        "description": "This lesson is being prepared and will be available soon.",
        "content": {
            "type": "mixed",
            "introduction": "This lesson content is not available right now.",
            "sections": [{
                "id": "coming-soon-section",
                "title": "Coming Soon",
                "content": "This lesson will be available in a future update."
            }],
            "summary": "This lesson is currently being prepared.",
            "keyPoints": [
                "Check back soon for updated content",
                "Try other available lessons in the meantime"
            ]
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_is_flagged_and_ordered() {
        let unit = generate_fallback("module-2-lesson-5");
        assert!(unit.is_fallback);
        assert_eq!(unit.id, "module-2-lesson-5");
        assert_eq!(unit.collection_id, "module-2");
        assert_eq!(unit.order, 5);
        assert_eq!(unit.title(), Some("module-2 · Lesson 5"));
    }

    #[test]
    fn test_fallback_without_ordinal_has_zero_order() {
        let unit = generate_fallback("glossary");
        assert_eq!(unit.order, 0);
        assert_eq!(unit.collection_id, "glossary");
        assert!(unit.title().is_some());
    }

    #[test]
    fn test_fallback_payload_is_well_formed() {
        let unit = generate_fallback("module-1-lesson-1");
        let content = &unit.payload["content"];
        assert!(content["sections"].is_array());
        assert!(content["slides"].is_array());
        assert!(content["resources"].is_array());
        assert!(unit.payload["tasks"].is_array());
    }
}
