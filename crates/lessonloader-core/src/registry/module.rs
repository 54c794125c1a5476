//! Raw modules produced by loaders and the export-extraction step.

use serde_json::Value;

/// An ordered set of named exports returned by a loader.
///
/// A JSON document of the form `{ "exports": { name: value, ... } }` is read
/// as a multi-export module; any other document is a single `default` export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawModule {
    exports: Vec<(String, Value)>,
}

impl RawModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_export(mut self, name: impl Into<String>, value: Value) -> Self {
        self.exports.push((name.into(), value));
        self
    }

    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(mut map) if map.get("exports").is_some_and(Value::is_object) => {
                let exports = match map.remove("exports") {
                    Some(Value::Object(exports)) => exports.into_iter().collect(),
                    _ => Vec::new(),
                };
                Self { exports }
            }
            other => Self::new().with_export("default", other),
        }
    }

    pub fn exports(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.exports.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }

    /// First export whose name is in `candidates` (in candidate order),
    /// otherwise the first export of the module.
    pub fn extract(&self, candidates: &[String]) -> Option<&Value> {
        candidates
            .iter()
            .find_map(|key| {
                self.exports
                    .iter()
                    .find(|(name, _)| name == key)
                    .map(|(_, value)| value)
            })
            .or_else(|| self.exports.first().map(|(_, value)| value))
    }

    /// Consuming variant of [`RawModule::extract`].
    pub fn into_extracted(mut self, candidates: &[String]) -> Option<Value> {
        let index = candidates
            .iter()
            .find_map(|key| self.exports.iter().position(|(name, _)| name == key))
            .or(if self.exports.is_empty() { None } else { Some(0) })?;
        Some(self.exports.swap_remove(index).1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_candidate_order_wins() {
        let module = RawModule::new()
            .with_export("helper", json!(1))
            .with_export("lesson3", json!(2))
            .with_export("default", json!(3));
        assert_eq!(module.extract(&keys(&["default", "lesson3"])), Some(&json!(3)));
        assert_eq!(module.extract(&keys(&["lesson3"])), Some(&json!(2)));
    }

    #[test]
    fn test_first_export_when_nothing_matches() {
        let module = RawModule::new()
            .with_export("optimizedLesson7", json!("first"))
            .with_export("other", json!("second"));
        assert_eq!(module.extract(&keys(&["default"])), Some(&json!("first")));
        assert_eq!(
            module.into_extracted(&keys(&["default"])),
            Some(json!("first"))
        );
    }

    #[test]
    fn test_empty_module() {
        let module = RawModule::new();
        assert!(module.is_empty());
        assert_eq!(module.extract(&keys(&["default"])), None);
        assert_eq!(module.into_extracted(&keys(&["default"])), None);
    }

    #[test]
    fn test_from_json_exports_form_keeps_order() {
        let module = RawModule::from_json(json!({
            "exports": { "zeta": 1, "alpha": 2 }
        }));
        let names: Vec<&str> = module.exports().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_from_json_plain_document_is_default_export() {
        let module = RawModule::from_json(json!({ "title": "Leads", "exports": [] }));
        let (name, value) = module.exports().next().unwrap();
        assert_eq!(name, "default");
        assert_eq!(value["title"], "Leads");
    }
}
