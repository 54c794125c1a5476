use std::fs;
use std::path::Path;

use lessonloader_core::registry::RegistryBuilder;
use lessonloader_core::{ContentLoader, DirectorySource};
use serde_json::json;

fn write_json(path: &Path, value: serde_json::Value) {
    fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
}

fn content_tree() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();

    let first = dir.path().join("module-1");
    fs::create_dir(&first).unwrap();
    write_json(&first.join("manifest.json"), json!(["module-1-lesson-2", "module-1-lesson-1"]));
    write_json(&first.join("module-1-lesson-1.json"), json!({ "title": "Needs and Wants" }));
    write_json(
        &first.join("module-1-lesson-2.json"),
        json!({ "exports": { "lesson2": { "title": "Saving" }, "quiz": { "title": "Quiz" } } }),
    );

    // No manifest: served through the bulk path
    let second = dir.path().join("module-2");
    fs::create_dir(&second).unwrap();
    write_json(&second.join("module-2-lesson-2.json"), json!({ "title": "Credit" }));
    write_json(&second.join("module-2-lesson-1.json"), json!({ "title": "Banking" }));

    dir
}

fn loader_for(root: &Path) -> ContentLoader {
    let registry = RegistryBuilder::new().scan_directory(root).unwrap().build();
    ContentLoader::new(registry, DirectorySource::new(root))
}

#[tokio::test]
async fn test_collection_from_manifest_on_disk() {
    let dir = content_tree();
    let loader = loader_for(dir.path());

    let units = loader.load_collection("module-1", None).await.unwrap();

    let titles: Vec<&str> = units.iter().filter_map(|u| u.title()).collect();
    assert_eq!(titles, vec!["Needs and Wants", "Saving"]);
    assert!(units.iter().all(|u| !u.is_fallback));
}

#[tokio::test]
async fn test_collection_without_manifest_uses_bulk_read() {
    let dir = content_tree();
    let loader = loader_for(dir.path());

    let units = loader.load_collection("module-2", None).await.unwrap();

    let titles: Vec<&str> = units.iter().filter_map(|u| u.title()).collect();
    assert_eq!(titles, vec!["Banking", "Credit"]);
    assert!(loader.cached_unit("module-2-lesson-1").is_some());
}

#[tokio::test]
async fn test_missing_collection_fails() {
    let dir = content_tree();
    let loader = loader_for(dir.path());

    assert!(loader.load_collection("module-5", None).await.is_err());
    assert!(loader.load_one("module-5-lesson-1").await.is_fallback);
}

#[tokio::test]
async fn test_registry_lists_scanned_ids() {
    let dir = content_tree();
    let loader = loader_for(dir.path());

    assert_eq!(
        loader.registry().list_known_ids(),
        vec!["module-1-lesson-1", "module-1-lesson-2", "module-2-lesson-1", "module-2-lesson-2"]
    );
    assert_eq!(loader.next_candidate("module-1-lesson-2").as_deref(), Some("module-2-lesson-1"));
}
