//! Stock loader functions.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::FutureExt;
use serde_json::Value;

use super::{LoaderFn, RawModule};
use crate::error::SourceError;

/// Wrap an async closure as a `LoaderFn`.
pub fn loader_fn<F, Fut>(f: F) -> LoaderFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<RawModule>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// Loader for content compiled into the binary or built in memory.
pub fn static_loader(module: RawModule) -> LoaderFn {
    loader_fn(move || {
        let module = module.clone();
        async move { Ok(module) }
    })
}

/// Loader that reads a JSON module file on every invocation.
pub fn file_loader(path: impl Into<PathBuf>) -> LoaderFn {
    let path = path.into();
    loader_fn(move || {
        let path = path.clone();
        async move { read_module(&path).await }
    })
}

pub async fn read_module(path: &Path) -> Result<RawModule> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read module file: {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse module file: {}", path.display()))?;
    Ok(RawModule::from_json(value))
}

/// Loader that fetches a JSON module document over HTTP.
/// Clone is cheap - reqwest::Client shares its connection pool.
pub fn http_loader(client: reqwest::Client, url: impl Into<String>) -> LoaderFn {
    let url = url.into();
    loader_fn(move || {
        let client = client.clone();
        let url = url.clone();
        async move {
            let response = client
                .get(&url)
                .send()
                .await
                .with_context(|| format!("Failed to send GET request to {}", url))?;
            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(SourceError::from_response(&url, status, &body).into());
            }
            let value: Value = response
                .json()
                .await
                .with_context(|| format!("Failed to parse JSON response from {}", url))?;
            Ok(RawModule::from_json(value))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_static_loader_returns_module_each_time() {
        let loader = static_loader(RawModule::new().with_export("default", json!({"title": "A"})));
        let first = loader().await.unwrap();
        let second = loader().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_file_loader_reads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("module-1-lesson-1.json");
        std::fs::write(&path, r#"{"title": "Heart anatomy"}"#).unwrap();

        let module = file_loader(&path)().await.unwrap();
        let value = module.extract(&["default".to_string()]).unwrap();
        assert_eq!(value["title"], "Heart anatomy");
    }

    #[tokio::test]
    async fn test_file_loader_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = file_loader(dir.path().join("nope.json"))().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_http_loader_unreachable_host_is_error() {
        let loader = http_loader(reqwest::Client::new(), "http://127.0.0.1:9/module-1-lesson-1.json");
        assert!(loader().await.is_err());
    }
}
