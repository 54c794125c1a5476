//! HTTP collaborator for manifests and bulk collection retrieval.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{ContentSource, ManifestDocument};
use crate::error::SourceError;
use crate::models::ContentUnit;
use crate::retry::Backoff;

/// HTTP request timeout in seconds.
/// Matches the manifest timeout so a hung request never outlives the caller.
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Pauses of 1s, 2s, 4s while the service answers 429.
const RATE_LIMIT_BACKOFF: Backoff = Backoff::new(Duration::from_secs(1), 3);

/// Remote content store client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpContentSource {
    client: Client,
    base_url: String,
    token: Option<Arc<str>>,
}

impl HttpContentSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Build on an existing client, sharing its connection pool.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            token: None,
        }
    }

    /// Set the bearer token for authenticated requests
    pub fn with_token(mut self, token: impl Into<Arc<str>>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn manifest_url(&self, collection_id: &str) -> String {
        format!("{}/collections/{}/manifest", self.base_url, collection_id)
    }

    pub fn bulk_url(&self, collection_id: &str) -> String {
        format!("{}/collections/{}/units", self.base_url, collection_id)
    }

    fn request(&self, url: &str) -> RequestBuilder {
        let request = self.client.get(url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// One GET; any non-success status becomes a `SourceError`.
    async fn send(&self, url: &str) -> Result<Response, SourceError> {
        let response = self.request(url).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SourceError::from_response(url, status, &body))
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = RATE_LIMIT_BACKOFF
            .retry_while(url, || self.send(url), SourceError::is_rate_limited)
            .await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    pub async fn manifest(&self, collection_id: &str) -> Result<Vec<String>> {
        let document: ManifestDocument = self.get(&self.manifest_url(collection_id)).await?;
        let ids = document.into_ids();
        debug!(collection = collection_id, count = ids.len(), "Manifest fetched");
        Ok(ids)
    }

    pub async fn bulk_collection(&self, collection_id: &str) -> Result<Vec<ContentUnit>> {
        let units: Vec<ContentUnit> = self.get(&self.bulk_url(collection_id)).await?;
        debug!(collection = collection_id, count = units.len(), "Bulk collection fetched");
        Ok(units)
    }
}

impl ContentSource for HttpContentSource {
    fn fetch_manifest<'a>(&'a self, collection_id: &'a str) -> BoxFuture<'a, Result<Vec<String>>> {
        self.manifest(collection_id).boxed()
    }

    fn fetch_bulk_collection<'a>(
        &'a self,
        collection_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ContentUnit>>> {
        self.bulk_collection(collection_id).boxed()
    }
}
