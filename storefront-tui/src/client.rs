use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use storefront_core::{
    CatalogStore, CollectionSummary, Page, PageRequest, PageSource, Product, SourceError,
};

#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn collections(&self) -> Result<Vec<CollectionSummary>>;
    async fn page(&self, request: PageRequest) -> Result<Page<Product>, SourceError>;
}

// --- HttpClient (remote mode against storefront-feed) ---

pub struct HttpClient {
    client: reqwest::Client,
    base: Url,
}

impl HttpClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base = Url::parse(base_url).context("Invalid server URL")?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, base })
    }

    fn collections_url(&self) -> Result<Url> {
        self.base
            .join("api/collections")
            .context("Failed to build collections URL")
    }

    fn page_url(&self, request: &PageRequest) -> Result<Url, SourceError> {
        let mut url = self
            .base
            .join("api/collections/")
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SourceError::Transport(format!("Unusable server URL: {}", self.base)))?
            .pop_if_empty()
            .push(&request.collection)
            .push("products");
        url.query_pairs_mut()
            .append_pair("page", &request.page.to_string())
            .append_pair("page_size", &request.page_size.to_string());
        Ok(url)
    }
}

#[async_trait]
impl CatalogClient for HttpClient {
    async fn collections(&self) -> Result<Vec<CollectionSummary>> {
        let resp = self
            .client
            .get(self.collections_url()?)
            .send()
            .await
            .context("Failed to connect to server")?
            .error_for_status()
            .context("Server refused collection listing")?;
        resp.json()
            .await
            .context("Failed to parse collection listing")
    }

    async fn page(&self, request: PageRequest) -> Result<Page<Product>, SourceError> {
        let url = self.page_url(&request)?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body: Option<Value> = resp.json().await.ok();
            let message = body
                .as_ref()
                .and_then(|b| b.get("error"))
                .and_then(|m| m.as_str())
                .map(|m| m.to_string())
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());
            return Err(SourceError::Status {
                status: status.as_u16(),
                message,
            });
        }

        resp.json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))
    }
}

// --- EmbeddedClient (in-process via CatalogStore) ---

pub struct EmbeddedClient {
    store: CatalogStore,
}

impl EmbeddedClient {
    pub fn new(store: CatalogStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CatalogClient for EmbeddedClient {
    async fn collections(&self) -> Result<Vec<CollectionSummary>> {
        Ok(self.store.collections())
    }

    async fn page(&self, request: PageRequest) -> Result<Page<Product>, SourceError> {
        Ok(self.store.page(&request)?)
    }
}

/// Lets a feed pull its pages through whichever client the app runs with.
pub struct ClientPages(pub Arc<dyn CatalogClient>);

#[async_trait]
impl PageSource<Product> for ClientPages {
    async fn fetch_page(&self, request: PageRequest) -> Result<Page<Product>, SourceError> {
        self.0.page(request).await
    }
}
