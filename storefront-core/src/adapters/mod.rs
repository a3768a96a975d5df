use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::catalog::CatalogStore;
use crate::query::QueryError;

#[cfg(feature = "adapter-generated")]
pub mod generated;
#[cfg(feature = "adapter-json")]
pub mod json;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Catalog error: {0}")]
    Catalog(#[from] QueryError),
}

#[async_trait]
pub trait CatalogAdapter: Send + Sync {
    /// Label used in logs (e.g., "json:catalog.json", "generated:demo")
    fn name(&self) -> &str;

    /// Load products into the store. Returns how many products were added.
    async fn sync(&self, store: &CatalogStore) -> Result<usize, AdapterError>;
}

/// One `[[adapter]]` entry of a TOML config file.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum AdapterConfig {
    #[cfg(feature = "adapter-json")]
    #[serde(rename = "json")]
    Json { path: String },

    #[cfg(feature = "adapter-generated")]
    #[serde(rename = "generated")]
    Generated {
        collection: String,
        title: Option<String>,
        count: usize,
    },
}

pub fn create_adapters(
    configs: &[AdapterConfig],
) -> Result<Vec<Arc<dyn CatalogAdapter>>, AdapterError> {
    let mut adapters: Vec<Arc<dyn CatalogAdapter>> = Vec::new();

    for adapter_config in configs {
        match adapter_config {
            #[cfg(feature = "adapter-json")]
            AdapterConfig::Json { path } => {
                info!(path = %path, "Creating JSON catalog adapter");
                let adapter = json::JsonFileAdapter::new(std::path::PathBuf::from(path))?;
                adapters.push(Arc::new(adapter));
            }

            #[cfg(feature = "adapter-generated")]
            AdapterConfig::Generated {
                collection,
                title,
                count,
            } => {
                info!(collection = %collection, count = %count, "Creating generated catalog adapter");
                let adapter =
                    generated::GeneratedAdapter::new(collection.clone(), title.clone(), *count)?;
                adapters.push(Arc::new(adapter));
            }
        }
    }

    Ok(adapters)
}

/// Sync every adapter into `store`, skipping the ones that fail.
/// Returns how many products were added in total.
pub async fn sync_all(store: &CatalogStore, adapters: &[Arc<dyn CatalogAdapter>]) -> usize {
    let mut added = 0;
    for adapter in adapters {
        info!(adapter = %adapter.name(), "Syncing adapter");
        match adapter.sync(store).await {
            Ok(count) => {
                info!(adapter = %adapter.name(), added = count, "Adapter synced");
                added += count;
            }
            Err(e) => {
                warn!(
                    adapter = %adapter.name(),
                    error = %e,
                    "Failed to sync adapter, skipping"
                );
            }
        }
    }
    added
}
