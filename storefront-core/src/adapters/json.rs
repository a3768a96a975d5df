use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::adapters::{AdapterError, CatalogAdapter};
use crate::catalog::{CatalogStore, Product};

/// Loads collections from a JSON file shaped as
/// `[{ "key": ..., "title": ..., "products": [...] }]`.
///
/// Collections already present in the store are extended; products whose id
/// the collection already lists are skipped.
pub struct JsonFileAdapter {
    name: String,
    path: PathBuf,
}

#[derive(Deserialize)]
struct CollectionFile {
    key: String,
    title: Option<String>,
    #[serde(default)]
    products: Vec<Product>,
}

impl JsonFileAdapter {
    /// # Errors
    ///
    /// Returns `AdapterError::Config` if `path` does not exist or is not a file.
    pub fn new(path: PathBuf) -> Result<Self, AdapterError> {
        if !path.is_file() {
            return Err(AdapterError::Config(format!(
                "Catalog file not found: {}",
                path.display()
            )));
        }
        Ok(Self {
            name: format!("json:{}", path.display()),
            path,
        })
    }
}

#[async_trait]
impl CatalogAdapter for JsonFileAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn sync(&self, store: &CatalogStore) -> Result<usize, AdapterError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let collections: Vec<CollectionFile> = serde_json::from_str(&content)
            .map_err(|e| AdapterError::Parse(format!("{}: {e}", self.path.display())))?;

        let mut added = 0;
        for collection in collections {
            if collection.key.trim().is_empty() {
                return Err(AdapterError::Parse(format!(
                    "{}: collection without a key",
                    self.path.display()
                )));
            }
            let title = collection
                .title
                .unwrap_or_else(|| collection.key.clone());
            store.register_collection(&collection.key, &title);
            let count = store.add_products(&collection.key, collection.products)?;
            debug!(collection = %collection.key, added = count, "Loaded collection");
            added += count;
        }
        Ok(added)
    }
}
