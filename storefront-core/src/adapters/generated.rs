use async_trait::async_trait;

use crate::adapters::{AdapterError, CatalogAdapter};
use crate::catalog::{demo_products, CatalogStore};

/// Fills a collection with synthetic products, handy for long feeds.
pub struct GeneratedAdapter {
    name: String,
    collection: String,
    title: String,
    count: usize,
}

impl GeneratedAdapter {
    pub fn new(collection: String, title: Option<String>, count: usize) -> Result<Self, AdapterError> {
        if collection.trim().is_empty() {
            return Err(AdapterError::Config("Generated collection needs a key".to_string()));
        }
        if count == 0 {
            return Err(AdapterError::Config(format!(
                "Generated collection {} needs at least one product",
                collection
            )));
        }
        Ok(Self {
            name: format!("generated:{}", collection),
            title: title.unwrap_or_else(|| collection.clone()),
            collection,
            count,
        })
    }
}

#[async_trait]
impl CatalogAdapter for GeneratedAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn sync(&self, store: &CatalogStore) -> Result<usize, AdapterError> {
        store.register_collection(&self.collection, &self.title);
        Ok(store.add_products(&self.collection, demo_products(&self.collection, self.count))?)
    }
}
