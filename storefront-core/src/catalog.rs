use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::feed::{Identified, PageSource, SourceError};
use crate::query::{Page, PageRequest, QueryError, MAX_PAGE_SIZE};

/// A catalog record as listed in a collection feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    pub price_cents: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_at_cents: Option<u64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_in_stock() -> bool {
    true
}

impl Product {
    pub fn display_price(&self) -> String {
        format_cents(self.price_cents, &self.currency)
    }

    pub fn is_on_sale(&self) -> bool {
        matches!(self.compare_at_cents, Some(was) if was > self.price_cents)
    }
}

impl Identified for Product {
    type Id = String;

    fn id(&self) -> &String {
        &self.id
    }
}

pub fn format_cents(cents: u64, currency: &str) -> String {
    format!("{}.{:02} {}", cents / 100, cents % 100, currency)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub key: String,
    pub title: String,
    pub product_count: usize,
}

/// In-memory product catalog, shared between request handlers.
#[derive(Clone)]
pub struct CatalogStore {
    // collection key -> collection, products kept in listing order
    collections: Arc<RwLock<BTreeMap<String, Collection>>>,
    max_page_size: usize,
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::with_max_page_size(MAX_PAGE_SIZE)
    }

    pub fn with_max_page_size(max_page_size: usize) -> Self {
        CatalogStore {
            collections: Arc::new(RwLock::new(BTreeMap::new())),
            max_page_size: max_page_size.max(1),
        }
    }

    pub fn max_page_size(&self) -> usize {
        self.max_page_size
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Collection>> {
        self.collections.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Collection>> {
        self.collections.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Create the collection if it does not exist yet. An existing
    /// collection keeps its products and takes the new title.
    pub fn register_collection(&self, key: &str, title: &str) {
        let mut collections = self.write();
        collections
            .entry(key.to_string())
            .and_modify(|c| c.title = title.to_string())
            .or_insert_with(|| Collection {
                key: key.to_string(),
                title: title.to_string(),
                products: Vec::new(),
            });
    }

    /// Append products to a registered collection, skipping ids it already
    /// lists. Returns how many were added.
    pub fn add_products(&self, key: &str, products: Vec<Product>) -> Result<usize, QueryError> {
        let mut collections = self.write();
        let collection = collections
            .get_mut(key)
            .ok_or_else(|| QueryError::UnknownCollection(key.to_string()))?;

        let mut seen: HashSet<String> =
            collection.products.iter().map(|p| p.id.clone()).collect();
        let before = collection.products.len();
        for product in products {
            if seen.insert(product.id.clone()) {
                collection.products.push(product);
            }
        }
        Ok(collection.products.len() - before)
    }

    pub fn has_collection(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    pub fn collections(&self) -> Vec<CollectionSummary> {
        self.read()
            .values()
            .map(|c| CollectionSummary {
                key: c.key.clone(),
                title: c.title.clone(),
                product_count: c.products.len(),
            })
            .collect()
    }

    pub fn page(&self, request: &PageRequest) -> Result<Page<Product>, QueryError> {
        request.validate(self.max_page_size)?;
        let collections = self.read();
        let collection = collections
            .get(&request.collection)
            .ok_or_else(|| QueryError::UnknownCollection(request.collection.clone()))?;
        Ok(Page::slice(&collection.products, request))
    }

    pub fn seed_example(&self) {
        self.register_collection("featured", "Featured");
        // Freshly registered, so the key is always known.
        let _ = self.add_products("featured", demo_products("featured", 20));

        self.register_collection("new-arrivals", "New Arrivals");
        let _ = self.add_products("new-arrivals", demo_products("new-arrivals", 5));
    }
}

#[async_trait]
impl PageSource<Product> for CatalogStore {
    async fn fetch_page(&self, request: PageRequest) -> Result<Page<Product>, SourceError> {
        Ok(self.page(&request)?)
    }
}

const ADJECTIVES: &[&str] = &[
    "Classic", "Everyday", "Organic", "Vintage", "Compact", "Deluxe", "Heritage", "Urban",
];

const NOUNS: &[&str] = &[
    "Tote Bag", "Ceramic Mug", "Linen Shirt", "Desk Lamp", "Water Bottle", "Wool Scarf",
    "Notebook", "Candle",
];

/// Deterministic demo products for `collection`, ids `<collection>-<n>`.
pub fn demo_products(collection: &str, count: usize) -> Vec<Product> {
    (1..=count)
        .map(|n| {
            let name = format!(
                "{} {}",
                ADJECTIVES[(n - 1) % ADJECTIVES.len()],
                NOUNS[(n - 1) / ADJECTIVES.len() % NOUNS.len()]
            );
            let price_cents = 999 + (n as u64 * 250) % 5000;
            Product {
                id: format!("{}-{}", collection, n),
                slug: format!("{}-{}", name.to_lowercase().replace(' ', "-"), n),
                name,
                price_cents,
                compare_at_cents: (n % 4 == 0).then_some(price_cents + 500),
                currency: default_currency(),
                image_url: None,
                rating: Some(3.0 + (n % 5) as f32 * 0.5),
                in_stock: n % 7 != 0,
            }
        })
        .collect()
}
