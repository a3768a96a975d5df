use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Page size used when a caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: usize = 8;

/// Largest page a catalog will serve unless configured otherwise.
pub const MAX_PAGE_SIZE: usize = 48;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),
    #[error("Invalid page {0}: pages start at 1")]
    InvalidPage(usize),
    #[error("Invalid page size {0}: must be between 1 and {1}")]
    InvalidPageSize(usize, usize),
}

/// One request against the paged product query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub collection: String,
    pub page: usize,
    pub page_size: usize,
}

impl PageRequest {
    pub fn new(collection: impl Into<String>, page: usize, page_size: usize) -> Self {
        Self {
            collection: collection.into(),
            page,
            page_size,
        }
    }

    pub fn validate(&self, max_page_size: usize) -> Result<(), QueryError> {
        if self.page == 0 {
            return Err(QueryError::InvalidPage(self.page));
        }
        if self.page_size == 0 || self.page_size > max_page_size {
            return Err(QueryError::InvalidPageSize(self.page_size, max_page_size));
        }
        Ok(())
    }

    /// Index of the first item on this page.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}

/// A page of results as returned by the paged product query.
///
/// `total` is optional on the wire: sources that cannot count cheaply only
/// report `has_more`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub has_more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
}

impl<T: Clone> Page<T> {
    /// Cut the page described by `request` out of the full ordered result set.
    pub fn slice(all: &[T], request: &PageRequest) -> Self {
        let start = request.offset().min(all.len());
        let end = start.saturating_add(request.page_size).min(all.len());
        Page {
            items: all[start..end].to_vec(),
            page: request.page,
            page_size: request.page_size,
            has_more: end < all.len(),
            total: Some(all.len()),
        }
    }
}
