use async_trait::async_trait;
use thiserror::Error;

use crate::query::{Page, PageRequest, QueryError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Invalid response: {0}")]
    Decode(String),
    #[error("Request rejected: {0}")]
    Rejected(String),
    #[error("Page source failed unexpectedly")]
    Panicked,
    #[error("Request cancelled")]
    Cancelled,
}

impl SourceError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SourceError::Cancelled)
    }
}

impl From<QueryError> for SourceError {
    fn from(err: QueryError) -> Self {
        SourceError::Rejected(err.to_string())
    }
}

/// The paged product query, as seen by a feed.
///
/// Implementations are stateless reads: the feed makes no assumption that
/// two page requests reach the same backend.
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    async fn fetch_page(&self, request: PageRequest) -> Result<Page<T>, SourceError>;
}
