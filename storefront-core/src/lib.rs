pub mod catalog;
pub mod query;
pub mod adapters;
pub mod feed;

pub use catalog::{CatalogStore, Collection, CollectionSummary, Product};
pub use query::{Page, PageRequest, QueryError, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use adapters::{create_adapters, sync_all, AdapterConfig, AdapterError, CatalogAdapter};
pub use feed::{
    Dispatch, FeedConfig, FeedError, FeedLoader, FeedMode, FeedState, FeedView, Identified,
    PageSource, SourceError, Trigger, VisibilityTrigger,
};

#[cfg(feature = "adapter-generated")]
pub use adapters::generated::GeneratedAdapter;
#[cfg(feature = "adapter-json")]
pub use adapters::json::JsonFileAdapter;
