//! Infinite-scroll feed loading.
//!
//! A feed is mounted with the first page of a collection already in hand and
//! grows one page at a time as the reader approaches the end of the list.
//! [`FeedLoader`] owns the state and the fetch orchestration,
//! [`VisibilityTrigger`] decides when scrolling should ask for more, and
//! [`merge`] folds each fetched batch into the list without duplicates.

use std::fmt;
use std::hash::Hash;
use std::time::Duration;

use serde::{Deserialize, Serialize};

mod loader;
mod merge;
mod source;
mod state;
mod trigger;

pub use loader::{Dispatch, FeedLoader, Trigger};
pub use merge::merge;
pub use source::{PageSource, SourceError};
pub use state::{FeedError, FeedState, FeedView};
pub use trigger::{FeedMode, VisibilityTrigger};

/// Minimum spacing between two scroll-triggered fetches.
pub const FETCH_DEBOUNCE_MS: u64 = 500;

/// Automatic retries after the first failed attempt at a page.
pub const MAX_RETRY_ATTEMPTS: u32 = 2;

/// Retry `n` (0-based) waits `BACKOFF_BASE^n` seconds.
pub const BACKOFF_BASE: f64 = 1.5;

/// Scroll-triggered loads allowed before the feed asks for a click.
pub const AUTO_LOAD_CAP: u32 = 3;

/// How close (in rows) the end of the list must be before it counts as in view.
pub const SENTINEL_MARGIN: usize = 5;

/// Anything with a stable identity the feed can de-duplicate on.
pub trait Identified {
    type Id: Eq + Hash + Clone + fmt::Debug;

    fn id(&self) -> &Self::Id;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub page_size: usize,
    pub debounce_ms: u64,
    pub max_retries: u32,
    pub backoff_base: f64,
    pub auto_load_cap: u32,
    pub sentinel_margin: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: crate::query::DEFAULT_PAGE_SIZE,
            debounce_ms: FETCH_DEBOUNCE_MS,
            max_retries: MAX_RETRY_ATTEMPTS,
            backoff_base: BACKOFF_BASE,
            auto_load_cap: AUTO_LOAD_CAP,
            sentinel_margin: SENTINEL_MARGIN,
        }
    }
}

impl FeedConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        Duration::from_secs_f64(self.backoff_base.max(1.0).powi(exponent).min(3600.0))
    }
}
