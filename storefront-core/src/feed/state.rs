use std::time::Duration;

use super::merge::merge;
use super::trigger::FeedMode;
use super::Identified;
use crate::query::Page;

/// What went wrong with the last attempt, as shown to the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// The attempt failed and another one is already scheduled.
    FetchFailed { message: String, retry_in: Duration },
    /// Automatic retries are used up; only an explicit retry continues.
    Exhausted { message: String },
}

impl FeedError {
    pub fn code(&self) -> &'static str {
        match self {
            FeedError::FetchFailed { .. } => "fetch_failed",
            FeedError::Exhausted { .. } => "retries_exhausted",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            FeedError::FetchFailed { message, .. } | FeedError::Exhausted { message } => message,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, FeedError::Exhausted { .. })
    }
}

#[derive(Debug, Clone)]
pub struct FeedState<T> {
    pub items: Vec<T>,
    /// Next page to request.
    pub cursor: usize,
    pub has_more: bool,
    pub loading: bool,
    pub error: Option<FeedError>,
    pub retry_count: u32,
    pub auto_load_count: u32,
}

impl<T: Identified> FeedState<T> {
    /// State for a feed mounted on an already rendered first page.
    pub fn seeded(seed: Page<T>) -> Self {
        let Page {
            items,
            page,
            has_more,
            total,
            ..
        } = seed;
        let items = merge(Vec::new(), items);
        let has_more = !items.is_empty() && more_available(has_more, items.len(), total);
        FeedState {
            items,
            cursor: page.max(1) + 1,
            has_more,
            loading: false,
            error: None,
            retry_count: 0,
            auto_load_count: 0,
        }
    }
}

/// The source must say there is more, and a known total must not be reached.
pub(crate) fn more_available(source_has_more: bool, loaded: usize, total: Option<usize>) -> bool {
    source_has_more && total.map_or(true, |total| loaded < total)
}

/// Read-only snapshot handed to the rendering layer.
#[derive(Debug)]
pub struct FeedView<'a, T> {
    pub items: &'a [T],
    pub loading: bool,
    pub error: Option<&'a FeedError>,
    pub has_more: bool,
    pub mode: FeedMode,
}
