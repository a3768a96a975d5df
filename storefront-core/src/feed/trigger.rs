use serde::{Deserialize, Serialize};
use tracing::info;

use super::state::FeedState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedMode {
    /// Reaching the end of the list loads the next page.
    Auto,
    /// The reader has to ask for the next page.
    Manual,
}

/// Watches the sentinel just past the last rendered item.
///
/// The sentinel counts as visible once it is within `margin` of the bottom
/// of the viewport, so the next page is requested a little before the
/// reader actually runs out of items.
#[derive(Debug, Clone)]
pub struct VisibilityTrigger {
    margin: usize,
    auto_load_cap: u32,
    mode: FeedMode,
}

impl VisibilityTrigger {
    pub fn new(margin: usize, auto_load_cap: u32) -> Self {
        let mode = if auto_load_cap == 0 {
            FeedMode::Manual
        } else {
            FeedMode::Auto
        };
        Self {
            margin,
            auto_load_cap,
            mode,
        }
    }

    pub fn mode(&self) -> FeedMode {
        self.mode
    }

    /// `distance` is how far the sentinel sits below the viewport's bottom
    /// edge; zero once it is on screen.
    pub fn is_in_view(&self, distance: usize) -> bool {
        distance <= self.margin
    }

    /// Switch to manual mode once the automatic load count reaches the cap.
    /// There is no way back to automatic mode.
    pub fn record_auto_loads(&mut self, auto_load_count: u32) {
        if self.mode == FeedMode::Auto && auto_load_count >= self.auto_load_cap {
            info!(
                auto_loads = auto_load_count,
                "Automatic loading capped, switching to manual"
            );
            self.mode = FeedMode::Manual;
        }
    }

    pub fn should_fire<T>(&self, distance: usize, state: &FeedState<T>) -> bool {
        self.mode == FeedMode::Auto
            && state.has_more
            && !state.loading
            && state.error.is_none()
            && self.is_in_view(distance)
    }
}
