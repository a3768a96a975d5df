use std::sync::Arc;

use storefront_core::{
    CollectionSummary, Dispatch, FeedConfig, FeedLoader, PageRequest, Product,
};

use crate::client::{CatalogClient, ClientPages};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Collections,
    Feed,
}

pub struct App {
    client: Arc<dyn CatalogClient>,
    feed_config: FeedConfig,
    pub screen: Screen,
    pub collections: Vec<CollectionSummary>,
    pub collection_selected: usize,
    pub feed: Option<FeedLoader<Product>>,
    pub selected: usize,
    /// Product rows that fit in the list, as of the last draw.
    pub viewport_rows: usize,
    pub status_message: String,
    pub loading: bool,
    pub should_quit: bool,
}

impl App {
    pub fn new(client: Arc<dyn CatalogClient>, feed_config: FeedConfig) -> Self {
        Self {
            client,
            feed_config,
            screen: Screen::Collections,
            collections: Vec::new(),
            collection_selected: 0,
            feed: None,
            selected: 0,
            viewport_rows: 0,
            status_message: String::new(),
            loading: false,
            should_quit: false,
        }
    }

    pub async fn load_collections(&mut self) {
        self.loading = true;
        match self.client.collections().await {
            Ok(collections) => {
                self.collections = collections;
                self.collection_selected = 0;
                self.status_message.clear();
            }
            Err(e) => {
                self.collections.clear();
                self.status_message = format!("Error: {:#}", e);
            }
        }
        self.loading = false;
    }

    /// Open the highlighted collection, seeding its feed with page 1.
    pub async fn open_selected(&mut self) {
        if self.screen != Screen::Collections {
            return;
        }
        let key = match self.collections.get(self.collection_selected) {
            Some(summary) => summary.key.clone(),
            None => return,
        };

        self.loading = true;
        let request = PageRequest::new(key.as_str(), 1, self.feed_config.page_size);
        match self.client.page(request).await {
            Ok(seed) => {
                let source = Arc::new(ClientPages(self.client.clone()));
                self.feed = Some(FeedLoader::mount(
                    source,
                    key,
                    seed,
                    self.feed_config.clone(),
                ));
                self.selected = 0;
                self.screen = Screen::Feed;
                self.status_message.clear();
            }
            Err(e) => {
                self.status_message = format!("Error opening {}: {}", key, e);
            }
        }
        self.loading = false;
    }

    pub fn go_back(&mut self) {
        if let Some(mut feed) = self.feed.take() {
            feed.unmount();
        }
        self.screen = Screen::Collections;
        self.selected = 0;
        self.status_message.clear();
    }

    pub fn item_count(&self) -> usize {
        match self.screen {
            Screen::Collections => self.collections.len(),
            Screen::Feed => self
                .feed
                .as_ref()
                .map_or(0, |feed| feed.state().items.len()),
        }
    }

    pub fn move_up(&mut self) {
        let cursor = self.cursor_mut();
        *cursor = cursor.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        let last = self.item_count().saturating_sub(1);
        let cursor = self.cursor_mut();
        if *cursor < last {
            *cursor += 1;
        }
    }

    pub fn page_up(&mut self) {
        let step = self.viewport_rows.max(1);
        let cursor = self.cursor_mut();
        *cursor = cursor.saturating_sub(step);
    }

    pub fn page_down(&mut self) {
        let step = self.viewport_rows.max(1);
        let last = self.item_count().saturating_sub(1);
        let cursor = self.cursor_mut();
        *cursor = (*cursor + step).min(last);
    }

    fn cursor_mut(&mut self) -> &mut usize {
        match self.screen {
            Screen::Collections => &mut self.collection_selected,
            Screen::Feed => &mut self.selected,
        }
    }

    /// Rows between the bottom of the list viewport and the footer row that
    /// follows the last product. Zero while the footer is on screen.
    pub fn sentinel_distance(&self) -> Option<usize> {
        let feed = self.feed.as_ref()?;
        let sentinel = feed.state().items.len();
        let bottom = self.viewport_rows.max(self.selected + 1);
        Some((sentinel + 1).saturating_sub(bottom))
    }

    /// Apply finished fetches, then let the sentinel decide whether the
    /// next page should start loading.
    pub fn tick(&mut self) {
        let applied = match self.feed.as_mut() {
            Some(feed) => feed.pump(),
            None => return,
        };
        if applied > 0 {
            self.status_message.clear();
        }
        // Measured after pumping: a page that just landed pushes the sentinel down.
        let distance = self.sentinel_distance();
        if let (Some(feed), Some(distance)) = (self.feed.as_mut(), distance) {
            feed.on_sentinel(distance);
        }
    }

    pub fn load_more(&mut self) {
        if let Some(feed) = self.feed.as_mut() {
            let dispatch = feed.trigger_manual_load();
            self.report(dispatch);
        }
    }

    pub fn retry(&mut self) {
        if let Some(feed) = self.feed.as_mut() {
            let dispatch = feed.retry();
            self.report(dispatch);
        }
    }

    fn report(&mut self, dispatch: Dispatch) {
        self.status_message = match dispatch {
            Dispatch::Started { page } => format!("Loading page {}", page),
            Dispatch::InFlight => "Already loading".to_string(),
            Dispatch::Debounced => "Slow down".to_string(),
            Dispatch::EndOfFeed => "End of collection".to_string(),
            Dispatch::Idle | Dispatch::Unmounted => String::new(),
        };
    }
}
