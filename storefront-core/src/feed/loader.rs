use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use super::merge::merge;
use super::source::{PageSource, SourceError};
use super::state::{more_available, FeedError, FeedState, FeedView};
use super::trigger::{FeedMode, VisibilityTrigger};
use super::{FeedConfig, Identified};
use crate::query::{Page, PageRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The sentinel scrolled into view.
    Auto,
    /// The reader asked for more.
    Manual,
    /// A scheduled retry; treated like a manual request.
    Retry,
}

/// Outcome of asking the loader for the next page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Started { page: usize },
    /// A request is already in flight.
    InFlight,
    /// An automatic request came too soon after the previous attempt.
    Debounced,
    /// The sentinel is out of range or the trigger is not armed.
    Idle,
    EndOfFeed,
    Unmounted,
}

impl Dispatch {
    pub fn is_started(&self) -> bool {
        matches!(self, Dispatch::Started { .. })
    }
}

enum LoaderEvent<T> {
    Completed {
        request_id: u64,
        trigger: Trigger,
        page: usize,
        result: Result<Page<T>, SourceError>,
    },
    RetryDue {
        timer_id: u64,
    },
}

struct InFlight {
    request_id: u64,
    handle: JoinHandle<()>,
}

/// Aborts the fetch task when the task waiting on it is aborted.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

struct PendingRetry {
    timer_id: u64,
    handle: JoinHandle<()>,
}

/// Loads a collection page by page behind an infinitely scrolling list.
///
/// The loader is owned by a single view. Fetches and retry timers run as
/// tokio tasks and report back over a channel; nothing touches the state
/// until the owner drains that channel with [`pump`](Self::pump) or
/// [`settle`](Self::settle), so every transition happens on the owner's
/// side. At most one page request is in flight at any time.
pub struct FeedLoader<T> {
    source: Arc<dyn PageSource<T>>,
    collection: String,
    config: FeedConfig,
    state: FeedState<T>,
    trigger: VisibilityTrigger,
    in_flight: Option<InFlight>,
    pending_retry: Option<PendingRetry>,
    last_attempt: Option<Instant>,
    next_id: u64,
    mounted: bool,
    events_tx: mpsc::UnboundedSender<LoaderEvent<T>>,
    events_rx: mpsc::UnboundedReceiver<LoaderEvent<T>>,
}

impl<T> FeedLoader<T>
where
    T: Identified + Send + 'static,
{
    /// Mount a feed on `seed`, the first page of `collection`.
    pub fn mount(
        source: Arc<dyn PageSource<T>>,
        collection: impl Into<String>,
        seed: Page<T>,
        config: FeedConfig,
    ) -> Self {
        let collection = collection.into();
        let state = FeedState::seeded(seed);
        let trigger = VisibilityTrigger::new(config.sentinel_margin, config.auto_load_cap);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        info!(
            collection = %collection,
            seeded = state.items.len(),
            has_more = state.has_more,
            "Feed mounted"
        );
        Self {
            source,
            collection,
            config,
            state,
            trigger,
            in_flight: None,
            pending_retry: None,
            last_attempt: None,
            next_id: 1,
            mounted: true,
            events_tx,
            events_rx,
        }
    }

    pub fn state(&self) -> &FeedState<T> {
        &self.state
    }

    pub fn view(&self) -> FeedView<'_, T> {
        FeedView {
            items: &self.state.items,
            loading: self.state.loading,
            error: self.state.error.as_ref(),
            has_more: self.state.has_more,
            mode: self.trigger.mode(),
        }
    }

    pub fn mode(&self) -> FeedMode {
        self.trigger.mode()
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// True while a request is in flight or a retry is scheduled.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some() || self.pending_retry.is_some()
    }

    /// Request the page at the cursor unless one is already in flight or,
    /// for automatic triggers, the last attempt was too recent.
    pub fn request_next_page(&mut self, trigger: Trigger) -> Dispatch {
        if !self.mounted {
            return Dispatch::Unmounted;
        }
        if self.state.loading {
            debug!(collection = %self.collection, ?trigger, "Request skipped, already loading");
            return Dispatch::InFlight;
        }
        if trigger == Trigger::Auto {
            if let Some(last) = self.last_attempt {
                if last.elapsed() < self.config.debounce() {
                    debug!(collection = %self.collection, "Automatic request debounced");
                    return Dispatch::Debounced;
                }
            }
        }

        if let Some(previous) = self.in_flight.take() {
            debug!(request_id = previous.request_id, "Aborting superseded request");
            previous.handle.abort();
        }
        self.cancel_pending_retry();

        let request_id = self.allocate_id();
        let page = self.state.cursor;
        let request = PageRequest::new(self.collection.clone(), page, self.config.page_size);

        self.state.loading = true;
        self.state.error = None;
        self.last_attempt = Some(Instant::now());

        debug!(collection = %self.collection, page, ?trigger, request_id, "Requesting page");

        let source = Arc::clone(&self.source);
        let tx = self.events_tx.clone();
        let handle = tokio::spawn(async move {
            let fetch = tokio::spawn(async move { source.fetch_page(request).await });
            let _abort = AbortOnDrop(fetch.abort_handle());
            let result = match fetch.await {
                Ok(result) => result,
                Err(err) if err.is_panic() => {
                    warn!(request_id, page, "Page source panicked");
                    Err(SourceError::Panicked)
                }
                Err(_) => Err(SourceError::Cancelled),
            };
            // The receiver is gone only once the loader itself is dropped.
            let _ = tx.send(LoaderEvent::Completed {
                request_id,
                trigger,
                page,
                result,
            });
        });
        self.in_flight = Some(InFlight { request_id, handle });

        Dispatch::Started { page }
    }

    /// The sentinel is `distance` rows below the viewport.
    pub fn on_sentinel(&mut self, distance: usize) -> Dispatch {
        if !self.mounted {
            return Dispatch::Unmounted;
        }
        if self.trigger.should_fire(distance, &self.state) {
            self.request_next_page(Trigger::Auto)
        } else {
            Dispatch::Idle
        }
    }

    /// The "load more" control.
    pub fn trigger_manual_load(&mut self) -> Dispatch {
        if self.mounted && !self.state.has_more {
            return Dispatch::EndOfFeed;
        }
        self.request_next_page(Trigger::Manual)
    }

    /// Start over on the current page after a failure.
    pub fn retry(&mut self) -> Dispatch {
        if !self.mounted {
            return Dispatch::Unmounted;
        }
        if self.state.loading {
            return Dispatch::InFlight;
        }
        self.cancel_pending_retry();
        self.state.retry_count = 0;
        self.state.error = None;
        info!(collection = %self.collection, page = self.state.cursor, "Retrying on request");
        self.request_next_page(Trigger::Manual)
    }

    /// Apply every event that has already arrived. Returns how many there were.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    /// Wait for the next event and apply it. Returns `false` without
    /// waiting when no request or retry is outstanding.
    pub async fn settle(&mut self) -> bool {
        if !self.mounted || !self.is_busy() {
            return false;
        }
        match self.events_rx.recv().await {
            Some(event) => {
                self.apply(event);
                true
            }
            None => false,
        }
    }

    /// Settle until no request or retry is outstanding.
    pub async fn run_until_idle(&mut self) {
        while self.settle().await {}
    }

    /// Tear the feed down. Outstanding work is aborted and nothing that
    /// arrives afterwards touches the state.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        self.abort_tasks();
        info!(collection = %self.collection, "Feed unmounted");
    }

    fn apply(&mut self, event: LoaderEvent<T>) {
        if !self.mounted {
            return;
        }
        match event {
            LoaderEvent::Completed {
                request_id,
                trigger,
                page,
                result,
            } => {
                let current = matches!(&self.in_flight, Some(f) if f.request_id == request_id);
                if !current {
                    debug!(request_id, page, "Discarding stale completion");
                    return;
                }
                self.in_flight = None;
                self.state.loading = false;

                match result {
                    Ok(fetched) => self.on_success(trigger, page, fetched),
                    Err(SourceError::Cancelled) => {
                        debug!(collection = %self.collection, page, "Request cancelled");
                    }
                    Err(err) => self.on_failure(page, err),
                }
            }
            LoaderEvent::RetryDue { timer_id } => {
                let due = matches!(&self.pending_retry, Some(r) if r.timer_id == timer_id);
                if !due {
                    return;
                }
                self.pending_retry = None;
                self.request_next_page(Trigger::Retry);
            }
        }
    }

    fn on_success(&mut self, trigger: Trigger, page: usize, fetched: Page<T>) {
        self.state.retry_count = 0;

        if fetched.items.is_empty() {
            self.state.has_more = false;
            info!(collection = %self.collection, page, "Reached end of feed");
            return;
        }

        let before = self.state.items.len();
        let items = std::mem::take(&mut self.state.items);
        self.state.items = merge(items, fetched.items);
        self.state.cursor += 1;
        self.state.has_more =
            more_available(fetched.has_more, self.state.items.len(), fetched.total);

        if trigger == Trigger::Auto {
            self.state.auto_load_count += 1;
            self.trigger.record_auto_loads(self.state.auto_load_count);
        }

        debug!(
            collection = %self.collection,
            page,
            added = self.state.items.len() - before,
            total = self.state.items.len(),
            has_more = self.state.has_more,
            "Page merged"
        );
    }

    fn on_failure(&mut self, page: usize, err: SourceError) {
        let message = format!("Couldn't load more items: {}", err);

        if self.state.retry_count < self.config.max_retries {
            let delay = self.config.backoff_delay(self.state.retry_count);
            self.state.retry_count += 1;
            warn!(
                collection = %self.collection,
                page,
                error = %err,
                attempt = self.state.retry_count,
                retry_in_ms = delay.as_millis() as u64,
                "Page fetch failed, retrying"
            );
            self.state.error = Some(FeedError::FetchFailed {
                message,
                retry_in: delay,
            });
            self.schedule_retry(delay);
        } else {
            warn!(
                collection = %self.collection,
                page,
                error = %err,
                "Page fetch failed, giving up until retried"
            );
            self.state.has_more = false;
            self.state.error = Some(FeedError::Exhausted { message });
        }
    }

    fn schedule_retry(&mut self, delay: Duration) {
        self.cancel_pending_retry();
        let timer_id = self.allocate_id();
        let tx = self.events_tx.clone();
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            let _ = tx.send(LoaderEvent::RetryDue { timer_id });
        });
        self.pending_retry = Some(PendingRetry { timer_id, handle });
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl<T> FeedLoader<T> {
    fn cancel_pending_retry(&mut self) {
        if let Some(retry) = self.pending_retry.take() {
            retry.handle.abort();
        }
    }

    fn abort_tasks(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.handle.abort();
        }
        self.cancel_pending_retry();
    }
}

impl<T> Drop for FeedLoader<T> {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{FETCH_DEBOUNCE_MS, MAX_RETRY_ATTEMPTS, SENTINEL_MARGIN};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: u32,
    }

    impl Identified for Item {
        type Id = u32;

        fn id(&self) -> &u32 {
            &self.id
        }
    }

    /// A paged source over `total` items with knobs for latency, failures
    /// and overlapping pages.
    struct MockSource {
        total: u32,
        latency: Duration,
        /// Fail this many calls before succeeding.
        failures: AtomicUsize,
        /// Shift every page this many items back so pages overlap.
        overlap: u32,
        report_total: bool,
        cancel: bool,
        calls: AtomicUsize,
        completed: AtomicUsize,
        active: AtomicUsize,
        max_active: AtomicUsize,
        requested_pages: Mutex<Vec<usize>>,
    }

    impl MockSource {
        fn new(total: u32) -> Self {
            Self {
                total,
                latency: Duration::from_millis(50),
                failures: AtomicUsize::new(0),
                overlap: 0,
                report_total: true,
                cancel: false,
                calls: AtomicUsize::new(0),
                completed: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
                requested_pages: Mutex::new(Vec::new()),
            }
        }

        fn failing(total: u32, failures: usize) -> Self {
            let source = Self::new(total);
            source.failures.store(failures, Ordering::SeqCst);
            source
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn pages(&self) -> Vec<usize> {
            self.requested_pages.lock().unwrap().clone()
        }

        fn page_of(&self, page: usize, page_size: usize) -> Page<Item> {
            let page_size = page_size as u32;
            let start = ((page as u32 - 1) * page_size).saturating_sub(self.overlap);
            let end = (start + page_size).min(self.total);
            Page {
                items: (start..end).map(|i| Item { id: i + 1 }).collect(),
                page,
                page_size: page_size as usize,
                has_more: end < self.total,
                total: self.report_total.then_some(self.total as usize),
            }
        }
    }

    #[async_trait]
    impl PageSource<Item> for MockSource {
        async fn fetch_page(&self, request: PageRequest) -> Result<Page<Item>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requested_pages.lock().unwrap().push(request.page);
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(active, Ordering::SeqCst);

            if !self.latency.is_zero() {
                sleep(self.latency).await;
            }

            self.active.fetch_sub(1, Ordering::SeqCst);
            self.completed.fetch_add(1, Ordering::SeqCst);

            if self.cancel {
                return Err(SourceError::Cancelled);
            }
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(SourceError::Transport("connection reset".into()));
            }
            Ok(self.page_of(request.page, request.page_size))
        }
    }

    fn mount(source: &Arc<MockSource>, config: FeedConfig) -> FeedLoader<Item> {
        let seed = source.page_of(1, config.page_size);
        FeedLoader::mount(source.clone(), "featured", seed, config)
    }

    fn ids(loader: &FeedLoader<Item>) -> Vec<u32> {
        loader.state().items.iter().map(|i| i.id).collect()
    }

    async fn past_debounce() {
        tokio::time::advance(Duration::from_millis(FETCH_DEBOUNCE_MS)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn twenty_items_in_three_pages() {
        let source = Arc::new(MockSource::new(20));
        let mut loader = mount(&source, FeedConfig::default());
        assert_eq!(loader.state().items.len(), 8);

        assert_eq!(loader.on_sentinel(0), Dispatch::Started { page: 2 });
        assert!(loader.settle().await);
        assert_eq!(loader.state().items.len(), 16);
        assert!(loader.state().has_more);

        past_debounce().await;
        assert_eq!(loader.on_sentinel(0), Dispatch::Started { page: 3 });
        assert!(loader.settle().await);

        let state = loader.state();
        assert_eq!(state.items.len(), 20);
        assert!(!state.has_more);
        assert_eq!(state.auto_load_count, 2);
        assert_eq!(state.cursor, 4);
        assert_eq!(ids(&loader), (1..=20).collect::<Vec<_>>());
    }

    #[tokio::test(start_paused = true)]
    async fn cursor_advances_once_per_successful_page() {
        let source = Arc::new(MockSource::new(200));
        let mut loader = mount(&source, FeedConfig::default());

        for n in 1..=5 {
            assert!(loader.trigger_manual_load().is_started());
            loader.run_until_idle().await;
            assert_eq!(loader.state().cursor, 2 + n);
        }
        assert_eq!(source.pages(), vec![2, 3, 4, 5, 6]);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_pages_never_duplicate() {
        let mut source = MockSource::new(40);
        source.overlap = 3;
        let source = Arc::new(source);
        let mut loader = mount(&source, FeedConfig::default());

        while loader.trigger_manual_load().is_started() {
            loader.run_until_idle().await;
        }

        let ids = ids(&loader);
        let mut unique = ids.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(ids.len(), unique.len());
        assert_eq!(ids, (1..=40).collect::<Vec<_>>());
    }

    #[tokio::test(start_paused = true)]
    async fn single_flight_under_repeated_triggers() {
        let source = Arc::new(MockSource::new(64));
        let mut loader = mount(&source, FeedConfig::default());

        for _ in 0..4 {
            assert!(loader.trigger_manual_load().is_started());
            for _ in 0..5 {
                assert_eq!(loader.trigger_manual_load(), Dispatch::InFlight);
                assert_eq!(loader.request_next_page(Trigger::Auto), Dispatch::InFlight);
                assert_eq!(loader.on_sentinel(0), Dispatch::Idle);
            }
            assert!(loader.view().loading);
            loader.run_until_idle().await;
        }

        assert_eq!(source.calls(), 4);
        assert_eq!(source.max_active.load(Ordering::SeqCst), 1);
        assert_eq!(source.pages(), vec![2, 3, 4, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn automatic_triggers_are_debounced() {
        let mut source = MockSource::new(100);
        source.latency = Duration::ZERO;
        let source = Arc::new(source);
        let mut loader = mount(&source, FeedConfig::default());

        assert!(loader.on_sentinel(0).is_started());
        loader.run_until_idle().await;

        tokio::time::advance(Duration::from_millis(499)).await;
        assert_eq!(loader.on_sentinel(0), Dispatch::Debounced);
        assert_eq!(source.calls(), 1);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(loader.on_sentinel(0).is_started());
        loader.run_until_idle().await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_triggers_bypass_debounce() {
        let mut source = MockSource::new(100);
        source.latency = Duration::ZERO;
        let source = Arc::new(source);
        let mut loader = mount(&source, FeedConfig::default());

        assert!(loader.on_sentinel(0).is_started());
        loader.run_until_idle().await;
        assert!(loader.trigger_manual_load().is_started());
        loader.run_until_idle().await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_back_off_then_give_up() {
        let source = Arc::new(MockSource::failing(40, usize::MAX));
        let mut loader = mount(&source, FeedConfig::default());

        assert!(loader.trigger_manual_load().is_started());
        assert!(loader.settle().await);
        assert_eq!(source.calls(), 1);
        let error = loader.state().error.clone().unwrap();
        assert_eq!(error.code(), "fetch_failed");
        assert_eq!(
            error,
            FeedError::FetchFailed {
                message: "Couldn't load more items: Transport error: connection reset".into(),
                retry_in: Duration::from_millis(1000),
            }
        );
        assert!(!loader.state().loading);
        assert_eq!(loader.state().retry_count, 1);

        // First retry fires after one second.
        let failed_at = Instant::now();
        assert!(loader.settle().await);
        let waited = failed_at.elapsed();
        assert!(waited >= Duration::from_millis(1000) && waited < Duration::from_millis(1100));
        assert!(loader.state().loading);
        assert!(loader.state().error.is_none());
        assert!(loader.settle().await);
        assert_eq!(source.calls(), 2);
        assert_eq!(loader.state().retry_count, 2);

        // Second retry after one and a half.
        let failed_at = Instant::now();
        assert!(loader.settle().await);
        let waited = failed_at.elapsed();
        assert!(waited >= Duration::from_millis(1500) && waited < Duration::from_millis(1600));
        assert!(loader.settle().await);
        assert_eq!(source.calls(), 1 + MAX_RETRY_ATTEMPTS as usize);

        let state = loader.state();
        assert!(!state.has_more);
        assert!(!state.loading);
        assert!(state.error.as_ref().unwrap().is_exhausted());
        assert!(!loader.is_busy());

        // Nothing else happens on its own.
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(loader.pump(), 0);
        assert_eq!(source.calls(), 3);
        assert_eq!(loader.on_sentinel(0), Dispatch::Idle);
        assert_eq!(loader.trigger_manual_load(), Dispatch::EndOfFeed);

        // An explicit retry issues exactly one request.
        assert_eq!(loader.retry(), Dispatch::Started { page: 2 });
        assert_eq!(loader.state().retry_count, 0);
        assert!(loader.state().error.is_none());
        assert!(loader.settle().await);
        assert_eq!(source.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn recovery_resets_retry_count() {
        let source = Arc::new(MockSource::failing(40, 1));
        let mut loader = mount(&source, FeedConfig::default());

        assert!(loader.trigger_manual_load().is_started());
        loader.run_until_idle().await;

        let state = loader.state();
        assert_eq!(source.calls(), 2);
        assert_eq!(state.retry_count, 0);
        assert!(state.error.is_none());
        assert_eq!(state.items.len(), 16);
        assert_eq!(state.cursor, 3);
        // A retried page is not an automatic load.
        assert_eq!(state.auto_load_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_exhaustion_can_succeed() {
        let source = Arc::new(MockSource::failing(20, 3));
        let mut loader = mount(&source, FeedConfig::default());

        assert!(loader.trigger_manual_load().is_started());
        loader.run_until_idle().await;
        assert!(!loader.state().has_more);

        assert!(loader.retry().is_started());
        loader.run_until_idle().await;

        let state = loader.state();
        assert!(state.error.is_none());
        assert!(state.has_more);
        assert_eq!(state.items.len(), 16);
        assert_eq!(source.pages(), vec![2, 2, 2, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_retry_replaces_scheduled_one() {
        let source = Arc::new(MockSource::failing(40, 1));
        let mut loader = mount(&source, FeedConfig::default());

        assert!(loader.trigger_manual_load().is_started());
        assert!(loader.settle().await);
        assert!(loader.state().error.is_some());

        assert!(loader.retry().is_started());
        loader.run_until_idle().await;
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(loader.pump(), 0);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn end_of_feed_is_permanent() {
        let mut source = MockSource::new(12);
        source.report_total = false;
        let source = Arc::new(source);
        let mut loader = mount(&source, FeedConfig::default());

        assert!(loader.on_sentinel(0).is_started());
        loader.run_until_idle().await;
        assert_eq!(loader.state().items.len(), 12);
        assert!(!loader.state().has_more);

        for _ in 0..3 {
            past_debounce().await;
            assert_eq!(loader.on_sentinel(0), Dispatch::Idle);
        }
        assert_eq!(loader.trigger_manual_load(), Dispatch::EndOfFeed);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_batch_ends_the_feed() {
        // Claims more but the next page is empty.
        struct Hollow;

        #[async_trait]
        impl PageSource<Item> for Hollow {
            async fn fetch_page(&self, request: PageRequest) -> Result<Page<Item>, SourceError> {
                Ok(Page {
                    items: Vec::new(),
                    page: request.page,
                    page_size: request.page_size,
                    has_more: true,
                    total: None,
                })
            }
        }

        let seed = Page {
            items: vec![Item { id: 1 }],
            page: 1,
            page_size: 8,
            has_more: true,
            total: None,
        };
        let mut loader = FeedLoader::mount(Arc::new(Hollow), "featured", seed, FeedConfig::default());

        assert!(loader.on_sentinel(0).is_started());
        loader.run_until_idle().await;
        assert!(!loader.state().has_more);
        assert_eq!(loader.state().cursor, 2);
        assert_eq!(loader.state().items.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn switches_to_manual_after_three_auto_loads() {
        let source = Arc::new(MockSource::new(100));
        let mut loader = mount(&source, FeedConfig::default());

        for expected in 1..=3 {
            assert_eq!(loader.mode(), FeedMode::Auto);
            assert!(loader.on_sentinel(0).is_started());
            loader.run_until_idle().await;
            assert_eq!(loader.state().auto_load_count, expected);
            past_debounce().await;
        }

        assert_eq!(loader.mode(), FeedMode::Manual);
        assert_eq!(loader.view().mode, FeedMode::Manual);
        assert_eq!(loader.on_sentinel(0), Dispatch::Idle);
        assert_eq!(source.calls(), 3);

        assert!(loader.trigger_manual_load().is_started());
        loader.run_until_idle().await;
        assert_eq!(source.calls(), 4);
        assert_eq!(loader.state().auto_load_count, 3);
        assert_eq!(loader.mode(), FeedMode::Manual);
    }

    #[tokio::test(start_paused = true)]
    async fn sentinel_out_of_range_does_nothing() {
        let source = Arc::new(MockSource::new(100));
        let mut loader = mount(&source, FeedConfig::default());

        assert_eq!(loader.on_sentinel(SENTINEL_MARGIN + 1), Dispatch::Idle);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unmount_mid_request_is_silent() {
        let mut source = MockSource::new(100);
        source.latency = Duration::from_secs(2);
        let source = Arc::new(source);
        let mut loader = mount(&source, FeedConfig::default());

        assert!(loader.trigger_manual_load().is_started());
        tokio::time::advance(Duration::from_millis(100)).await;
        loader.unmount();

        let items_before = loader.state().items.len();
        let cursor_before = loader.state().cursor;

        tokio::time::advance(Duration::from_secs(5)).await;
        tokio::task::yield_now().await;
        assert_eq!(loader.pump(), 0);
        assert!(!loader.settle().await);

        let state = loader.state();
        assert!(state.error.is_none());
        assert_eq!(state.items.len(), items_before);
        assert_eq!(state.cursor, cursor_before);
        assert_eq!(source.completed.load(Ordering::SeqCst), 0);
        assert_eq!(loader.trigger_manual_load(), Dispatch::Unmounted);
        assert_eq!(loader.retry(), Dispatch::Unmounted);
    }

    #[tokio::test(start_paused = true)]
    async fn unmount_cancels_scheduled_retry() {
        let source = Arc::new(MockSource::failing(40, usize::MAX));
        let mut loader = mount(&source, FeedConfig::default());

        assert!(loader.trigger_manual_load().is_started());
        assert!(loader.settle().await);
        loader.unmount();

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(loader.pump(), 0);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_fetch_is_not_an_error() {
        let mut source = MockSource::new(40);
        source.cancel = true;
        let source = Arc::new(source);
        let mut loader = mount(&source, FeedConfig::default());

        assert!(loader.trigger_manual_load().is_started());
        loader.run_until_idle().await;

        let state = loader.state();
        assert!(state.error.is_none());
        assert!(!state.loading);
        assert_eq!(state.retry_count, 0);
        assert!(state.has_more);
        assert_eq!(state.cursor, 2);
        assert!(!loader.is_busy());
        assert_eq!(source.calls(), 1);
    }

    struct PanickingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageSource<Item> for PanickingSource {
        async fn fetch_page(&self, _request: PageRequest) -> Result<Page<Item>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            panic!("catalog backend blew up");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_source_fails_like_any_other_error() {
        let source = Arc::new(PanickingSource {
            calls: AtomicUsize::new(0),
        });
        let seed = Page {
            items: vec![Item { id: 1 }],
            page: 1,
            page_size: 8,
            has_more: true,
            total: None,
        };
        let mut loader = FeedLoader::mount(source.clone(), "featured", seed, FeedConfig::default());

        assert!(loader.trigger_manual_load().is_started());
        loader.run_until_idle().await;

        let state = loader.state();
        assert!(!state.loading);
        assert!(!state.has_more);
        assert!(state.error.as_ref().is_some_and(FeedError::is_exhausted));
        assert_eq!(
            source.calls.load(Ordering::SeqCst),
            1 + MAX_RETRY_ATTEMPTS as usize
        );
        assert!(!loader.is_busy());

        assert!(loader.retry().is_started());
    }
}
