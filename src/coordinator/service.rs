use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::state::{ProcessingState, ScheduleOutcome};
use crate::cache::ResultCache;
use crate::config::Config;
use crate::constants::{FALLBACK_SCORE, MAX_SCORE};
use crate::extractor::ContentExtractor;
use crate::item::{Item, ItemId, format_context, with_ancestors};
use crate::models::ModelCatalog;
use crate::presentation::{IndicatorSink, IndicatorUpdate};
use crate::ratelimit::RateLimiter;
use crate::rating::{AttemptObserver, RatingError, RatingResult, RetryController, StreamProgress};
use crate::storage::KeyValueStore;
use crate::thread::{ExtendOutcome, ThreadContextAssembler, ThreadMarker};
use crate::transport::{CompletionTransport, RatingRequest};

const PENDING_DESCRIPTION: &str = "Rating in progress...";
const ALLOW_LISTED_DESCRIPTION: &str = "Author is on the allow-list";

/// Marks an item in flight for as long as it lives.
///
/// Dropping it, on success, error, panic, or cancellation, frees the item
/// for a later `schedule`.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<ItemId>>,
    item_id: ItemId,
}

impl<'a> InFlightGuard<'a> {
    fn try_acquire(set: &'a Mutex<HashSet<ItemId>>, item_id: &str) -> Option<Self> {
        set.lock().insert(item_id.to_string()).then(|| Self {
            set,
            item_id: item_id.to_string(),
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.item_id);
    }
}

/// Feeds streaming progress into the cache and the indicator.
struct StreamingObserver<'a> {
    service: &'a PipelineService,
    item_id: &'a str,
    source: &'a str,
}

#[async_trait]
impl AttemptObserver for StreamingObserver<'_> {
    async fn on_attempt_start(&self, attempt: u32) {
        if attempt > 1 && self.service.cache.discard_partial(self.item_id) {
            debug!(item_id = self.item_id, attempt, "dropped partial from previous attempt");
        }
    }

    async fn on_progress(&self, progress: &StreamProgress) {
        let cache = &self.service.cache;
        let wrote = cache.upsert_streaming(
            self.item_id,
            self.source,
            progress.score,
            &progress.accumulated,
        );
        let score = cache.lookup(self.item_id).map(|e| e.score);
        self.service.emit(
            self.item_id,
            score,
            ProcessingState::Streaming,
            &progress.accumulated,
        );
        if wrote {
            cache.persist_debounced().await;
        }
    }
}

/// Owns every piece of shared pipeline state and drives items through it.
///
/// Construct one per process and share it behind an [`Arc`].
pub struct PipelineService {
    config: Config,
    retry: RetryController,
    cache: Arc<ResultCache>,
    threads: ThreadContextAssembler,
    extractor: Arc<dyn ContentExtractor>,
    catalog: Option<Arc<ModelCatalog>>,
    sink: Arc<dyn IndicatorSink>,
    in_flight: Mutex<HashSet<ItemId>>,
    states: RwLock<HashMap<ItemId, ProcessingState>>,
}

impl std::fmt::Debug for PipelineService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineService")
            .field("retry", &self.retry)
            .field("cache", &self.cache)
            .field("in_flight", &self.in_flight.lock().len())
            .finish_non_exhaustive()
    }
}

impl PipelineService {
    pub fn new(
        config: Config,
        transport: Arc<dyn CompletionTransport>,
        store: Arc<dyn KeyValueStore>,
        extractor: Arc<dyn ContentExtractor>,
        sink: Arc<dyn IndicatorSink>,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.min_request_interval));
        let retry = RetryController::new(transport, limiter, &config);
        let cache = Arc::new(ResultCache::new(store, config.persist_interval));
        Self {
            config,
            retry,
            cache,
            threads: ThreadContextAssembler::new(),
            extractor,
            catalog: None,
            sink,
            in_flight: Mutex::new(HashSet::new()),
            states: RwLock::new(HashMap::new()),
        }
    }

    /// Consults `catalog` before attaching media as image parts.
    pub fn with_catalog(mut self, catalog: Arc<ModelCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.retry = self.retry.with_backoff_unit(unit);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn threads(&self) -> &ThreadContextAssembler {
        &self.threads
    }

    pub fn state_of(&self, item_id: &str) -> ProcessingState {
        self.states
            .read()
            .get(item_id)
            .copied()
            .unwrap_or_default()
    }

    pub fn is_in_flight(&self, item_id: &str) -> bool {
        self.in_flight.lock().contains(item_id)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Rates `item` unless a fast path applies, always ending in a settled
    /// state (or [`ScheduleOutcome::Duplicate`] when another attempt owns it).
    pub async fn schedule(&self, item: Item) -> ScheduleOutcome {
        let item_id = item.id.clone();

        if self.config.is_allow_listed(&item.author_handle) {
            debug!(item_id = %item_id, author = %item.author_handle, "allow-listed author");
            self.emit(
                &item_id,
                Some(MAX_SCORE),
                ProcessingState::AllowListed,
                ALLOW_LISTED_DESCRIPTION,
            );
            return ScheduleOutcome::AllowListed { score: MAX_SCORE };
        }

        if let Some(entry) = self.cache.lookup_final(&item_id) {
            debug!(item_id = %item_id, score = entry.score, "cache hit");
            self.emit(
                &item_id,
                Some(entry.score),
                ProcessingState::Cached,
                &entry.description,
            );
            return ScheduleOutcome::Cached(entry);
        }

        // Claimed before the first await so a second discovery of the same
        // item cannot slip in during the debounce.
        let Some(_in_flight) = InFlightGuard::try_acquire(&self.in_flight, &item_id) else {
            debug!(item_id = %item_id, "already in flight");
            return ScheduleOutcome::Duplicate;
        };

        self.emit(&item_id, None, ProcessingState::Pending, PENDING_DESCRIPTION);
        tokio::time::sleep(self.config.schedule_debounce).await;

        match self.run_pipeline(&item).await {
            Ok((result, source)) if result.is_success() => {
                let score = result.score.unwrap_or(FALLBACK_SCORE);
                self.cache
                    .finalize(&item_id, &source, score, &result.content)
                    .await;
                info!(item_id = %item_id, score, attempts = result.attempts, "item rated");
                self.emit(&item_id, Some(score), ProcessingState::Rated, &result.content);
                ScheduleOutcome::Rated(result)
            }
            Ok((result, _)) => self.fail(&item_id, result),
            Err(e) => {
                let result = RatingResult::failure(e.to_string(), 0);
                self.fail(&item_id, result)
            }
        }
    }

    /// Runs [`schedule`](Self::schedule) on its own task.
    pub fn spawn_schedule(self: &Arc<Self>, item: Item) -> JoinHandle<ScheduleOutcome> {
        let service = Arc::clone(self);
        tokio::spawn(async move { service.schedule(item).await })
    }

    /// Brings the thread context of `item`'s conversation up to date and
    /// returns the ancestor context a reply should be rated with.
    ///
    /// Roots start their conversation and have no ancestors. For a reply whose
    /// root has not been seen, the root is fetched through the extractor.
    /// Extension stops at `item` itself, and nothing appended at or after it
    /// is part of its ancestors.
    pub async fn advance_thread(&self, item: &Item) -> Option<String> {
        let conversation_id = item.conversation_id.as_deref()?;
        if item.is_thread_root() {
            self.threads.observe_root(item);
            return None;
        }

        if self.threads.marker(conversation_id) == ThreadMarker::Absent {
            match self.extractor.extract(conversation_id).await {
                Ok(root) => {
                    self.threads.observe_root(&root);
                }
                Err(e) => {
                    warn!(conversation_id, error = %e, "thread root unavailable");
                }
            }
        }

        loop {
            match self
                .threads
                .extend(conversation_id, self.extractor.as_ref(), &self.cache)
                .await
            {
                Ok(ExtendOutcome::Appended { reply_id, .. }) if reply_id == item.id => break,
                Ok(ExtendOutcome::Appended { .. }) => continue,
                Ok(_) => break,
                Err(e) => {
                    warn!(conversation_id, error = %e, "thread extension failed");
                    break;
                }
            }
        }

        self.threads.context_before(conversation_id, &item.id)
    }

    /// Persists the cache regardless of debounce state.
    pub async fn flush(&self) {
        if let Err(e) = self.cache.persist().await {
            warn!(error = %e, "failed to persist rating cache");
        }
    }

    async fn run_pipeline(&self, item: &Item) -> Result<(RatingResult, String), RatingError> {
        let api_key = self
            .config
            .api_key()
            .ok_or(RatingError::MissingCredential)?;
        if item.is_empty() {
            return Err(RatingError::context_unavailable(format!(
                "item {} has no text or media",
                item.id
            )));
        }

        let ancestors = match &item.parent_context {
            Some(context) => Some(context.clone()),
            None if !item.is_thread_root() => self.advance_thread(item).await,
            None => None,
        };
        let source = with_ancestors(ancestors.as_deref(), &format_context(item));
        let image_urls = self.image_urls(item).await;
        let request = RatingRequest::build(&self.config, &source, image_urls);

        let observer = StreamingObserver {
            service: self,
            item_id: &item.id,
            source: &source,
        };
        let result = self.retry.run(&request, api_key, &observer).await;
        Ok((result, source))
    }

    async fn image_urls(&self, item: &Item) -> Vec<String> {
        let media = item.all_media();
        if !self.config.enable_images || media.is_empty() {
            return Vec::new();
        }
        let Some(catalog) = &self.catalog else {
            return Vec::new();
        };
        if !catalog.supports_images(&self.config.model_id).await {
            debug!(model = %self.config.model_id, "model does not accept images");
            return Vec::new();
        }
        media.into_iter().map(str::to_string).collect()
    }

    fn fail(&self, item_id: &str, result: RatingResult) -> ScheduleOutcome {
        if self.cache.discard_partial(item_id) {
            debug!(item_id, "discarded partial rating");
        }
        warn!(item_id, error = %result.content, "item rating failed");
        self.emit(
            item_id,
            Some(FALLBACK_SCORE),
            ProcessingState::Error,
            &result.content,
        );
        ScheduleOutcome::Failed(result)
    }

    fn emit(&self, item_id: &str, score: Option<u32>, state: ProcessingState, description: &str) {
        self.states.write().insert(item_id.to_string(), state);
        self.sink
            .on_indicator_update(&IndicatorUpdate::new(item_id, score, state, description));
    }
}
