//! Query coordination: debounces configuration edits, keeps at most one
//! search in flight and delivers only the result of the winning search.
//!
//! Every edit arms a debounce ticket. When the quiescence window expires the
//! newest ticket either replays the base set (empty query) or starts a search,
//! superseding whatever was running. Superseded searches are dropped
//! silently; they never show up on the result stream, not even as errors.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::Stream;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::cancellation::{SearchGeneration, SearchGuard};
use crate::entry::{Entry, FieldMode, SearchConfiguration};
use crate::metrics::{metric_names, MetricsRegistry};
use crate::processor::process;
use crate::store::StoreError;

/// Where the coordinator sends searches.
#[async_trait]
pub trait SearchBackend: Send + Sync + 'static {
    async fn search(
        &self,
        term: &str,
        mode: FieldMode,
        limit: usize,
    ) -> Result<Vec<Entry>, StoreError>;
}

#[async_trait]
impl<T: SearchBackend + ?Sized> SearchBackend for Arc<T> {
    async fn search(
        &self,
        term: &str,
        mode: FieldMode,
        limit: usize,
    ) -> Result<Vec<Entry>, StoreError> {
        (**self).search(term, mode, limit).await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CoordinatorOptions {
    /// Quiescence window before an edit is acted upon.
    pub debounce: Duration,
    /// Maximum rows requested per search.
    pub result_limit: usize,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            result_limit: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchOrigin {
    /// Produced by a store search.
    Search,
    /// Replayed from the base set because the query was empty.
    Discovery,
}

/// One delivered, post-processed result set.
#[derive(Debug, Clone, Serialize)]
pub struct ResultBatch {
    pub request_id: Uuid,
    pub generation: u64,
    pub origin: BatchOrigin,
    /// Configuration the entries were processed with.
    pub config: SearchConfiguration,
    pub entries: Vec<Entry>,
}

#[derive(Debug, Error)]
#[error("search for {query:?} failed: {source}")]
pub struct SearchFailure {
    pub request_id: Uuid,
    pub query: String,
    #[source]
    pub source: StoreError,
}

pub type SearchOutcome = Result<ResultBatch, SearchFailure>;

/// Single-consumer stream of search outcomes, in delivery order.
pub struct ResultStream {
    rx: mpsc::UnboundedReceiver<SearchOutcome>,
}

impl ResultStream {
    /// Wait for the next outcome. `None` once the coordinator is gone.
    pub async fn recv(&mut self) -> Option<SearchOutcome> {
        self.rx.recv().await
    }

    /// Next outcome if one is already queued.
    pub fn try_recv(&mut self) -> Option<SearchOutcome> {
        self.rx.try_recv().ok()
    }
}

impl Stream for ResultStream {
    type Item = SearchOutcome;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

struct DebounceState {
    ticket: u64,
    last_seen: Instant,
}

/// What a debounce ticket turned into once its window expired.
enum Settled {
    Dropped,
    Replayed,
    Search(SearchGuard),
}

/// Owns "the current search". Cheap to clone; clones share state.
pub struct QueryCoordinator<B: SearchBackend> {
    inner: Arc<Inner<B>>,
}

impl<B: SearchBackend> Clone for QueryCoordinator<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<B> {
    backend: B,
    options: CoordinatorOptions,
    debounce: Mutex<DebounceState>,
    generation: SearchGeneration,
    base_set: RwLock<Vec<Entry>>,
    tx: mpsc::UnboundedSender<SearchOutcome>,
    metrics: Arc<MetricsRegistry>,
}

impl<B: SearchBackend> QueryCoordinator<B> {
    pub fn new(
        backend: B,
        options: CoordinatorOptions,
        metrics: Arc<MetricsRegistry>,
    ) -> (Self, ResultStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        let inner = Inner {
            backend,
            options,
            debounce: Mutex::new(DebounceState {
                ticket: 0,
                last_seen: Instant::now(),
            }),
            generation: SearchGeneration::new(),
            base_set: RwLock::new(Vec::new()),
            tx,
            metrics,
        };
        (
            Self {
                inner: Arc::new(inner),
            },
            ResultStream { rx },
        )
    }

    /// Register a configuration edit. Must be called from within a Tokio
    /// runtime; the edit is acted upon after the debounce window unless a
    /// newer edit arrives first.
    pub fn on_configuration_changed(&self, config: SearchConfiguration) {
        let ticket = self.inner.arm();
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.options.debounce).await;
            match inner.settle(ticket, &config) {
                Settled::Dropped | Settled::Replayed => {}
                Settled::Search(guard) => inner.run_search(guard, config).await,
            }
        });
    }

    /// Cancel the active search and any pending edit without emitting output.
    pub fn cancel(&self) {
        let mut debounce = self.inner.debounce.lock();
        debounce.ticket += 1;
        if self.inner.generation.cancel() {
            debug!("active search cancelled");
        }
    }

    /// Replace the set replayed for empty queries.
    pub fn set_base_set(&self, entries: Vec<Entry>) {
        debug!(count = entries.len(), "base set updated");
        *self.inner.base_set.write() = entries;
    }

    /// Deliver the base set processed with `config` right away, superseding
    /// any running search. Pending edits still settle afterwards.
    pub fn show_base_set(&self, config: &SearchConfiguration) {
        let _debounce = self.inner.debounce.lock();
        self.inner.replay_base_set(config);
    }

    pub fn base_set(&self) -> Vec<Entry> {
        self.inner.base_set.read().clone()
    }

    /// True while a search is running and has not been superseded.
    pub fn is_searching(&self) -> bool {
        self.inner.generation.has_active()
    }

    pub fn options(&self) -> CoordinatorOptions {
        self.inner.options
    }
}

impl<B: SearchBackend> Inner<B> {
    fn arm(&self) -> u64 {
        let mut debounce = self.debounce.lock();
        debounce.ticket += 1;
        debounce.last_seen = Instant::now();
        debounce.ticket
    }

    /// Decide what `ticket` becomes. Runs under the debounce lock so the
    /// newest edit always starts after any older one.
    fn settle(&self, ticket: u64, config: &SearchConfiguration) -> Settled {
        let debounce = self.debounce.lock();
        let quiet_for = debounce.last_seen.elapsed();
        if debounce.ticket != ticket || quiet_for < self.options.debounce {
            self.metrics.increment(metric_names::DEBOUNCE_DROPPED);
            trace!(ticket, latest = debounce.ticket, "debounced edit dropped");
            return Settled::Dropped;
        }

        if config.is_discovery() {
            self.replay_base_set(config);
            return Settled::Replayed;
        }

        let guard = self.generation.begin();
        self.metrics.increment(metric_names::SEARCHES_ISSUED);
        Settled::Search(guard)
    }

    fn replay_base_set(&self, config: &SearchConfiguration) {
        let base = self.base_set.read().clone();
        let entries = process(base, config);
        self.generation.supersede(|| {
            let batch = ResultBatch {
                request_id: Uuid::new_v4(),
                generation: self.generation.current_generation(),
                origin: BatchOrigin::Discovery,
                config: config.clone(),
                entries,
            };
            debug!(
                request_id = %batch.request_id,
                count = batch.entries.len(),
                idiom_only = config.idiom_only,
                "base set replayed"
            );
            self.deliver(Ok(batch));
        });
    }

    async fn run_search(&self, guard: SearchGuard, config: SearchConfiguration) {
        let request_id = Uuid::new_v4();
        let generation = guard.my_generation();
        let term = config.trimmed_query().to_string();
        let started = Instant::now();

        debug!(
            %request_id,
            generation,
            query = %term,
            mode = %config.field_mode,
            "search issued"
        );

        let result = tokio::select! {
            result = self.backend.search(&term, config.field_mode, self.options.result_limit) => result,
            _ = guard.token().cancelled() => {
                self.metrics.increment(metric_names::SEARCHES_SUPERSEDED);
                debug!(%request_id, generation, "search superseded before completion");
                return;
            }
        };

        if !guard.should_continue() {
            self.metrics.increment(metric_names::SEARCHES_SUPERSEDED);
            debug!(%request_id, generation, "search superseded, result dropped");
            return;
        }

        let outcome = match result {
            Ok(raw) => {
                let span = self.metrics.span(metric_names::PROCESS);
                let entries = process(raw, &config);
                span.finish();
                Ok(ResultBatch {
                    request_id,
                    generation,
                    origin: BatchOrigin::Search,
                    config,
                    entries,
                })
            }
            Err(source) => {
                warn!(%request_id, generation, query = %term, error = %source, "search failed");
                Err(SearchFailure {
                    request_id,
                    query: term,
                    source,
                })
            }
        };

        match self.generation.finish(&guard, || self.deliver(outcome)) {
            Some(_) => {
                let elapsed_us = started.elapsed().as_micros() as f64;
                self.metrics.record(metric_names::SEARCH_ROUNDTRIP, elapsed_us);
                debug!(%request_id, generation, elapsed_us, "search delivered");
            }
            None => {
                self.metrics.increment(metric_names::SEARCHES_SUPERSEDED);
                debug!(%request_id, generation, "search superseded, result dropped");
            }
        }
    }

    fn deliver(&self, outcome: SearchOutcome) {
        if self.tx.send(outcome).is_err() {
            warn!("result stream closed, outcome dropped");
            return;
        }
        self.metrics.increment(metric_names::BATCHES_DELIVERED);
    }
}
