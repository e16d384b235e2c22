//! Async facade over the entry store. Store calls block on SQLite, so each
//! one runs on the blocking pool; callers only ever see futures.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::coordinator::SearchBackend;
use crate::entry::{Entry, FieldMode};
use crate::metrics::{metric_names, MetricsRegistry};
use crate::store::{EntryStore, StoreError};

#[derive(Clone)]
pub struct GlossaryRepository {
    store: Arc<EntryStore>,
    result_limit: usize,
    metrics: Arc<MetricsRegistry>,
}

impl GlossaryRepository {
    pub fn new(store: EntryStore, result_limit: usize, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            store: Arc::new(store),
            result_limit,
            metrics,
        }
    }

    pub async fn initialize(&self) -> Result<(), StoreError> {
        self.blocking(|store| store.initialize()).await
    }

    pub async fn total_count(&self) -> Result<usize, StoreError> {
        let span = self.metrics.span(metric_names::STORE_COUNT);
        let count = self.blocking(|store| store.count()).await?;
        span.finish();
        Ok(count)
    }

    pub async fn random_entries(&self, count: usize) -> Result<Vec<Entry>, StoreError> {
        let span = self.metrics.span(metric_names::STORE_RANDOM);
        let entries = self.blocking(move |store| store.random_sample(count)).await?;
        span.finish();
        debug!(requested = count, returned = entries.len(), "random entries loaded");
        Ok(entries)
    }

    /// Search with the configured result cap. A blank query returns nothing
    /// without touching the store.
    pub async fn search(&self, query: &str, mode: FieldMode) -> Result<Vec<Entry>, StoreError> {
        self.search_with_limit(query, mode, self.result_limit).await
    }

    pub async fn search_with_limit(
        &self,
        query: &str,
        mode: FieldMode,
        limit: usize,
    ) -> Result<Vec<Entry>, StoreError> {
        let term = query.trim().to_string();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let span = self.metrics.span(metric_names::STORE_SEARCH);
        let entries = self
            .blocking(move |store| store.search(&term, mode, limit))
            .await?;
        let elapsed_us = span.finish();
        debug!(%mode, limit, returned = entries.len(), elapsed_us, "store search finished");
        Ok(entries)
    }

    pub fn result_limit(&self) -> usize {
        self.result_limit
    }

    pub fn close(&self) {
        self.store.close();
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&EntryStore) -> Result<T, StoreError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref())).await?
    }
}

#[async_trait]
impl SearchBackend for GlossaryRepository {
    async fn search(
        &self,
        term: &str,
        mode: FieldMode,
        limit: usize,
    ) -> Result<Vec<Entry>, StoreError> {
        self.search_with_limit(term, mode, limit).await
    }
}
