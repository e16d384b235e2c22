//! Glossary session: wires the repository to the query coordinator and owns
//! the load lifecycle (initialize → count → discovery sample).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::Settings;
use crate::coordinator::{QueryCoordinator, ResultStream};
use crate::entry::{Entry, SearchConfiguration};
use crate::lifecycle::{InvalidTransition, Lifecycle, LoadState};
use crate::metrics::MetricsRegistry;
use crate::repository::GlossaryRepository;
use crate::store::{EntryStore, StoreError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The session was in a state that does not accept this step, e.g. a
    /// second load while one is running, or a shutdown during the load.
    #[error("session {0}")]
    Lifecycle(#[from] InvalidTransition),
}

pub struct GlossarySession {
    repository: GlossaryRepository,
    coordinator: QueryCoordinator<GlossaryRepository>,
    lifecycle: Lifecycle,
    current: Mutex<SearchConfiguration>,
    total_entries: AtomicUsize,
    discovery_size: usize,
    metrics: Arc<MetricsRegistry>,
}

impl GlossarySession {
    pub fn new(settings: &Settings) -> (Self, ResultStream) {
        let metrics = Arc::new(MetricsRegistry::new());
        let repository = GlossaryRepository::new(
            EntryStore::new(settings.database_path.clone()),
            settings.result_limit,
            Arc::clone(&metrics),
        );
        let (coordinator, stream) = QueryCoordinator::new(
            repository.clone(),
            settings.coordinator_options(),
            Arc::clone(&metrics),
        );
        let session = Self {
            repository,
            coordinator,
            lifecycle: Lifecycle::new(),
            current: Mutex::new(SearchConfiguration::default()),
            total_entries: AtomicUsize::new(0),
            discovery_size: settings.discovery_size,
            metrics,
        };
        (session, stream)
    }

    /// Open the store, read its size and draw the first discovery sample.
    /// On failure the session moves to `Failed` with a user-visible message.
    /// Once ready, the sample is published on the result stream if the
    /// current query is empty.
    pub async fn load(&self) -> Result<usize, SessionError> {
        self.lifecycle.transition(LoadState::Loading)?;

        let total = match self.load_inner().await {
            Ok(total) => total,
            Err(e) => {
                warn!(error = %e, "glossary load failed");
                if let Err(rejected) = self.lifecycle.fail(format!("failed to load dictionary: {e}")) {
                    // Shut down mid-load.
                    self.repository.close();
                    warn!(error = %rejected, "load failure not recorded");
                }
                return Err(e.into());
            }
        };

        if let Err(e) = self.lifecycle.transition(LoadState::Ready) {
            // A shutdown raced the load and the store may have been reopened.
            self.repository.close();
            return Err(e.into());
        }
        info!(total, "glossary loaded");
        self.publish_discovery();
        Ok(total)
    }

    async fn load_inner(&self) -> Result<usize, StoreError> {
        self.repository.initialize().await?;
        let total = self.repository.total_count().await?;
        self.total_entries.store(total, Ordering::SeqCst);
        self.draw_discovery().await?;
        Ok(total)
    }

    /// Re-run the load from scratch. Valid from `Failed` or `Closed`.
    pub async fn retry(&self) -> Result<usize, SessionError> {
        self.load().await
    }

    /// Draw a fresh discovery sample and make it the base set.
    pub async fn reshuffle(&self) -> Result<Vec<Entry>, StoreError> {
        let entries = self.draw_discovery().await?;
        self.publish_discovery();
        Ok(entries)
    }

    async fn draw_discovery(&self) -> Result<Vec<Entry>, StoreError> {
        let entries = self.repository.random_entries(self.discovery_size).await?;
        self.coordinator.set_base_set(entries.clone());
        Ok(entries)
    }

    fn publish_discovery(&self) {
        let config = self.current.lock().clone();
        if config.is_discovery() {
            self.coordinator.show_base_set(&config);
        }
    }

    /// Forward a configuration edit to the coordinator.
    pub fn update(&self, config: SearchConfiguration) {
        *self.current.lock() = config.clone();
        self.coordinator.on_configuration_changed(config);
    }

    /// The current discovery sample.
    pub fn discovery(&self) -> Vec<Entry> {
        self.coordinator.base_set()
    }

    pub fn is_searching(&self) -> bool {
        self.coordinator.is_searching()
    }

    pub fn total_entries(&self) -> usize {
        self.total_entries.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> LoadState {
        self.lifecycle.current()
    }

    pub fn last_error(&self) -> Option<String> {
        self.lifecycle.last_error()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.lifecycle.subscribe()
    }

    pub fn repository(&self) -> &GlossaryRepository {
        &self.repository
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Stop any search in flight and release the store. The state moves to
    /// `Closed` before the store closes, so a load still running either
    /// sees the closed store or fails its `Ready` transition and closes it.
    pub fn shutdown(&self) {
        self.coordinator.cancel();
        if let Err(e) = self.lifecycle.transition(LoadState::Closed) {
            warn!(error = %e, "shutdown transition rejected");
        }
        self.repository.close();
    }
}
