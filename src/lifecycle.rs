//! Session lifecycle: Unloaded → Loading → Ready | Failed → Closed.
//! A failed load can be retried; a closed session can be loaded again.

use std::fmt;

use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LoadState {
    Unloaded,
    Loading,
    Ready,
    Failed,
    Closed,
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadState::Unloaded => write!(f, "Unloaded"),
            LoadState::Loading => write!(f, "Loading"),
            LoadState::Ready => write!(f, "Ready"),
            LoadState::Failed => write!(f, "Failed"),
            LoadState::Closed => write!(f, "Closed"),
        }
    }
}

impl LoadState {
    /// Returns whether transitioning from `self` to `next` is valid.
    pub fn can_transition_to(self, next: LoadState) -> bool {
        matches!(
            (self, next),
            (LoadState::Unloaded, LoadState::Loading)
                | (LoadState::Loading, LoadState::Ready)
                | (LoadState::Loading, LoadState::Failed)
                | (LoadState::Failed, LoadState::Loading) // retry
                | (LoadState::Closed, LoadState::Loading) // reopen
                | (_, LoadState::Closed)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: LoadState,
    pub to: LoadState,
}

/// Thread-safe lifecycle with a watch channel for subscribers.
pub struct Lifecycle {
    state: RwLock<LoadState>,
    last_error: RwLock<Option<String>>,
    state_tx: watch::Sender<LoadState>,
}

impl Lifecycle {
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(LoadState::Unloaded);
        Self {
            state: RwLock::new(LoadState::Unloaded),
            last_error: RwLock::new(None),
            state_tx,
        }
    }

    pub fn current(&self) -> LoadState {
        *self.state.read()
    }

    /// Message recorded by the most recent failed load, cleared on success.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    pub fn transition(&self, next: LoadState) -> Result<LoadState, InvalidTransition> {
        let mut state = self.state.write();
        let current = *state;
        if !current.can_transition_to(next) {
            let err = InvalidTransition {
                from: current,
                to: next,
            };
            warn!("{}", err);
            return Err(err);
        }
        *state = next;
        if next == LoadState::Ready {
            *self.last_error.write() = None;
        }
        self.state_tx.send_replace(next);
        info!(from = %current, to = %next, "lifecycle_transition");
        Ok(next)
    }

    /// Move to Failed and remember the user-visible message.
    pub fn fail(&self, message: String) -> Result<LoadState, InvalidTransition> {
        let state = self.transition(LoadState::Failed)?;
        *self.last_error.write() = Some(message);
        Ok(state)
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.state_tx.subscribe()
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
