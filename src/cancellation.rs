//! Search cancellation: CancellationToken + generation guard.
//! Ensures a superseded search can never deliver its results.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Tracks the single active search. Each new search advances the generation,
/// cancels the previous token and becomes the active one.
pub struct SearchGeneration {
    active: Mutex<Option<CancellationToken>>,
    generation: Arc<AtomicU64>,
}

impl SearchGeneration {
    pub fn new() -> Self {
        Self {
            active: Mutex::new(None),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Cancel the active search (if any), advance the generation and register
    /// a fresh token as active.
    pub fn begin(&self) -> SearchGuard {
        let mut active = self.active.lock();
        if let Some(previous) = active.take() {
            previous.cancel();
        }
        let token = CancellationToken::new();
        *active = Some(token.clone());
        let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        SearchGuard {
            generation: Arc::clone(&self.generation),
            my_generation,
            token,
        }
    }

    /// Run `deliver` only if `guard` is still the active search, clearing it.
    /// Holds the lock while delivering so a newer search cannot slip in between.
    pub fn finish<R>(&self, guard: &SearchGuard, deliver: impl FnOnce() -> R) -> Option<R> {
        let mut active = self.active.lock();
        if !guard.is_current() || active.is_none() {
            return None;
        }
        *active = None;
        Some(deliver())
    }

    /// Supersede whatever is active and run `deliver` in its place.
    /// Used for output that does not need a search at all.
    pub fn supersede<R>(&self, deliver: impl FnOnce() -> R) -> R {
        let mut active = self.active.lock();
        if let Some(previous) = active.take() {
            previous.cancel();
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
        deliver()
    }

    /// Cancel the active search without starting another.
    /// Returns whether a search was active.
    pub fn cancel(&self) -> bool {
        let mut active = self.active.lock();
        self.generation.fetch_add(1, Ordering::SeqCst);
        match active.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn has_active(&self) -> bool {
        self.active.lock().is_some()
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

impl Default for SearchGeneration {
    fn default() -> Self {
        Self::new()
    }
}

/// Held by a running search; checked before its results are delivered.
#[derive(Clone)]
pub struct SearchGuard {
    generation: Arc<AtomicU64>,
    my_generation: u64,
    token: CancellationToken,
}

impl SearchGuard {
    /// Returns true if no newer search has started since this one.
    #[inline]
    pub fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.my_generation
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns true if the search should keep going.
    #[inline]
    pub fn should_continue(&self) -> bool {
        !self.is_cancelled() && self.is_current()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn my_generation(&self) -> u64 {
        self.my_generation
    }
}
