//! Circuit Breaker: counts consecutive dial failures and triggers a
//! debounced rebuild of the HTTP Client Instance.

use std::{
    sync::atomic::{AtomicU32, Ordering},
    time::{Duration, Instant},
};

use tokio::sync::Mutex;

/// Three consecutive failures trip the breaker.
const TRIP_THRESHOLD: u32 = 3;

/// A reset within this window of the previous one is debounced away.
const DEBOUNCE_WINDOW: Duration = Duration::from_secs(5);

/// Backoff paused after a real rebuild, before the next dial may proceed.
pub(crate) const RESET_BACKOFF: Duration = Duration::from_secs(1);

/// What the caller should do after reporting a dial outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    /// Stay on the current instance.
    None,
    /// Rebuild the instance: this is a real reset, not a debounced one.
    Rebuild,
    /// A reset was triggered but debounced; no rebuild needed.
    Debounced,
}

/// The consecutive-failure counter, last-reset timestamp, and guarding
/// mutex modeled as one type so the state machine's invariants (the
/// counter only resets to zero together with a decision, the timestamp is
/// only touched while holding the mutex) live in a single place.
pub(crate) struct CircuitBreaker {
    consecutive_failures: AtomicU32,
    last_reset: Mutex<Instant>,
}

impl CircuitBreaker {
    pub(crate) fn new() -> Self {
        Self {
            consecutive_failures: AtomicU32::new(0),
            last_reset: Mutex::new(Instant::now() - DEBOUNCE_WINDOW - Duration::from_secs(1)),
        }
    }

    /// Called on every successful dial: resets the counter to zero.
    pub(crate) fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
    }

    pub(crate) fn failure_count(&self) -> u32 {
        self.consecutive_failures.load(Ordering::SeqCst)
    }

    /// Called on a dial failure that counts toward the breaker. Returns the
    /// `Action` the caller must perform: increment first, decide whether the
    /// trip threshold was just crossed, and — if so — acquire the mutex to
    /// decide between a debounced no-op and a real rebuild.
    pub(crate) async fn record_failure(&self) -> Action {
        let count = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        log::warn!("phoenix: circuit breaker consecutive failure count is now {count}");

        if count < TRIP_THRESHOLD {
            return Action::None;
        }

        let mut last_reset = self.last_reset.lock().await;
        let now = Instant::now();

        if now.duration_since(*last_reset) < DEBOUNCE_WINDOW {
            log::info!("phoenix: reset debounced (last rebuild was {:?} ago)", now.duration_since(*last_reset));
            self.consecutive_failures.store(0, Ordering::SeqCst);
            Action::Debounced
        } else {
            *last_reset = now;
            self.consecutive_failures.store(0, Ordering::SeqCst);
            log::warn!("phoenix: circuit breaker tripped, rebuilding HTTP client instance");
            Action::Rebuild
        }
    }
}
