//! In-flight counter for host busy-state feedback.
//!
//! The host shows a spinner while any summarization is running. The count is
//! process-wide state, but it is never a global: the host creates one
//! [`InFlightCounter`] at start-up and hands an `Arc` of it to every
//! [`crate::summarize::Summarizer`].
//!
//! Increments and decrements are single atomic operations, so concurrent runs
//! cannot lose updates even though the host normally serialises commands.
//! A run holds an [`InFlightGuard`] for as long as it is in the running state;
//! dropping the guard is the only way to decrement, which covers early
//! returns, errors and unwinding alike.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Key under which the host keeps its general processing counter.
pub const PROCESSING_STATE_KEY: &str = "processingState.general";

/// Receives every change of the in-flight count.
///
/// Called synchronously from the thread that changed the count (including
/// from `Drop`), so implementations must not block.
pub trait BusyIndicator: Send + Sync {
    fn publish(&self, key: &str, in_flight: usize);
}

/// Indicator for hosts that poll [`InFlightCounter::current`] instead.
#[derive(Debug, Default)]
pub struct NoopBusyIndicator;

impl BusyIndicator for NoopBusyIndicator {
    fn publish(&self, _key: &str, _in_flight: usize) {}
}

/// Atomic count of running summarizations.
pub struct InFlightCounter {
    count: AtomicUsize,
    indicator: Arc<dyn BusyIndicator>,
}

impl InFlightCounter {
    pub fn new(indicator: Arc<dyn BusyIndicator>) -> Self {
        Self {
            count: AtomicUsize::new(0),
            indicator,
        }
    }

    /// Current number of runs in flight.
    pub fn current(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Enter the running state; the count drops again when the guard does.
    pub fn acquire(self: &Arc<Self>) -> InFlightGuard {
        let now = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        self.indicator.publish(PROCESSING_STATE_KEY, now);
        InFlightGuard {
            counter: Arc::clone(self),
        }
    }

    fn release(&self) {
        // Never wraps below zero.
        let prev = self
            .count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| Some(c.saturating_sub(1)))
            .unwrap_or(0);
        self.indicator
            .publish(PROCESSING_STATE_KEY, prev.saturating_sub(1));
    }
}

impl Default for InFlightCounter {
    fn default() -> Self {
        Self::new(Arc::new(NoopBusyIndicator))
    }
}

impl fmt::Debug for InFlightCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlightCounter")
            .field("count", &self.current())
            .finish()
    }
}

/// Scoped membership in the in-flight count.
#[must_use = "the run is only counted while the guard is alive"]
pub struct InFlightGuard {
    counter: Arc<InFlightCounter>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.counter.release();
    }
}

impl fmt::Debug for InFlightGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlightGuard").finish_non_exhaustive()
    }
}
