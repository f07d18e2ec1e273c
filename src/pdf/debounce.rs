//! Single-slot cancel-and-reschedule timer
//!
//! Only the most recent value armed within the quiet period survives; arming
//! again replaces the pending value and pushes the deadline out. The timer
//! owns no thread: the owner waits until [`Debouncer::deadline`] and then
//! calls [`Debouncer::fire`].

use std::time::{Duration, Instant};

/// Default quiet period before a viewport change is acted upon
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(20);

#[derive(Debug)]
struct Pending<T> {
    value: T,
    deadline: Instant,
}

/// Cancel-and-reschedule timer holding at most one pending value
#[derive(Debug)]
pub struct Debouncer<T> {
    quiet: Duration,
    pending: Option<Pending<T>>,
}

impl<T> Debouncer<T> {
    #[must_use]
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    #[must_use]
    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// Arm the timer with `value`, cancelling any pending value.
    ///
    /// Returns the superseded value, if one was pending.
    pub fn arm(&mut self, value: T, now: Instant) -> Option<T> {
        let previous = self.pending.replace(Pending {
            value,
            deadline: now + self.quiet,
        });
        previous.map(|p| p.value)
    }

    /// Cancel the pending value without firing it
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.value)
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending value becomes due
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Take the pending value if its deadline has passed
    pub fn fire(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some(p) if p.deadline <= now => self.pending.take().map(|p| p.value),
            _ => None,
        }
    }
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}
