//! Thread-safe sequence counter for numbering input actions.
//!
//! # What is the sequence number for? (for beginners)
//!
//! Every action a session produces is stamped with the next value of that
//! session's counter before it is handed to the dispatcher.  Because the
//! dispatcher applies actions strictly in queue order, the numbers observed
//! by the injector for one session are always increasing.  That makes
//! ordering bugs visible in logs and gives tests something to assert on.
//!
//! # Thread safety
//!
//! The counter uses `AtomicU64` internally, so two request handlers may call
//! [`SequenceCounter::next`] at the same time without ever receiving the same
//! value.  No lock is taken.

use std::sync::atomic::{AtomicU64, Ordering};

/// A thread-safe, monotonically increasing counter.
///
/// Numbers start at 0 and wrap to 0 after `u64::MAX` without panicking.
///
/// # Examples
///
/// ```rust
/// use trackpad_core::SequenceCounter;
///
/// let counter = SequenceCounter::new();
/// assert_eq!(counter.next(), 0);
/// assert_eq!(counter.next(), 1);
/// assert_eq!(counter.issued(), 2);
/// ```
#[derive(Debug, Default)]
pub struct SequenceCounter {
    inner: AtomicU64,
}

impl SequenceCounter {
    /// Creates a counter whose first value is 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next number and advances the counter.
    ///
    /// `Relaxed` ordering is enough: the value is only an ordering label,
    /// it does not publish any other memory.
    pub fn next(&self) -> u64 {
        self.inner.fetch_add(1, Ordering::Relaxed)
    }

    /// How many numbers have been handed out (the value `next` would return).
    pub fn issued(&self) -> u64 {
        self.inner.load(Ordering::Relaxed)
    }
}
