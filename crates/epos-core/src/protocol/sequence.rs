//! Request-id counter for executors that correlate replies.
//!
//! An executor that forwards commands over a byte stream (for example the
//! bridge's remote relay) may have several commands in flight at once, and a
//! discovery subscription that keeps replying long after it was issued.  Each
//! outbound request is tagged with an id from a [`SequenceCounter`] and every
//! reply echoes it, so the reply can be routed to the right handler.
//!
//! Ids start at 1; id 0 is never issued, so an agent may use it for
//! unsolicited notices that belong to no request.

use std::sync::atomic::{AtomicU64, Ordering};

/// A thread-safe, monotonically increasing source of request ids.
///
/// # Examples
///
/// ```rust
/// use epos_core::protocol::SequenceCounter;
///
/// let ids = SequenceCounter::new();
/// assert_eq!(ids.next(), 1);
/// assert_eq!(ids.next(), 2);
/// ```
#[derive(Debug)]
pub struct SequenceCounter {
    inner: AtomicU64,
}

impl SequenceCounter {
    /// Creates a counter whose first id is 1.
    pub fn new() -> Self {
        Self {
            inner: AtomicU64::new(1),
        }
    }

    /// Returns the next id.
    ///
    /// Skips 0 if the counter ever wraps around `u64::MAX`.
    pub fn next(&self) -> u64 {
        // Relaxed: ids only need uniqueness, not cross-thread ordering.
        let id = self.inner.fetch_add(1, Ordering::Relaxed);
        if id == 0 {
            self.inner.fetch_add(1, Ordering::Relaxed)
        } else {
            id
        }
    }

    /// Returns the id the next call to [`next`](Self::next) would hand out,
    /// without consuming it.  Diagnostics only.
    pub fn peek(&self) -> u64 {
        self.inner.load(Ordering::Relaxed)
    }
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_first_id_is_one() {
        let ids = SequenceCounter::new();
        assert_eq!(ids.next(), 1);
    }

    #[test]
    fn test_peek_does_not_consume() {
        // Arrange
        let ids = SequenceCounter::new();
        ids.next();

        // Act
        let peeked = ids.peek();

        // Assert
        assert_eq!(peeked, 2);
        assert_eq!(ids.next(), 2);
    }

    #[test]
    fn test_wraparound_skips_zero() {
        // Arrange – one step before overflow
        let ids = SequenceCounter {
            inner: AtomicU64::new(u64::MAX),
        };

        // Act
        let last = ids.next();
        let wrapped = ids.next();

        // Assert
        assert_eq!(last, u64::MAX);
        assert_eq!(wrapped, 1, "id 0 is reserved and must be skipped");
    }

    #[test]
    fn test_ids_are_unique_across_threads() {
        // Arrange
        let ids = Arc::new(SequenceCounter::new());

        // Act
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = Arc::clone(&ids);
                thread::spawn(move || (0..500).map(|_| ids.next()).collect::<Vec<_>>())
            })
            .collect();
        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().expect("thread panicked"))
            .collect();

        // Assert
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 2000);
        assert!(!all.contains(&0));
    }
}
