//! Monotonic keys used to order overlapping [`crate::channel::Channel`]
//! waiters on the same reply method id (spec.md §3, §9).
//!
//! A `UniqueId` is `(wall-clock ms, sequence)`. Ordering only needs to break
//! ties between ids minted in the same millisecond; it is not meant to
//! survive a process restart.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// A FIFO tie-breaking key: the oldest `UniqueId` sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct UniqueId {
    millis: u64,
    sequence: u64,
}

/// Per-connection generator: if `now` equals the previously stored
/// millisecond, bump `sequence`; otherwise reset it to zero.
#[derive(Debug, Default)]
pub(crate) struct UniqueIdGenerator {
    last: Mutex<(u64, u64)>,
}

impl UniqueIdGenerator {
    pub(crate) fn next(&self) -> UniqueId {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0);
        let mut last = self.last.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let sequence = if last.0 == now { last.1 + 1 } else { 0 };
        *last = (now, sequence);
        UniqueId { millis: now, sequence }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_minted_in_order_compare_in_order() {
        let gen = UniqueIdGenerator::default();
        let a = gen.next();
        let b = gen.next();
        assert!(a <= b);
    }
}
