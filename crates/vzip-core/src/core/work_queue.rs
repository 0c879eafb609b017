use std::sync::atomic::{AtomicUsize, Ordering};

use crate::types::FrameId;

/// Shared cursor handing out frame ids `0..len` in ascending order.
///
/// Every id is returned by exactly one [`claim_next`](Self::claim_next) call,
/// no matter how many threads race on the queue.
#[derive(Debug)]
pub struct WorkQueue {
    next: AtomicUsize,
    len: usize,
}

impl WorkQueue {
    pub fn new(len: usize) -> Self {
        Self {
            next: AtomicUsize::new(0),
            len,
        }
    }

    /// Claims the next unclaimed frame, or `None` once all frames are handed out.
    pub fn claim_next(&self) -> Option<FrameId> {
        // Bounded increment so the cursor never moves past `len`.
        self.next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |next| {
                (next < self.len).then_some(next + 1)
            })
            .ok()
            .map(FrameId)
    }

    /// Number of frames not yet claimed.
    pub fn remaining(&self) -> usize {
        self.len.saturating_sub(self.claimed())
    }

    /// Number of frames already claimed.
    pub fn claimed(&self) -> usize {
        self.next.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_in_order_then_stops() {
        let queue = WorkQueue::new(3);
        assert_eq!(queue.claim_next(), Some(FrameId(0)));
        assert_eq!(queue.claim_next(), Some(FrameId(1)));
        assert_eq!(queue.remaining(), 1);
        assert_eq!(queue.claim_next(), Some(FrameId(2)));
        assert_eq!(queue.claim_next(), None);
        assert_eq!(queue.claim_next(), None);
        assert_eq!(queue.claimed(), 3);
    }

    #[test]
    fn empty_queue_yields_nothing() {
        let queue = WorkQueue::new(0);
        assert!(queue.is_empty());
        assert_eq!(queue.claim_next(), None);
        assert_eq!(queue.claimed(), 0);
    }
}
