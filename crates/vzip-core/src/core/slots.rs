use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;

use crate::VzipError;
use crate::types::{FrameId, Result};

#[derive(Debug)]
enum SlotState {
    Pending,
    Ready(Bytes),
    Failed,
    Cancelled,
    Taken,
}

/// Single-write, single-read handoff cell for one encoded frame.
///
/// A worker publishes exactly once; the writer takes exactly once. The writer
/// sleeps on the condition variable until the slot leaves the pending state.
#[derive(Debug)]
pub struct FrameSlot {
    state: Mutex<SlotState>,
    ready: Condvar,
}

impl Default for FrameSlot {
    fn default() -> Self {
        Self {
            state: Mutex::new(SlotState::Pending),
            ready: Condvar::new(),
        }
    }
}

impl FrameSlot {
    /// Stores the payload and wakes the writer.
    ///
    /// Returns `false` when the slot was already resolved (cancelled or
    /// published); the payload is dropped in that case.
    pub fn publish(&self, payload: Bytes) -> bool {
        self.resolve(SlotState::Ready(payload))
    }

    /// Marks the frame as failed so the writer aborts on it.
    pub fn fail(&self) -> bool {
        self.resolve(SlotState::Failed)
    }

    pub fn cancel(&self) -> bool {
        self.resolve(SlotState::Cancelled)
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.lock(), SlotState::Pending)
    }

    /// Blocks until the slot is resolved and takes the payload.
    ///
    /// With a timeout, a slot still pending after `timeout` yields
    /// [`VzipError::SlotTimeout`] and stays pending.
    pub fn wait_take(&self, frame: FrameId, timeout: Option<Duration>) -> Result<Bytes> {
        let guard = self.lock();
        let mut guard = match timeout {
            None => self
                .ready
                .wait_while(guard, |state| matches!(state, SlotState::Pending))
                .unwrap_or_else(PoisonError::into_inner),
            Some(limit) => {
                let (guard, _) = self
                    .ready
                    .wait_timeout_while(guard, limit, |state| {
                        matches!(state, SlotState::Pending)
                    })
                    .unwrap_or_else(PoisonError::into_inner);
                if matches!(*guard, SlotState::Pending) {
                    return Err(VzipError::SlotTimeout {
                        frame,
                        waited: limit,
                    });
                }
                guard
            }
        };

        match std::mem::replace(&mut *guard, SlotState::Taken) {
            SlotState::Ready(payload) => Ok(payload),
            SlotState::Failed => Err(VzipError::FrameFailed { frame }),
            SlotState::Cancelled => Err(VzipError::Cancelled),
            SlotState::Pending | SlotState::Taken => {
                Err(VzipError::InvalidFormat("frame slot consumed twice"))
            }
        }
    }

    fn resolve(&self, next: SlotState) -> bool {
        let mut state = self.lock();
        if !matches!(*state, SlotState::Pending) {
            return false;
        }
        *state = next;
        drop(state);
        self.ready.notify_one();
        true
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One [`FrameSlot`] per output position.
#[derive(Debug)]
pub struct FrameSlots {
    slots: Box<[FrameSlot]>,
}

impl FrameSlots {
    pub fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| FrameSlot::default()).collect(),
        }
    }

    pub fn get(&self, frame: FrameId) -> Option<&FrameSlot> {
        self.slots.get(frame.index())
    }

    /// Slot for `frame`, failing for ids outside the run.
    pub fn slot(&self, frame: FrameId) -> Result<&FrameSlot> {
        self.get(frame)
            .ok_or(VzipError::InvalidFormat("frame id out of range"))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Cancels every slot that has not been resolved yet; returns how many.
    pub fn cancel_pending(&self) -> usize {
        self.slots.iter().filter(|slot| slot.cancel()).count()
    }
}
