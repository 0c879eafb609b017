use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::VzipError;
use crate::core::slots::FrameSlots;
use crate::telemetry::tags;

/// Shared stop flag for one pipeline run.
///
/// The first primary error raised is kept for the caller; follow-up failures
/// such as cancelled slots only replace it while no primary error is stored.
/// Raising the signal cancels every pending slot of the attached run so a
/// writer blocked on a slot wakes up immediately.
///
/// Clones share state, so a caller can keep one and [`cancel`](Self::cancel)
/// a run from another thread.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    inner: Arc<AbortInner>,
}

#[derive(Debug, Default)]
struct AbortInner {
    raised: AtomicBool,
    error: Mutex<Option<VzipError>>,
    slots: Mutex<Option<Arc<FrameSlots>>>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops the run with [`VzipError::Cancelled`].
    pub fn cancel(&self) {
        self.raise(VzipError::Cancelled);
    }

    /// Stops the run, recording `error` unless a primary error is already stored.
    pub fn raise(&self, error: VzipError) {
        {
            let mut stored = lock(&self.inner.error);
            let replace = match stored.as_ref() {
                None => true,
                Some(existing) => existing.is_secondary() && !error.is_secondary(),
            };
            if replace {
                tracing::debug!(
                    target: tags::TARGET_PIPELINE,
                    error = %error,
                    "pipeline abort raised"
                );
                *stored = Some(error);
            }
        }
        self.inner.raised.store(true, Ordering::Release);
        self.cancel_attached();
    }

    pub fn is_raised(&self) -> bool {
        self.inner.raised.load(Ordering::Acquire)
    }

    /// Takes the recorded error, leaving the flag raised.
    pub fn take_error(&self) -> Option<VzipError> {
        lock(&self.inner.error).take()
    }

    /// Binds the slots of a starting run.
    pub(crate) fn attach(&self, slots: Arc<FrameSlots>) {
        *lock(&self.inner.slots) = Some(slots);
        // A cancel that landed before the run started still has to release the writer.
        if self.is_raised() {
            self.cancel_attached();
        }
    }

    pub(crate) fn detach(&self) {
        lock(&self.inner.slots).take();
    }

    fn cancel_attached(&self) {
        let slots = lock(&self.inner.slots).clone();
        if let Some(slots) = slots {
            let cancelled = slots.cancel_pending();
            if cancelled > 0 {
                tracing::trace!(
                    target: tags::TARGET_PIPELINE,
                    cancelled,
                    "cancelled pending frame slots"
                );
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
