use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};

use crate::telemetry;
use crate::telemetry::tags;

/// A pool of reusable frame buffers.
///
/// Every buffer is created with room for one full frame, so a worker that
/// reuses a recycled buffer never reallocates while reading or encoding. The
/// pool never blocks: when it is empty a fresh buffer is allocated, and when
/// it is full a returned buffer is simply freed.
///
/// # Example
/// ```
/// use vzip_core::BufferPool;
///
/// let pool = BufferPool::new(4096, 8);
/// let mut buffer = pool.acquire();
/// buffer.extend_from_slice(b"frame");
/// drop(buffer); // returns to the pool
/// assert_eq!(pool.metrics().created, 1);
/// ```
#[derive(Debug)]
pub struct BufferPool {
    recycler: Sender<Vec<u8>>,
    receiver: Receiver<Vec<u8>>,
    frame_capacity: usize,
    max_buffers: usize,
    metrics: Arc<PoolMetricsInner>,
}

impl BufferPool {
    /// Creates a pool whose buffers hold `frame_capacity` bytes and which
    /// retains at most `max_buffers` idle buffers.
    pub fn new(frame_capacity: usize, max_buffers: usize) -> Self {
        let (tx, rx) = bounded(max_buffers.max(1));
        Self {
            recycler: tx,
            receiver: rx,
            frame_capacity,
            max_buffers: max_buffers.max(1),
            metrics: Arc::new(PoolMetricsInner::default()),
        }
    }

    /// Acquires an empty buffer, recycled when one is available.
    pub fn acquire(&self) -> PooledBuffer {
        let buffer = match self.receiver.try_recv() {
            Ok(mut buffer) => {
                buffer.clear();
                self.metrics.recycled.fetch_add(1, Ordering::Relaxed);
                telemetry::increment_counter(tags::METRIC_BUFFER_ACQUIRE_RECYCLED_COUNT, 1);
                buffer
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {
                self.metrics.created.fetch_add(1, Ordering::Relaxed);
                telemetry::increment_counter(tags::METRIC_BUFFER_ACQUIRE_CREATED_COUNT, 1);
                tracing::trace!(
                    target: tags::TARGET_BUFFER,
                    capacity = self.frame_capacity,
                    "allocated frame buffer"
                );
                Vec::with_capacity(self.frame_capacity)
            }
        };

        PooledBuffer::new(buffer, self.recycler.clone(), Arc::clone(&self.metrics))
    }

    /// Returns a snapshot of the current pool metrics.
    pub fn metrics(&self) -> PoolMetricsSnapshot {
        PoolMetricsSnapshot {
            created: self.metrics.created.load(Ordering::Relaxed),
            recycled: self.metrics.recycled.load(Ordering::Relaxed),
            dropped: self.metrics.dropped.load(Ordering::Relaxed),
        }
    }

    /// Capacity every newly created buffer starts with.
    pub fn frame_capacity(&self) -> usize {
        self.frame_capacity
    }

    /// Maximum number of idle buffers the pool retains.
    pub fn max_buffers(&self) -> usize {
        self.max_buffers
    }
}

/// A snapshot of buffer pool metrics at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolMetricsSnapshot {
    /// Number of buffers created by the pool
    pub created: usize,
    /// Number of buffers successfully recycled
    pub recycled: usize,
    /// Number of buffers dropped (pool full)
    pub dropped: usize,
}

#[derive(Debug, Default)]
struct PoolMetricsInner {
    created: AtomicUsize,
    recycled: AtomicUsize,
    dropped: AtomicUsize,
}

/// A buffer allocated from a [`BufferPool`].
///
/// Returned to the pool when dropped. Derefs to the underlying `Vec<u8>`.
#[derive(Debug)]
pub struct PooledBuffer {
    buffer: Vec<u8>,
    recycler: Sender<Vec<u8>>,
    metrics: Arc<PoolMetricsInner>,
}

impl PooledBuffer {
    fn new(buffer: Vec<u8>, recycler: Sender<Vec<u8>>, metrics: Arc<PoolMetricsInner>) -> Self {
        Self {
            buffer,
            recycler,
            metrics,
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn as_mut_vec(&mut self) -> &mut Vec<u8> {
        &mut self.buffer
    }
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buffer
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let buffer = std::mem::take(&mut self.buffer);
        match self.recycler.try_send(buffer) {
            Ok(()) => {
                telemetry::increment_counter(tags::METRIC_BUFFER_RECYCLE_OK_COUNT, 1);
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.metrics.dropped.fetch_add(1, Ordering::Relaxed);
                telemetry::increment_counter(tags::METRIC_BUFFER_RECYCLE_DROPPED_COUNT, 1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recycled_buffers_come_back_empty() {
        let pool = BufferPool::new(16, 2);
        let mut first = pool.acquire();
        first.extend_from_slice(b"payload");
        drop(first);

        let second = pool.acquire();
        assert!(second.is_empty());
        assert!(second.capacity() >= 16);
        assert_eq!(pool.metrics().recycled, 1);
    }

    #[test]
    fn overflowing_buffers_are_dropped() {
        let pool = BufferPool::new(8, 1);
        let a = pool.acquire();
        let b = pool.acquire();
        drop(a);
        drop(b);

        let metrics = pool.metrics();
        assert_eq!(metrics.created, 2);
        assert_eq!(metrics.dropped, 1);
    }
}
