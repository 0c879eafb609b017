//! Concurrency primitives of the frame pipeline.

pub mod abort;
pub mod counters;
pub mod slots;
pub mod work_queue;
pub mod worker_pool;

pub use abort::AbortSignal;
pub use counters::{ByteCounters, ByteTotals};
pub use slots::{FrameSlot, FrameSlots};
pub use work_queue::WorkQueue;
pub use worker_pool::{PoolRuntimeSnapshot, WorkerPool, WorkerPoolHandle, WorkerRuntimeSnapshot};
