use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::VzipError;
use crate::core::abort::AbortSignal;
use crate::core::work_queue::WorkQueue;
use crate::telemetry::tags;
use crate::telemetry::worker::{DefaultWorkerTelemetry, WorkerTelemetry};
use crate::types::{FrameId, Result, duration_to_us};

/// Fixed-size pool of compression threads draining a shared [`WorkQueue`].
pub struct WorkerPool {
    num_workers: usize,
    telemetry: Arc<dyn WorkerTelemetry>,
}

impl WorkerPool {
    /// Creates a worker pool using the default worker telemetry implementation.
    pub fn new(num_workers: usize) -> Self {
        Self::with_telemetry(num_workers, Arc::new(DefaultWorkerTelemetry))
    }

    /// Creates a worker pool with a custom telemetry backend.
    pub fn with_telemetry(num_workers: usize, telemetry: Arc<dyn WorkerTelemetry>) -> Self {
        Self {
            num_workers: num_workers.max(1),
            telemetry,
        }
    }

    /// Number of workers configured in this pool.
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Spawns the workers. Each one claims frames from `queue` and runs
    /// `processor(worker_id, frame)` until the queue is drained or `abort` is raised.
    ///
    /// The first failing task raises `abort` with its error; workers stop at
    /// their next claim.
    pub fn spawn<F>(
        &self,
        queue: Arc<WorkQueue>,
        abort: AbortSignal,
        processor: F,
    ) -> Result<WorkerPoolHandle>
    where
        F: Fn(usize, FrameId) -> Result<()> + Send + Sync + 'static,
    {
        let state = Arc::new(WorkerPoolState::new(
            queue,
            abort,
            Arc::clone(&self.telemetry),
            self.num_workers,
        ));
        let processor = Arc::new(processor);

        let mut worker_handles = Vec::with_capacity(self.num_workers);
        for worker_id in 0..self.num_workers {
            let worker_state = Arc::clone(&state);
            let worker_processor = Arc::clone(&processor);

            let spawned = thread::Builder::new()
                .name(format!("vzip-worker-{worker_id}"))
                .spawn(move || run_worker_loop(worker_id, worker_state, worker_processor));
            match spawned {
                Ok(handle) => worker_handles.push(handle),
                Err(error) => {
                    // Stop the workers already running before reporting.
                    state.abort.cancel();
                    let mut partial = WorkerPoolHandle {
                        state,
                        worker_handles,
                    };
                    let _ = partial.join_workers();
                    return Err(VzipError::from(error)
                        .with_context(format!("spawning worker thread {worker_id}")));
                }
            }
        }

        tracing::debug!(
            target: tags::TARGET_WORKER,
            workers = self.num_workers,
            frames = state.queue.len(),
            "worker pool started"
        );

        Ok(WorkerPoolHandle {
            state,
            worker_handles,
        })
    }
}

struct WorkerPoolState {
    queue: Arc<WorkQueue>,
    abort: AbortSignal,
    telemetry: Arc<dyn WorkerTelemetry>,
    started_at: Instant,
    task_counts: Vec<AtomicUsize>,
    worker_started_offsets_us: Vec<AtomicU64>,
    worker_stopped_offsets_us: Vec<AtomicU64>,
    worker_busy_us: Vec<AtomicU64>,
}

impl WorkerPoolState {
    fn new(
        queue: Arc<WorkQueue>,
        abort: AbortSignal,
        telemetry: Arc<dyn WorkerTelemetry>,
        num_workers: usize,
    ) -> Self {
        let task_counts = (0..num_workers).map(|_| AtomicUsize::new(0)).collect();
        let worker_started_offsets_us = (0..num_workers).map(|_| AtomicU64::new(0)).collect();
        let worker_stopped_offsets_us = (0..num_workers).map(|_| AtomicU64::new(0)).collect();
        let worker_busy_us = (0..num_workers).map(|_| AtomicU64::new(0)).collect();
        Self {
            queue,
            abort,
            telemetry,
            started_at: Instant::now(),
            task_counts,
            worker_started_offsets_us,
            worker_stopped_offsets_us,
            worker_busy_us,
        }
    }

    // Offsets are stored +1 so zero means "not yet".
    fn mark_offset(&self, offsets: &[AtomicU64], worker_id: usize) {
        let offset_us = duration_to_us(self.started_at.elapsed());
        offsets[worker_id].store(offset_us.saturating_add(1), Ordering::Release);
    }
}

/// Per-worker runtime metrics captured by the worker pool.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerRuntimeSnapshot {
    pub worker_id: usize,
    pub tasks_completed: usize,
    pub uptime: Duration,
    pub busy: Duration,
    pub idle: Duration,
    pub utilization: f64,
}

/// Runtime metrics snapshot for the worker pool.
#[derive(Debug, Clone, Serialize)]
pub struct PoolRuntimeSnapshot {
    pub elapsed: Duration,
    pub claimed: usize,
    pub completed: usize,
    pub remaining: usize,
    pub workers: Vec<WorkerRuntimeSnapshot>,
}

/// Runtime handle for a spawned worker pool.
pub struct WorkerPoolHandle {
    state: Arc<WorkerPoolState>,
    worker_handles: Vec<JoinHandle<()>>,
}

impl WorkerPoolHandle {
    /// Total completed task count.
    pub fn completed_count(&self) -> usize {
        self.worker_task_counts().into_iter().sum()
    }

    /// Per-worker processed task counts.
    pub fn worker_task_counts(&self) -> Vec<usize> {
        self.state
            .task_counts
            .iter()
            .map(|counter| counter.load(Ordering::Acquire))
            .collect()
    }

    /// Returns runtime metrics for the pool and each worker.
    pub fn runtime_snapshot(&self) -> PoolRuntimeSnapshot {
        let elapsed = self.state.started_at.elapsed();
        let elapsed_us = duration_to_us(elapsed);

        let mut workers = Vec::with_capacity(self.state.task_counts.len());
        for worker_id in 0..self.state.task_counts.len() {
            let started_raw =
                self.state.worker_started_offsets_us[worker_id].load(Ordering::Acquire);
            let stopped_raw =
                self.state.worker_stopped_offsets_us[worker_id].load(Ordering::Acquire);
            let busy_us_raw = self.state.worker_busy_us[worker_id].load(Ordering::Acquire);

            let start_us = started_raw.saturating_sub(1);
            let stop_us = if stopped_raw == 0 {
                elapsed_us
            } else {
                stopped_raw.saturating_sub(1)
            };
            let uptime_us = if started_raw == 0 {
                0
            } else {
                stop_us.saturating_sub(start_us)
            };
            let busy_us = busy_us_raw.min(uptime_us);
            let idle_us = uptime_us.saturating_sub(busy_us);
            let utilization = if uptime_us == 0 {
                0.0
            } else {
                busy_us as f64 / uptime_us as f64
            };

            workers.push(WorkerRuntimeSnapshot {
                worker_id,
                tasks_completed: self.state.task_counts[worker_id].load(Ordering::Acquire),
                uptime: Duration::from_micros(uptime_us),
                busy: Duration::from_micros(busy_us),
                idle: Duration::from_micros(idle_us),
                utilization,
            });
        }

        PoolRuntimeSnapshot {
            elapsed,
            claimed: self.state.queue.claimed(),
            completed: self.completed_count(),
            remaining: self.state.queue.remaining(),
            workers,
        }
    }

    /// Waits for every worker to exit and returns the final runtime snapshot.
    ///
    /// Task errors are reported through the pool's [`AbortSignal`]; this only
    /// fails when a worker thread itself died.
    pub fn join(mut self) -> Result<PoolRuntimeSnapshot> {
        self.join_workers()?;
        Ok(self.runtime_snapshot())
    }

    fn join_workers(&mut self) -> Result<()> {
        let mut first_panic = None;
        for handle in self.worker_handles.drain(..) {
            if let Err(payload) = handle.join() {
                first_panic.get_or_insert_with(|| panic_message(payload.as_ref()));
            }
        }

        match first_panic {
            Some(details) => Err(VzipError::WorkerPanicked(details)),
            None => Ok(()),
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn run_worker_loop<F>(worker_id: usize, state: Arc<WorkerPoolState>, processor: Arc<F>)
where
    F: Fn(usize, FrameId) -> Result<()> + Send + Sync,
{
    state.mark_offset(&state.worker_started_offsets_us, worker_id);

    loop {
        if state.abort.is_raised() {
            break;
        }
        let Some(frame) = state.queue.claim_next() else {
            break;
        };

        state
            .telemetry
            .on_queue_remaining(worker_id, state.queue.remaining());
        state.telemetry.on_task_started(worker_id, frame);
        let started_at = Instant::now();

        let result = match catch_unwind(AssertUnwindSafe(|| processor(worker_id, frame))) {
            Ok(result) => result,
            Err(payload) => Err(VzipError::WorkerPanicked(panic_message(payload.as_ref()))),
        };

        let elapsed = started_at.elapsed();
        state.worker_busy_us[worker_id].fetch_add(duration_to_us(elapsed), Ordering::AcqRel);

        match result {
            Ok(()) => {
                state
                    .telemetry
                    .on_task_finished(worker_id, frame, elapsed);
                state.task_counts[worker_id].fetch_add(1, Ordering::AcqRel);
            }
            Err(error) => {
                state.telemetry.on_task_failed(worker_id, frame, elapsed);
                state.abort.raise(error);
                break;
            }
        }
    }

    state.mark_offset(&state.worker_stopped_offsets_us, worker_id);
}
