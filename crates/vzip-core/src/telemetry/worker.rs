use std::time::Duration;

use crate::telemetry;
use crate::telemetry::tags;
use crate::types::{FrameId, duration_to_us};

/// Telemetry contract for compression workers.
///
/// The worker pool calls these hooks around every frame task so metrics and
/// log events stay independent of a specific backend.
pub trait WorkerTelemetry: Send + Sync {
    fn on_queue_remaining(&self, worker_id: usize, remaining: usize);
    fn on_task_started(&self, worker_id: usize, frame: FrameId);
    fn on_task_finished(&self, worker_id: usize, frame: FrameId, elapsed: Duration);
    fn on_task_failed(&self, worker_id: usize, frame: FrameId, elapsed: Duration);
}

/// Default telemetry implementation that reports worker metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultWorkerTelemetry;

impl WorkerTelemetry for DefaultWorkerTelemetry {
    fn on_queue_remaining(&self, _worker_id: usize, remaining: usize) {
        telemetry::set_gauge(tags::METRIC_WORKER_QUEUE_REMAINING, remaining as u64);
    }

    fn on_task_started(&self, worker_id: usize, frame: FrameId) {
        telemetry::increment_counter(tags::METRIC_WORKER_TASK_START_COUNT, 1);
        telemetry::add_gauge(tags::METRIC_WORKER_ACTIVE_COUNT, 1);

        tracing::trace!(
            target: tags::TARGET_WORKER,
            worker_id,
            frame = frame.index(),
            "frame task started"
        );
    }

    fn on_task_finished(&self, worker_id: usize, frame: FrameId, elapsed: Duration) {
        let elapsed_us = duration_to_us(elapsed);

        telemetry::increment_counter(tags::METRIC_WORKER_TASK_FINISH_COUNT, 1);
        telemetry::increment_counter(tags::METRIC_WORKER_TASK_COUNT, 1);
        telemetry::record_histogram(tags::METRIC_WORKER_TASK_LATENCY_US, elapsed_us);
        telemetry::sub_gauge_saturating(tags::METRIC_WORKER_ACTIVE_COUNT, 1);

        tracing::trace!(
            target: tags::TARGET_WORKER,
            worker_id,
            frame = frame.index(),
            elapsed_us,
            "frame task finished"
        );
    }

    fn on_task_failed(&self, worker_id: usize, frame: FrameId, elapsed: Duration) {
        let elapsed_us = duration_to_us(elapsed);

        telemetry::increment_counter(tags::METRIC_WORKER_TASK_FAIL_COUNT, 1);
        telemetry::increment_counter(tags::METRIC_WORKER_TASK_COUNT, 1);
        telemetry::record_histogram(tags::METRIC_WORKER_TASK_LATENCY_US, elapsed_us);
        telemetry::sub_gauge_saturating(tags::METRIC_WORKER_ACTIVE_COUNT, 1);

        tracing::debug!(
            target: tags::TARGET_WORKER,
            worker_id,
            frame = frame.index(),
            elapsed_us,
            "frame task failed"
        );
    }
}
