mod support;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[cfg(feature = "telemetry")]
use vzip_core::telemetry::{self, tags};
use vzip_core::{FrameId, FramePipeline, PipelineConfig, WorkerTelemetry};

use support::memory_source;

#[derive(Default)]
struct CountingTelemetry {
    started: AtomicUsize,
    finished: AtomicUsize,
    failed: AtomicUsize,
}

impl WorkerTelemetry for CountingTelemetry {
    fn on_queue_remaining(&self, _worker_id: usize, _remaining: usize) {}

    fn on_task_started(&self, _worker_id: usize, _frame: FrameId) {
        self.started.fetch_add(1, Ordering::AcqRel);
    }

    fn on_task_finished(&self, _worker_id: usize, _frame: FrameId, _elapsed: Duration) {
        self.finished.fetch_add(1, Ordering::AcqRel);
    }

    fn on_task_failed(&self, _worker_id: usize, _frame: FrameId, _elapsed: Duration) {
        self.failed.fetch_add(1, Ordering::AcqRel);
    }
}

#[test]
fn custom_worker_telemetry_sees_every_frame() -> Result<(), Box<dyn std::error::Error>> {
    let counting = Arc::new(CountingTelemetry::default());
    let pipeline = FramePipeline::new(PipelineConfig::with_workers(3))?
        .with_telemetry(Arc::clone(&counting) as Arc<dyn WorkerTelemetry>);

    pipeline.run(Arc::new(memory_source(&[64; 12])), Vec::new())?;

    assert_eq!(counting.started.load(Ordering::Acquire), 12);
    assert_eq!(counting.finished.load(Ordering::Acquire), 12);
    assert_eq!(counting.failed.load(Ordering::Acquire), 0);
    Ok(())
}

#[cfg(feature = "telemetry")]
#[test]
fn default_telemetry_records_pipeline_metrics() -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = FramePipeline::new(PipelineConfig::with_workers(2))?;
    pipeline.run(Arc::new(memory_source(&[100, 200, 300])), Vec::new())?;

    // The registry is process-wide and shared with other tests in this binary.
    let snapshot = telemetry::snapshot();
    assert!(snapshot.counter(tags::METRIC_WRITER_RECORD_COUNT).unwrap_or(0) >= 3);
    assert!(snapshot.counter(tags::METRIC_WORKER_TASK_FINISH_COUNT).unwrap_or(0) >= 3);
    assert!(snapshot.counter(tags::METRIC_CODEC_ENCODE_COUNT).unwrap_or(0) >= 3);
    let encode_latency = snapshot
        .histogram(tags::METRIC_CODEC_ENCODE_LATENCY_US)
        .ok_or("missing encode latency histogram")?;
    assert!(encode_latency.count >= 3);
    Ok(())
}
