/// Log target for frame source events.
pub const TARGET_SOURCE: &str = "vzip::source";
/// Log target for codec events.
pub const TARGET_CODEC: &str = "vzip::codec";
/// Log target for buffer pool events.
pub const TARGET_BUFFER: &str = "vzip::buffer";
/// Log target for worker runtime events.
pub const TARGET_WORKER: &str = "vzip::worker";
/// Log target for the ordered archive writer.
pub const TARGET_WRITER: &str = "vzip::writer";
/// Log target for pipeline orchestration.
pub const TARGET_PIPELINE: &str = "vzip::pipeline";

pub const METRIC_SOURCE_READ_COUNT: &str = "vzip.source.read.count";
pub const METRIC_SOURCE_READ_BYTES: &str = "vzip.source.read.bytes";
pub const METRIC_SOURCE_READ_LATENCY_US: &str = "vzip.source.read.latency_us";

pub const METRIC_CODEC_ENCODE_COUNT: &str = "vzip.codec.encode.count";
pub const METRIC_CODEC_ENCODE_LATENCY_US: &str = "vzip.codec.encode.latency_us";
pub const METRIC_CODEC_INPUT_BYTES: &str = "vzip.codec.input.bytes";
pub const METRIC_CODEC_OUTPUT_BYTES: &str = "vzip.codec.output.bytes";

pub const METRIC_BUFFER_ACQUIRE_CREATED_COUNT: &str = "vzip.buffer.acquire.created.count";
pub const METRIC_BUFFER_ACQUIRE_RECYCLED_COUNT: &str = "vzip.buffer.acquire.recycled.count";
pub const METRIC_BUFFER_RECYCLE_OK_COUNT: &str = "vzip.buffer.recycle.ok.count";
pub const METRIC_BUFFER_RECYCLE_DROPPED_COUNT: &str = "vzip.buffer.recycle.dropped.count";

pub const METRIC_WORKER_TASK_COUNT: &str = "vzip.worker.task.count";
pub const METRIC_WORKER_TASK_START_COUNT: &str = "vzip.worker.task.start.count";
pub const METRIC_WORKER_TASK_FINISH_COUNT: &str = "vzip.worker.task.finish.count";
pub const METRIC_WORKER_TASK_FAIL_COUNT: &str = "vzip.worker.task.fail.count";
pub const METRIC_WORKER_TASK_LATENCY_US: &str = "vzip.worker.task.latency_us";
pub const METRIC_WORKER_ACTIVE_COUNT: &str = "vzip.worker.active.count";
pub const METRIC_WORKER_QUEUE_REMAINING: &str = "vzip.worker.queue.remaining";

pub const METRIC_WRITER_RECORD_COUNT: &str = "vzip.writer.record.count";
pub const METRIC_WRITER_WAIT_LATENCY_US: &str = "vzip.writer.wait.latency_us";
pub const METRIC_WRITER_RECORD_BYTES: &str = "vzip.writer.record.bytes";
