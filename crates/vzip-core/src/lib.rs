//! Parallel, order-preserving frame archiver.
//!
//! `vzip-core` compresses an ordered set of frames (typically the `.ppm`
//! files of one directory) with a fixed pool of worker threads and writes the
//! encoded frames, in their original order, as length-prefixed records.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use vzip_core::{DirectorySource, FramePipeline, PipelineConfig};
//!
//! # fn main() -> vzip_core::Result<()> {
//! let source = Arc::new(DirectorySource::open("frames")?);
//! let pipeline = FramePipeline::new(PipelineConfig::with_workers(4))?;
//! let stats = pipeline.archive_to_path(source, "video.vzip")?;
//! println!("{:?}", stats.compression_ratio());
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod codec;
pub mod core;
pub mod error;
pub mod format;
pub mod io;
pub mod pipeline;
pub mod telemetry;
pub mod types;

pub use buffer::{BufferPool, PoolMetricsSnapshot, PooledBuffer};
pub use codec::{Codec, Lz4Codec, StoredCodec, ZlibCodec};
pub use crate::core::{
    AbortSignal, ByteCounters, ByteTotals, FrameSlot, FrameSlots, PoolRuntimeSnapshot, WorkQueue,
    WorkerPool, WorkerPoolHandle, WorkerRuntimeSnapshot,
};
pub use error::VzipError;
pub use format::{ArchiveReader, ArchiveRecord, ArchiveSummary, OrderedWriter};
pub use io::{
    DEFAULT_FRAME_EXTENSION, DirectorySource, DirectorySourceOptions, FrameSource, MemorySource,
};
pub use pipeline::{ArchiveOutcome, FramePipeline, PipelineConfig, RunStats};
pub use telemetry::worker::{DefaultWorkerTelemetry, WorkerTelemetry};
pub use types::{CodecKind, DEFAULT_MAX_FRAME_SIZE, FrameId, Result};
