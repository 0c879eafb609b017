//! Frame archiving pipeline.
//!
//! A run wires a [`FrameSource`] to a fixed [`WorkerPool`] through a shared
//! [`WorkQueue`], hands encoded frames to a single [`OrderedWriter`] thread
//! through per-frame [`FrameSlots`] and totals the bytes read and produced.
//! Workers and writer run concurrently; the writer blocks on slot `i` until
//! its frame is published, so the archive follows frame order regardless of
//! which worker finishes first.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use bytes::Bytes;
use rayon::prelude::*;
use tempfile::NamedTempFile;

use crate::buffer::BufferPool;
use crate::codec::{self, Codec};
use crate::core::worker_pool::panic_message;
use crate::core::{AbortSignal, ByteCounters, FrameSlots, WorkQueue, WorkerPool};
use crate::format::OrderedWriter;
use crate::io::FrameSource;
use crate::telemetry::tags;
use crate::telemetry::worker::{DefaultWorkerTelemetry, WorkerTelemetry};
use crate::types::{FrameId, duration_to_us};
use crate::{Result, VzipError};

pub mod types;

pub use types::{ArchiveOutcome, PipelineConfig, RunStats};

/// Compresses every frame of a source into one ordered archive stream.
pub struct FramePipeline {
    config: PipelineConfig,
    codec: Arc<dyn Codec>,
    telemetry: Arc<dyn WorkerTelemetry>,
}

impl FramePipeline {
    /// Creates a pipeline using the codec named by `config.codec`.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let codec = config.codec.build()?;
        Self::with_codec(config, codec)
    }

    /// Creates a pipeline with a caller supplied codec; `config.codec` is ignored.
    pub fn with_codec(config: PipelineConfig, codec: Arc<dyn Codec>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            codec,
            telemetry: Arc::new(DefaultWorkerTelemetry),
        })
    }

    /// Replaces the worker telemetry backend.
    pub fn with_telemetry(mut self, telemetry: Arc<dyn WorkerTelemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn codec(&self) -> &dyn Codec {
        self.codec.as_ref()
    }

    /// Archives `source` into `writer` and returns the writer once flushed.
    pub fn run<W>(&self, source: Arc<dyn FrameSource>, writer: W) -> Result<ArchiveOutcome<W>>
    where
        W: Write + Send + 'static,
    {
        self.run_with_abort(source, writer, &AbortSignal::new())
    }

    /// Like [`run`](Self::run), stopping early once `abort` is raised.
    ///
    /// On failure the partially written stream is dropped.
    pub fn run_with_abort<W>(
        &self,
        source: Arc<dyn FrameSource>,
        writer: W,
        abort: &AbortSignal,
    ) -> Result<ArchiveOutcome<W>>
    where
        W: Write + Send + 'static,
    {
        let started_at = Instant::now();
        let frames = source.frame_count();
        self.check_size_hints(source.as_ref())?;

        tracing::debug!(
            target: tags::TARGET_PIPELINE,
            frames,
            workers = self.config.workers,
            codec = self.codec.name(),
            max_frame_size = self.config.max_frame_size,
            "archive run started"
        );

        let slots = Arc::new(FrameSlots::new(frames));
        abort.attach(Arc::clone(&slots));
        let result = self.run_attached(source, writer, slots, abort, started_at);
        abort.detach();

        if let Err(error) = &result {
            tracing::debug!(
                target: tags::TARGET_PIPELINE,
                error = %error,
                elapsed_us = duration_to_us(started_at.elapsed()),
                "archive run failed"
            );
        }
        result
    }

    /// Archives `source` into a file at `path`.
    ///
    /// The archive is written to a temporary file next to `path` and only
    /// moved into place once the run succeeded, so a failed run leaves no file.
    pub fn archive_to_path(
        &self,
        source: Arc<dyn FrameSource>,
        path: impl AsRef<Path>,
    ) -> Result<RunStats> {
        let path = path.as_ref();
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let staging = NamedTempFile::new_in(directory).map_err(|error| {
            VzipError::from(error).with_context(format!(
                "creating temporary archive in {}",
                directory.display()
            ))
        })?;

        let outcome = self.run(source, BufWriter::new(staging))?;
        let staging = outcome
            .writer
            .into_inner()
            .map_err(|error| VzipError::from(error.into_error()))?;
        staging.as_file().sync_all()?;
        staging.persist(path).map_err(|error| {
            VzipError::from(error.error).with_context(format!("persisting {}", path.display()))
        })?;

        let size = fs::metadata(path)?.len();
        tracing::debug!(
            target: tags::TARGET_PIPELINE,
            path = %path.display(),
            bytes = size,
            "archive persisted"
        );
        Ok(outcome.stats)
    }

    fn run_attached<W>(
        &self,
        source: Arc<dyn FrameSource>,
        writer: W,
        slots: Arc<FrameSlots>,
        abort: &AbortSignal,
        started_at: Instant,
    ) -> Result<ArchiveOutcome<W>>
    where
        W: Write + Send + 'static,
    {
        let frames = slots.len();
        let queue = Arc::new(WorkQueue::new(frames));
        let counters = Arc::new(ByteCounters::new());
        let task = FrameTask {
            source,
            codec: Arc::clone(&self.codec),
            slots: Arc::clone(&slots),
            counters: Arc::clone(&counters),
            buffers: BufferPool::new(
                self.config.max_frame_size.saturating_add(1),
                self.config.buffer_pool_capacity,
            ),
            max_frame_size: self.config.max_frame_size,
        };

        let pool = WorkerPool::with_telemetry(self.config.workers, Arc::clone(&self.telemetry));
        let workers = pool.spawn(queue, abort.clone(), move |_worker_id, frame| {
            task.process(frame)
        })?;

        let writer_thread = {
            let slots = Arc::clone(&slots);
            let abort = abort.clone();
            let slot_timeout = self.config.slot_wait_timeout;
            thread::Builder::new()
                .name("vzip-writer".to_string())
                .spawn(move || {
                    let mut ordered = OrderedWriter::new(writer).with_slot_timeout(slot_timeout);
                    let outcome = match ordered.drain(&slots) {
                        Ok(()) => ordered.finish(),
                        Err(error) => Err(error),
                    };
                    match outcome {
                        Ok(finished) => Some(finished),
                        Err(error) => {
                            abort.raise(error);
                            None
                        }
                    }
                })
        };
        let writer_thread = match writer_thread {
            Ok(handle) => handle,
            Err(error) => {
                abort.cancel();
                let _ = workers.join();
                return Err(
                    VzipError::from(error).with_context("spawning archive writer thread")
                );
            }
        };

        // Workers first: a dead worker must cancel the slots before the writer is joined.
        let pool_snapshot = match workers.join() {
            Ok(snapshot) => Some(snapshot),
            Err(error) => {
                abort.raise(error);
                None
            }
        };
        let written = match writer_thread.join() {
            Ok(written) => written,
            Err(payload) => {
                abort.raise(VzipError::WorkerPanicked(format!(
                    "archive writer: {}",
                    panic_message(payload.as_ref())
                )));
                None
            }
        };

        if let Some(error) = abort.take_error() {
            return Err(error);
        }
        let (Some(pool), Some((writer, archive))) = (pool_snapshot, written) else {
            return Err(VzipError::Cancelled);
        };

        let stats = RunStats {
            frames,
            codec: self.codec.name().to_string(),
            totals: counters.totals(),
            archive,
            elapsed: started_at.elapsed(),
            pool,
        };
        tracing::debug!(
            target: tags::TARGET_PIPELINE,
            frames,
            total_in = stats.total_in(),
            total_out = stats.total_out(),
            archive_bytes = stats.archive.bytes,
            elapsed_us = duration_to_us(stats.elapsed),
            "archive run finished"
        );
        Ok(ArchiveOutcome { writer, stats })
    }

    /// Rejects frames whose known size is already over the limit before any
    /// thread starts.
    fn check_size_hints(&self, source: &dyn FrameSource) -> Result<()> {
        let limit = self.config.max_frame_size as u64;
        let oversized = (0..source.frame_count())
            .into_par_iter()
            .map(FrameId)
            .find_map_first(|frame| {
                source
                    .size_hint(frame)
                    .filter(|&size| size > limit)
                    .map(|size| (frame, size))
            });

        match oversized {
            Some((frame, size)) => Err(VzipError::FrameTooLarge {
                frame,
                size,
                limit: self.config.max_frame_size,
            }
            .with_context(source.frame_label(frame))),
            None => Ok(()),
        }
    }
}

/// Per-run state shared by every worker.
struct FrameTask {
    source: Arc<dyn FrameSource>,
    codec: Arc<dyn Codec>,
    slots: Arc<FrameSlots>,
    counters: Arc<ByteCounters>,
    buffers: BufferPool,
    max_frame_size: usize,
}

impl FrameTask {
    fn process(&self, frame: FrameId) -> Result<()> {
        let result = self.compress(frame);
        if result.is_err() {
            if let Some(slot) = self.slots.get(frame) {
                slot.fail();
            }
        }
        result
    }

    fn compress(&self, frame: FrameId) -> Result<()> {
        let limit = self.max_frame_size;

        let mut raw = self.buffers.acquire();
        self.source
            .read_frame(frame, limit.saturating_add(1), raw.as_mut_vec())?;
        if raw.len() > limit {
            let size = self
                .source
                .size_hint(frame)
                .unwrap_or(0)
                .max(raw.len() as u64);
            return Err(VzipError::FrameTooLarge { frame, size, limit }
                .with_context(self.source.frame_label(frame)));
        }
        self.counters.add_in(raw.len());

        let mut encoded = self.buffers.acquire();
        codec::encode_frame(self.codec.as_ref(), frame, &raw, encoded.as_mut_vec())?;
        drop(raw);
        if encoded.len() > limit {
            return Err(VzipError::CapacityExceeded {
                frame,
                size: encoded.len(),
                limit,
            });
        }

        let payload = Bytes::copy_from_slice(&encoded);
        let payload_len = payload.len();
        if !self.slots.slot(frame)?.publish(payload) {
            return Err(VzipError::Cancelled);
        }
        self.counters.add_out(payload_len);
        Ok(())
    }
}
