use std::time::Duration;

use serde::Serialize;

use crate::core::{ByteTotals, PoolRuntimeSnapshot};
use crate::format::{ArchiveSummary, MAX_RECORD_LEN};
use crate::types::{CodecKind, DEFAULT_MAX_FRAME_SIZE};
use crate::{Result, VzipError};

/// Construction config for the frame pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Number of compression worker threads.
    pub workers: usize,
    /// Upper bound for raw frames and for encoded payloads.
    pub max_frame_size: usize,
    /// Codec applied to every frame.
    pub codec: CodecKind,
    /// Longest the writer waits on a single slot; `None` waits indefinitely.
    pub slot_wait_timeout: Option<Duration>,
    /// Idle frame buffers kept for reuse between frames.
    pub buffer_pool_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let workers = num_cpus::get().max(1);
        Self {
            workers,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            codec: CodecKind::default(),
            slot_wait_timeout: None,
            buffer_pool_capacity: workers * 2,
        }
    }
}

impl PipelineConfig {
    /// Default config with `workers` threads.
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            buffer_pool_capacity: workers.saturating_mul(2),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(VzipError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        if self.max_frame_size == 0 || self.max_frame_size > MAX_RECORD_LEN {
            return Err(VzipError::InvalidConfig(format!(
                "max frame size must be within 1..={MAX_RECORD_LEN} bytes, got {}",
                self.max_frame_size
            )));
        }
        if self.slot_wait_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(VzipError::InvalidConfig(
                "slot wait timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    /// Number of frames in the source, `N`.
    pub frames: usize,
    pub codec: String,
    pub totals: ByteTotals,
    pub archive: ArchiveSummary,
    pub elapsed: Duration,
    pub pool: PoolRuntimeSnapshot,
}

impl RunStats {
    pub fn total_in(&self) -> u64 {
        self.totals.total_in
    }

    pub fn total_out(&self) -> u64 {
        self.totals.total_out
    }

    /// Space saved in percent, `None` when no input bytes were read.
    pub fn compression_ratio(&self) -> Option<f64> {
        self.totals.compression_ratio()
    }

    /// True when the source held no frames.
    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }
}

/// Archive stream returned alongside the run statistics.
#[derive(Debug)]
pub struct ArchiveOutcome<W> {
    pub writer: W,
    pub stats: RunStats,
}
