use std::io::Write;
use std::time::{Duration, Instant};

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use crate::core::slots::FrameSlots;
use crate::telemetry::{self, tags};
use crate::types::{FrameId, duration_to_us};
use crate::{Result, VzipError};

use super::{MAX_RECORD_LEN, RECORD_LENGTH_SIZE};

/// Totals of a finished archive stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveSummary {
    pub records: usize,
    pub bytes: u64,
    /// CRC32 over every byte written, length fields included.
    pub crc32: u32,
}

/// Appends length-prefixed records to a stream in frame order.
///
/// [`drain`](Self::drain) walks a [`FrameSlots`] array from the first slot to
/// the last, blocking on each one until its worker publishes, so records land
/// in frame order no matter which worker finishes first.
#[derive(Debug)]
pub struct OrderedWriter<W: Write> {
    writer: W,
    slot_timeout: Option<Duration>,
    records: usize,
    bytes: u64,
    crc32: Hasher,
}

impl<W: Write> OrderedWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            slot_timeout: None,
            records: 0,
            bytes: 0,
            crc32: Hasher::new(),
        }
    }

    /// Bounds how long the writer waits for any single slot.
    pub fn with_slot_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.slot_timeout = timeout;
        self
    }

    /// Number of records written so far.
    pub fn records_written(&self) -> usize {
        self.records
    }

    /// Writes one record.
    pub fn write_record(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() > MAX_RECORD_LEN {
            return Err(VzipError::InvalidFormat(
                "record payload exceeds the 32-bit length field",
            ));
        }

        let length = (payload.len() as u32).to_ne_bytes();
        debug_assert_eq!(length.len(), RECORD_LENGTH_SIZE);
        self.writer.write_all(&length)?;
        self.writer.write_all(payload)?;

        self.crc32.update(&length);
        self.crc32.update(payload);
        self.records += 1;
        self.bytes += (RECORD_LENGTH_SIZE + payload.len()) as u64;
        Ok(())
    }

    /// Consumes every slot in order and writes its payload.
    ///
    /// Stops at the first slot that failed, was cancelled or timed out.
    pub fn drain(&mut self, slots: &FrameSlots) -> Result<()> {
        for index in 0..slots.len() {
            let frame = FrameId(index);
            let slot = slots.slot(frame)?;

            let wait_started = Instant::now();
            let payload = slot.wait_take(frame, self.slot_timeout)?;
            let waited_us = duration_to_us(wait_started.elapsed());

            self.write_record(&payload).map_err(|error| {
                error.with_context(format!("writing record for frame {frame}"))
            })?;

            telemetry::increment_counter(tags::METRIC_WRITER_RECORD_COUNT, 1);
            telemetry::record_histogram(tags::METRIC_WRITER_WAIT_LATENCY_US, waited_us);
            telemetry::record_histogram(tags::METRIC_WRITER_RECORD_BYTES, payload.len() as u64);
            tracing::trace!(
                target: tags::TARGET_WRITER,
                frame = index,
                payload_bytes = payload.len(),
                waited_us,
                "record written"
            );
        }
        Ok(())
    }

    /// Flushes the stream and hands it back with the archive totals.
    pub fn finish(mut self) -> Result<(W, ArchiveSummary)> {
        self.writer.flush()?;
        let summary = ArchiveSummary {
            records: self.records,
            bytes: self.bytes,
            crc32: self.crc32.finalize(),
        };
        tracing::debug!(
            target: tags::TARGET_WRITER,
            records = summary.records,
            bytes = summary.bytes,
            crc32 = summary.crc32,
            "archive stream finalized"
        );
        Ok((self.writer, summary))
    }
}
