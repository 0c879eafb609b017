//! Frame codecs.
//!
//! A codec is a deterministic byte transform with a known worst-case output
//! size. The pipeline treats it as opaque; it only relies on [`Codec::encode`]
//! being pure so that identical input always yields an identical archive.

use std::sync::Arc;
use std::time::Instant;

use crate::telemetry::{self, tags};
use crate::types::{CodecKind, FrameId, Result, duration_to_us};

pub mod lz4;
pub mod stored;
pub mod zlib;

pub use lz4::Lz4Codec;
pub use stored::StoredCodec;
pub use zlib::ZlibCodec;

/// Byte-level compression used for every frame of an archive.
pub trait Codec: Send + Sync {
    /// Short name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Worst-case encoded size for `input_len` bytes of input.
    fn max_encoded_len(&self, input_len: usize) -> usize;

    /// Appends the encoded form of `input` to `out`.
    fn encode(&self, input: &[u8], out: &mut Vec<u8>) -> Result<()>;

    /// Appends the decoded form of `input` to `out`.
    fn decode(&self, input: &[u8], out: &mut Vec<u8>) -> Result<()>;
}

impl CodecKind {
    /// Builds the codec described by this kind.
    pub fn build(self) -> Result<Arc<dyn Codec>> {
        Ok(match self {
            Self::Zlib { level } => Arc::new(ZlibCodec::new(level)?),
            Self::Lz4 => Arc::new(Lz4Codec),
            Self::Stored => Arc::new(StoredCodec),
        })
    }
}

/// Encodes one frame, recording codec metrics.
pub fn encode_frame(
    codec: &dyn Codec,
    frame: FrameId,
    input: &[u8],
    out: &mut Vec<u8>,
) -> Result<()> {
    let started_at = Instant::now();
    codec
        .encode(input, out)
        .map_err(|error| error.with_context(format!("encoding frame {frame}")))?;

    let elapsed_us = duration_to_us(started_at.elapsed());
    telemetry::increment_counter(tags::METRIC_CODEC_ENCODE_COUNT, 1);
    telemetry::record_histogram(tags::METRIC_CODEC_ENCODE_LATENCY_US, elapsed_us);
    telemetry::record_histogram(tags::METRIC_CODEC_INPUT_BYTES, input.len() as u64);
    telemetry::record_histogram(tags::METRIC_CODEC_OUTPUT_BYTES, out.len() as u64);

    tracing::trace!(
        target: tags::TARGET_CODEC,
        codec = codec.name(),
        frame = frame.index(),
        input_bytes = input.len(),
        output_bytes = out.len(),
        elapsed_us,
        "frame encoded"
    );

    Ok(())
}
