use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::VzipError;

pub type Result<T> = std::result::Result<T, VzipError>;

/// Default per-frame byte limit, shared by raw input and encoded output.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Position of a frame in the archive.
///
/// Ids are assigned once the frame source is listed and never change; their
/// numeric order is the record order of the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FrameId(pub usize);

impl FrameId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<usize> for FrameId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

/// Codec selection for archive runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodecKind {
    /// zlib stream (deflate) at the given level, 0..=9.
    Zlib { level: u32 },
    /// LZ4 block with a 4-byte size prefix.
    Lz4,
    /// No compression.
    Stored,
}

impl Default for CodecKind {
    fn default() -> Self {
        Self::Zlib { level: 9 }
    }
}

impl CodecKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Zlib { .. } => "zlib",
            Self::Lz4 => "lz4",
            Self::Stored => "stored",
        }
    }
}

pub(crate) fn duration_to_us(duration: Duration) -> u64 {
    duration.as_micros().min(u64::MAX as u128) as u64
}
