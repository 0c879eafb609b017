use std::time::Duration;

use thiserror::Error;

use crate::types::FrameId;

#[derive(Debug, Error)]
pub enum VzipError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid format: {0}")]
    InvalidFormat(&'static str),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("frame {frame} is {size} bytes, exceeding the {limit} byte frame limit")]
    FrameTooLarge {
        frame: FrameId,
        size: u64,
        limit: usize,
    },
    #[error("encoded frame {frame} is {size} bytes, exceeding the {limit} byte slot capacity")]
    CapacityExceeded {
        frame: FrameId,
        size: usize,
        limit: usize,
    },
    #[error("codec error: {0}")]
    CodecError(String),
    #[error("frame {frame} failed; archive aborted")]
    FrameFailed { frame: FrameId },
    #[error("timed out after {waited:?} waiting for frame {frame}")]
    SlotTimeout { frame: FrameId, waited: Duration },
    #[error("pipeline cancelled")]
    Cancelled,
    #[error("no input frames")]
    EmptyInput,
    #[error("worker thread panicked: {0}")]
    WorkerPanicked(String),
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<VzipError>,
    },
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl VzipError {
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping context wrappers.
    pub fn root(&self) -> &VzipError {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// True for failures raised as a consequence of another error or an external cancel.
    pub(crate) fn is_secondary(&self) -> bool {
        matches!(self.root(), Self::Cancelled | Self::FrameFailed { .. })
    }
}
