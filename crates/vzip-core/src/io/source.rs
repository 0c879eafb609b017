use bytes::Bytes;

use crate::types::{FrameId, Result};

/// Ordered collection of frames to archive.
///
/// The set and order of frames is fixed once the source is constructed;
/// `FrameId(i)` always names the same frame. Implementations are shared by
/// every worker thread, so reads must not rely on interior cursors.
pub trait FrameSource: Send + Sync {
    /// Number of frames, `N`.
    fn frame_count(&self) -> usize;

    /// Human readable name of a frame for logs and error messages.
    fn frame_label(&self, frame: FrameId) -> String {
        frame.to_string()
    }

    /// Size of the frame in bytes when known without reading it.
    fn size_hint(&self, _frame: FrameId) -> Option<u64> {
        None
    }

    /// Appends the frame's bytes to `out`.
    ///
    /// Implementations may stop after `limit` bytes; callers pass one byte
    /// more than they accept so an oversized frame is still detectable.
    fn read_frame(&self, frame: FrameId, limit: usize, out: &mut Vec<u8>) -> Result<()>;

    /// Frame ids in archive order.
    fn list(&self) -> Vec<FrameId> {
        (0..self.frame_count()).map(FrameId).collect()
    }
}

/// Frames held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    frames: Vec<Bytes>,
}

impl MemorySource {
    pub fn new(frames: Vec<Bytes>) -> Self {
        Self { frames }
    }

    pub fn from_vecs(frames: Vec<Vec<u8>>) -> Self {
        Self::new(frames.into_iter().map(Bytes::from).collect())
    }

    pub fn push(&mut self, frame: impl Into<Bytes>) -> FrameId {
        self.frames.push(frame.into());
        FrameId(self.frames.len() - 1)
    }

    pub fn get(&self, frame: FrameId) -> Option<&Bytes> {
        self.frames.get(frame.index())
    }
}

impl FrameSource for MemorySource {
    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn size_hint(&self, frame: FrameId) -> Option<u64> {
        self.get(frame).map(|data| data.len() as u64)
    }

    fn read_frame(&self, frame: FrameId, limit: usize, out: &mut Vec<u8>) -> Result<()> {
        let data = self
            .get(frame)
            .ok_or(crate::VzipError::InvalidFormat("frame id out of range"))?;
        out.extend_from_slice(&data[..data.len().min(limit)]);
        Ok(())
    }
}
