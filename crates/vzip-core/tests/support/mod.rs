#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use vzip_core::{FrameId, FrameSource, MemorySource, Result, VzipError};

/// Deterministic frame payload: a repeating ramp with some noise so zlib has work to do.
pub fn frame_bytes(index: usize, len: usize) -> Vec<u8> {
    let mut state = 0x9E37_79B9_7F4A_7C15u64 ^ (index as u64 + 1);
    (0..len)
        .map(|offset| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let noise = if offset % 16 == 0 { state as u8 } else { 0 };
            ((offset / 3) as u8).wrapping_add(noise)
        })
        .collect()
}

pub fn memory_source(sizes: &[usize]) -> MemorySource {
    MemorySource::from_vecs(
        sizes
            .iter()
            .enumerate()
            .map(|(index, &len)| frame_bytes(index, len))
            .collect(),
    )
}

/// Tiny xorshift generator so delay patterns are reproducible without extra crates.
pub struct XorShift(u64);

impl XorShift {
    pub fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    pub fn next_u64(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }
}

/// Wraps a source and sleeps before every read.
pub struct DelayedSource<S> {
    pub inner: S,
    pub delays: Vec<Duration>,
}

impl<S: FrameSource> DelayedSource<S> {
    pub fn random(inner: S, seed: u64, max_delay_ms: u64) -> Self {
        let mut rng = XorShift::new(seed);
        let delays = (0..inner.frame_count())
            .map(|_| Duration::from_millis(rng.next_u64() % (max_delay_ms + 1)))
            .collect();
        Self { inner, delays }
    }

    pub fn uniform(inner: S, delay: Duration) -> Self {
        let delays = vec![delay; inner.frame_count()];
        Self { inner, delays }
    }
}

impl<S: FrameSource> FrameSource for DelayedSource<S> {
    fn frame_count(&self) -> usize {
        self.inner.frame_count()
    }

    fn size_hint(&self, frame: FrameId) -> Option<u64> {
        self.inner.size_hint(frame)
    }

    fn read_frame(&self, frame: FrameId, limit: usize, out: &mut Vec<u8>) -> Result<()> {
        if let Some(delay) = self.delays.get(frame.index()) {
            thread::sleep(*delay);
        }
        self.inner.read_frame(frame, limit, out)
    }
}

/// Hides size hints so oversized frames are only seen while reading.
pub struct UnsizedSource<S>(pub S);

impl<S: FrameSource> FrameSource for UnsizedSource<S> {
    fn frame_count(&self) -> usize {
        self.0.frame_count()
    }

    fn read_frame(&self, frame: FrameId, limit: usize, out: &mut Vec<u8>) -> Result<()> {
        self.0.read_frame(frame, limit, out)
    }
}

pub enum Failure {
    Io,
    Panic,
}

/// Fails one frame, counting how many reads were attempted.
pub struct FailingSource<S> {
    pub inner: S,
    pub failing_frame: FrameId,
    pub failure: Failure,
    pub reads: AtomicUsize,
}

impl<S: FrameSource> FailingSource<S> {
    pub fn new(inner: S, failing_frame: usize, failure: Failure) -> Self {
        Self {
            inner,
            failing_frame: FrameId(failing_frame),
            failure,
            reads: AtomicUsize::new(0),
        }
    }
}

impl<S: FrameSource> FrameSource for FailingSource<S> {
    fn frame_count(&self) -> usize {
        self.inner.frame_count()
    }

    fn read_frame(&self, frame: FrameId, limit: usize, out: &mut Vec<u8>) -> Result<()> {
        self.reads.fetch_add(1, Ordering::AcqRel);
        if frame == self.failing_frame {
            match self.failure {
                Failure::Io => {
                    return Err(VzipError::Io(std::io::Error::other("disk went away")));
                }
                Failure::Panic => panic!("frame reader exploded"),
            }
        }
        self.inner.read_frame(frame, limit, out)
    }
}
