use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Running totals of raw and encoded bytes across all workers.
#[derive(Debug, Default)]
pub struct ByteCounters {
    total_in: AtomicU64,
    total_out: AtomicU64,
}

/// Counter values captured after the workers have been joined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteTotals {
    pub total_in: u64,
    pub total_out: u64,
}

impl ByteCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_in(&self, bytes: usize) {
        self.total_in.fetch_add(bytes as u64, Ordering::AcqRel);
    }

    pub fn add_out(&self, bytes: usize) {
        self.total_out.fetch_add(bytes as u64, Ordering::AcqRel);
    }

    pub fn totals(&self) -> ByteTotals {
        ByteTotals {
            total_in: self.total_in.load(Ordering::Acquire),
            total_out: self.total_out.load(Ordering::Acquire),
        }
    }
}

impl ByteTotals {
    /// Space saved as a percentage of the input, `None` when nothing was read.
    ///
    /// Negative when the encoded output is larger than the input.
    pub fn compression_ratio(&self) -> Option<f64> {
        if self.total_in == 0 {
            return None;
        }
        let saved = self.total_in as f64 - self.total_out as f64;
        Some(100.0 * saved / self.total_in as f64)
    }
}
