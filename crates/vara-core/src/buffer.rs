// ── Outstanding-byte counter ──
//
// Bytes handed to the modem's data port but not yet confirmed sent.
// Local writes add to it; every `BUFFER n` report from the modem
// overwrites it, since only the modem knows how much has drained.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Thread-safe count of bytes queued inside the modem.
#[derive(Debug, Default)]
pub struct BufferCount(AtomicUsize);

impl BufferCount {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    /// Account for a local write of `n` bytes.
    pub fn incr(&self, n: usize) {
        self.0.fetch_add(n, Ordering::AcqRel);
    }

    /// Replace the count with the modem's authoritative report.
    pub fn set(&self, n: usize) {
        self.0.store(n, Ordering::Release);
    }
}
