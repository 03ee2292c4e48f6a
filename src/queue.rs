//! Producer-side pending-sample queue.
//!
//! A single mutex protects the queue; it is held only for the brief
//! push/drain critical sections and never while file I/O is in progress.
//! The producer appends, the writer thread takes the entire pending
//! sequence in one swap, so samples reach disk in exact enqueue order.

use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::warn;

/// Queue depth at which a stalled drain is reported.
const QUEUE_DEPTH_WARN: usize = 4096;

/// A sample captured at enqueue time.
#[derive(Debug, Clone)]
pub(crate) struct QueuedSample {
    /// Sample payload, exactly one slot in size.
    pub data: Vec<u8>,
    /// Close the current ring instance and open a fresh one before this
    /// sample is written.
    pub start_new_ring: bool,
}

/// Mutex-protected FIFO of samples waiting for the writer thread.
#[derive(Debug, Default)]
pub(crate) struct SampleQueue {
    pending: Mutex<VecDeque<QueuedSample>>,
}

impl SampleQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample and return the resulting queue depth.
    pub fn push(&self, sample: QueuedSample) -> usize {
        let depth = {
            let mut pending = self.pending.lock();
            pending.push_back(sample);
            pending.len()
        };
        if depth == QUEUE_DEPTH_WARN {
            warn!(depth, "sample queue is growing; writer thread may be stalled");
        }
        depth
    }

    /// Atomically take everything that is pending, in insertion order.
    pub fn drain_all(&self) -> Vec<QueuedSample> {
        let mut pending = self.pending.lock();
        pending.drain(..).collect()
    }

    /// Put an undrained batch back at the head of the queue.
    ///
    /// Used when no ring instance could be opened: the batch stays in
    /// memory, ahead of anything enqueued meanwhile, so FIFO order is
    /// preserved when the next drain retries.
    pub fn requeue_front(&self, batch: Vec<QueuedSample>) {
        if batch.is_empty() {
            return;
        }
        let mut pending = self.pending.lock();
        for sample in batch.into_iter().rev() {
            pending.push_front(sample);
        }
    }

    /// Current queue depth.
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}
