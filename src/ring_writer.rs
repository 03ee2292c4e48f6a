//! Write-behind controller for the multi-file ring buffer.
//!
//! [`RingWriter`] is the surface the real-time host calls once per control
//! cycle. [`add_sample`] copies the sample into the pending queue, wakes
//! the writer thread, and returns — it never blocks on disk I/O. All file
//! work (lazy instance open, slot writes, rotation, close) happens on the
//! worker thread inside the drain callback.
//!
//! Each ring instance lives in its own subdirectory named from the current
//! UTC time plus a monotonically increasing instance counter,
//! `YYYYMMDD_HHMMSS_ring<N>`. The counter is preserved across
//! [`terminate`]/[`initialize`] cycles so directory names never repeat
//! within one process lifetime. Names derived from the wall clock are not
//! unique if the clock is adjusted backward; the counter suffix keeps them
//! distinct in practice.
//!
//! ```no_run
//! use daq_ringstore::{RingWriter, RingWriterConfig};
//!
//! let mut writer = RingWriter::new();
//! writer.initialize(
//!     RingWriterConfig::builder()
//!         .root_dir("/data/recordings")
//!         .sample_size(8)
//!         .samples_per_file(1000)
//!         .num_files(4)
//!         .build(),
//! );
//!
//! // Called once per control cycle.
//! let pending = writer.add_sample(&[0u8; 8], false);
//! println!("open: {}, pending: {}", writer.is_open(), pending);
//!
//! writer.terminate();
//! ```
//!
//! [`add_sample`]: RingWriter::add_sample
//! [`initialize`]: RingWriter::initialize
//! [`terminate`]: RingWriter::terminate

use crate::config::RingWriterConfig;
use crate::file_set::RingFileSet;
use crate::queue::{QueuedSample, SampleQueue};
use crate::worker::NotifyWorker;
use chrono::Utc;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
struct Layout {
    sample_size: usize,
    samples_per_file: usize,
    num_files: usize,
}

/// State owned by the writer thread while it processes a batch.
///
/// The mutex around this state is held by the worker during a drain and by
/// [`RingWriter::terminate`] after the worker has been joined; the
/// producer-facing call path never touches it.
#[derive(Debug, Default)]
struct DrainState {
    root_dir: PathBuf,
    layout: Option<Layout>,
    ring_counter: u64,
    file_set: RingFileSet,
}

#[derive(Default)]
struct Shared {
    queue: SampleQueue,
    drain: Mutex<DrainState>,
    /// Sample size in bytes; 0 while uninitialized. Read lock-free by
    /// `add_sample`.
    sample_size: AtomicUsize,
    /// Mirror of the file set's open status for lock-free monitoring.
    ring_open: AtomicBool,
}

/// Asynchronous ring buffer writer for fixed-size samples.
///
/// The writer accepts samples from a hard-real-time caller without ever
/// blocking on the filesystem and persists them to a bounded set of
/// rotating files on a background thread. See the
/// [module documentation](self) for the lifecycle.
pub struct RingWriter {
    shared: Arc<Shared>,
    worker: Option<NotifyWorker>,
}

impl RingWriter {
    /// Create an uninitialized writer.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            worker: None,
        }
    }

    /// Store the layout parameters and start the writer thread.
    ///
    /// No files are opened here; the first ring instance is created lazily
    /// when the first sample reaches the writer thread. Zero-valued layout
    /// parameters are clamped to 1, never rejected. Initializing an
    /// already-initialized writer terminates the previous session first;
    /// the ring-instance counter carries over.
    pub fn initialize(&mut self, config: RingWriterConfig) {
        if self.worker.is_some() {
            self.terminate();
        }

        let config = config.normalized();
        {
            let mut drain = self.shared.drain.lock();
            drain.root_dir = config.root_dir.clone();
            drain.layout = Some(Layout {
                sample_size: config.sample_size,
                samples_per_file: config.samples_per_file,
                num_files: config.num_files,
            });
        }
        self.shared
            .sample_size
            .store(config.sample_size, Ordering::Release);

        let shared = Arc::clone(&self.shared);
        self.worker = Some(NotifyWorker::spawn(
            move || drain_pending(&shared),
            config.worker_priority,
        ));

        info!(
            root_dir = %config.root_dir.display(),
            sample_size = config.sample_size,
            samples_per_file = config.samples_per_file,
            num_files = config.num_files,
            "initialized ring writer"
        );
    }

    /// Enqueue one sample and wake the writer thread.
    ///
    /// Copies `sample_size` bytes into the queue (shorter input is
    /// zero-padded, longer input truncated) and returns the number of
    /// samples now waiting for the writer thread — backpressure visibility
    /// for the caller. With `start_new_ring` set, the current ring
    /// instance is closed and a fresh one opened before this sample is
    /// written, making it the first sample of the new instance.
    ///
    /// This is the per-cycle call of the real-time host: it takes the
    /// queue lock for an append, signals the worker, and returns. It never
    /// performs I/O and never waits on the writer thread. Returns 0 when
    /// the writer is not initialized.
    pub fn add_sample(&self, sample: &[u8], start_new_ring: bool) -> usize {
        let Some(worker) = self.worker.as_ref() else {
            return 0;
        };
        let sample_size = self.shared.sample_size.load(Ordering::Acquire);
        if sample_size == 0 {
            return 0;
        }

        let mut data = vec![0u8; sample_size];
        let copied = sample.len().min(sample_size);
        data[..copied].copy_from_slice(&sample[..copied]);

        let depth = self.shared.queue.push(QueuedSample {
            data,
            start_new_ring,
        });
        worker.notify();
        depth
    }

    /// Whether a ring instance is currently open.
    ///
    /// A relaxed snapshot for monitoring only; it is not synchronized with
    /// the writer thread and may lag an in-progress open or rotation.
    pub fn is_open(&self) -> bool {
        self.shared.ring_open.load(Ordering::Relaxed)
    }

    /// Number of samples waiting for the writer thread.
    pub fn pending_samples(&self) -> usize {
        self.shared.queue.len()
    }

    /// Stop the writer thread, flush everything still queued, and close
    /// the ring instance.
    ///
    /// Joins through any in-flight drain, then synchronously writes the
    /// samples enqueued in the interim so an ordered shutdown loses no
    /// data. The configuration is reset; the ring-instance counter is
    /// preserved so a later [`initialize`](Self::initialize) continues the
    /// directory numbering.
    pub fn terminate(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.stop();
        }

        let mut drain = self.shared.drain.lock();

        let remaining = self.shared.queue.drain_all();
        if !remaining.is_empty() {
            let unwritten = write_batch(&mut drain, &self.shared.ring_open, remaining);
            if !unwritten.is_empty() {
                warn!(
                    count = unwritten.len(),
                    "discarding samples that could not be written during terminate"
                );
            }
        }

        if let Err(error) = drain.file_set.close() {
            error!(%error, "failed to close ring file set during terminate");
        }
        self.shared.ring_open.store(false, Ordering::Relaxed);

        drain.layout = None;
        drain.root_dir = PathBuf::new();
        drop(drain);
        self.shared.sample_size.store(0, Ordering::Release);

        debug!("terminated ring writer");
    }
}

impl Default for RingWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RingWriter {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Drain callback, executed only on the writer thread.
fn drain_pending(shared: &Shared) {
    let batch = shared.queue.drain_all();
    let mut drain = shared.drain.lock();
    let unwritten = write_batch(&mut drain, &shared.ring_open, batch);
    drop(drain);
    // Samples stay in memory until an instance opens; the next
    // notification retries.
    shared.queue.requeue_front(unwritten);
}

/// Write a drained batch, opening and rotating ring instances as needed.
///
/// Returns the unwritten tail of the batch when no ring instance could be
/// opened; the caller decides whether to requeue or discard it.
fn write_batch(
    state: &mut DrainState,
    ring_open: &AtomicBool,
    mut batch: Vec<QueuedSample>,
) -> Vec<QueuedSample> {
    let Some(layout) = state.layout.clone() else {
        return Vec::new();
    };

    if !state.file_set.is_open() && !open_next_ring(state, &layout, ring_open) {
        return batch;
    }

    let mut index = 0;
    while index < batch.len() {
        if batch[index].start_new_ring {
            if let Err(error) = state.file_set.close() {
                error!(%error, "failed to close ring instance on rotation");
            }
            ring_open.store(false, Ordering::Relaxed);
            if !open_next_ring(state, &layout, ring_open) {
                return batch.split_off(index);
            }
        }
        if let Err(error) = state.file_set.write(&batch[index].data) {
            error!(%error, "failed to write sample");
        }
        index += 1;
    }
    Vec::new()
}

/// Advance the instance counter and open the next ring instance.
///
/// The counter names attempts, not successes: a failed open consumes a
/// counter value, exactly as the next retry will consume another.
fn open_next_ring(state: &mut DrainState, layout: &Layout, ring_open: &AtomicBool) -> bool {
    state.ring_counter += 1;
    let directory = state
        .root_dir
        .join(instance_directory_name(state.ring_counter));

    match state.file_set.open(
        &directory,
        layout.sample_size,
        layout.samples_per_file,
        layout.num_files,
    ) {
        Ok(()) => {
            ring_open.store(true, Ordering::Relaxed);
            info!(
                directory = %directory.display(),
                ring = state.ring_counter,
                "opened ring instance"
            );
            true
        }
        Err(error) => {
            warn!(
                %error,
                ring = state.ring_counter,
                "could not open ring instance; samples remain queued"
            );
            false
        }
    }
}

/// Subdirectory name for a ring instance: UTC time plus instance counter.
fn instance_directory_name(counter: u64) -> String {
    format!("{}_ring{}", Utc::now().format("%Y%m%d_%H%M%S"), counter)
}
