//! Asynchronous multi-file ring buffer storage for real-time sample
//! streams.
//!
//! This crate persists fixed-size samples produced by a hard-real-time
//! control loop without ever blocking the producer on disk I/O. Samples
//! are copied into a mutex-protected queue and a dedicated writer thread,
//! woken by a condition variable, drains the queue and writes the samples
//! into a bounded set of rotating files. Only the most recent
//! `num_files × samples_per_file` samples are retained; older data is
//! silently overwritten.
//!
//! # Architecture
//!
//! ```text
//! real-time caller ──add_sample──▶ SampleQueue ──notify──▶ writer thread
//!                                                              │
//!                                                        drain + write
//!                                                              ▼
//!                        <root>/<UTC>_ring<N>/buffer0.dat … bufferK.dat
//!                                             complete.json (on close)
//! ```
//!
//! - [`RingWriter`] — the controller the host calls per control cycle:
//!   `initialize` / `add_sample` / `is_open` / `terminate`.
//! - [`RingFileSet`] — the fixed-slot file set with wraparound and the
//!   [`CompletionRecord`] descriptor written on close.
//! - [`StartupFile`] — a bounded byte buffer read once at startup.
//!
//! # Example
//!
//! ```no_run
//! use daq_ringstore::{RingWriter, RingWriterConfig};
//!
//! let mut writer = RingWriter::new();
//! writer.initialize(
//!     RingWriterConfig::builder()
//!         .root_dir("/data/recordings")
//!         .sample_size(16)
//!         .samples_per_file(50_000)
//!         .num_files(10)
//!         .worker_priority(40)
//!         .build(),
//! );
//!
//! let sample = [0u8; 16];
//! let pending = writer.add_sample(&sample, false);
//! println!("open: {}, pending: {}", writer.is_open(), pending);
//!
//! writer.terminate();
//! ```

pub mod config;
pub mod error;
pub mod file_set;
pub mod ring_writer;
pub mod startup_file;

mod queue;
mod worker;

pub use config::{RingWriterConfig, RingWriterConfigBuilder};
pub use error::{Result, RingStoreError};
pub use file_set::{CompletionRecord, RingFileSet, WritingPoint, COMPLETION_FILE};
pub use ring_writer::RingWriter;
pub use startup_file::StartupFile;
