//! Configuration for the ring buffer writer.
//!
//! The layout parameters mirror the on-disk format: each ring instance is a
//! directory of `num_files` files, each holding `samples_per_file` slots of
//! `sample_size` bytes. Zero-valued parameters are tolerated and clamped to
//! 1 rather than rejected, so a degenerate configuration records a 1-byte,
//! 1-slot, 1-file ring instead of failing the real-time host.
//!
//! ```no_run
//! use daq_ringstore::RingWriterConfig;
//!
//! let config = RingWriterConfig::builder()
//!     .root_dir("/data/recordings")
//!     .sample_size(256)
//!     .samples_per_file(10_000)
//!     .num_files(8)
//!     .worker_priority(40)
//!     .build();
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for a [`RingWriter`].
///
/// [`RingWriter`]: crate::RingWriter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RingWriterConfig {
    /// Folder under which ring instance subdirectories are created.
    pub root_dir: PathBuf,
    /// Size of each sample in bytes.
    pub sample_size: usize,
    /// Number of sample slots per buffer file.
    pub samples_per_file: usize,
    /// Number of buffer files per ring instance.
    pub num_files: usize,
    /// `SCHED_FIFO` priority requested for the writer thread.
    ///
    /// `None` keeps the default scheduling policy. Setting the priority is
    /// best-effort: failure is logged and ignored.
    pub worker_priority: Option<i32>,
}

impl Default for RingWriterConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            sample_size: 1,
            samples_per_file: 1,
            num_files: 1,
            worker_priority: None,
        }
    }
}

impl RingWriterConfig {
    /// Create a new builder for the writer configuration.
    pub fn builder() -> RingWriterConfigBuilder {
        RingWriterConfigBuilder::default()
    }

    /// Capacity of a single buffer file in bytes.
    pub fn file_capacity(&self) -> usize {
        let n = self.normalized();
        n.samples_per_file * n.sample_size
    }

    /// Total number of sample slots across all files of one ring instance.
    pub fn total_slots(&self) -> usize {
        let n = self.normalized();
        n.samples_per_file * n.num_files
    }

    /// Copy of this configuration with zero-valued layout parameters
    /// clamped to 1.
    pub(crate) fn normalized(&self) -> Self {
        Self {
            root_dir: self.root_dir.clone(),
            sample_size: self.sample_size.max(1),
            samples_per_file: self.samples_per_file.max(1),
            num_files: self.num_files.max(1),
            worker_priority: self.worker_priority,
        }
    }
}

/// Builder for [`RingWriterConfig`].
#[derive(Debug, Default)]
pub struct RingWriterConfigBuilder {
    config: RingWriterConfig,
}

impl RingWriterConfigBuilder {
    /// Set the folder under which ring instances are created.
    pub fn root_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.config.root_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the sample size in bytes.
    pub fn sample_size(mut self, bytes: usize) -> Self {
        self.config.sample_size = bytes;
        self
    }

    /// Set the number of sample slots per buffer file.
    pub fn samples_per_file(mut self, samples: usize) -> Self {
        self.config.samples_per_file = samples;
        self
    }

    /// Set the number of buffer files per ring instance.
    pub fn num_files(mut self, files: usize) -> Self {
        self.config.num_files = files;
        self
    }

    /// Request a `SCHED_FIFO` priority for the writer thread.
    pub fn worker_priority(mut self, priority: i32) -> Self {
        self.config.worker_priority = Some(priority);
        self
    }

    /// Finish the builder.
    pub fn build(self) -> RingWriterConfig {
        self.config
    }
}
