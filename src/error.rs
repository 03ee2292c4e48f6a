//! Error types for ring buffer storage operations.
//!
//! All errors stay inside the crate: nothing on the producer-facing call
//! path returns them. The background writer absorbs failures, logs them,
//! and surfaces the aggregate state through [`RingWriter::is_open`].
//!
//! [`RingWriter::is_open`]: crate::RingWriter::is_open

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ring storage operations.
pub type Result<T> = std::result::Result<T, RingStoreError>;

/// Errors that can occur while managing the on-disk ring buffer files.
#[derive(Error, Debug)]
pub enum RingStoreError {
    /// A file set is already open; it must be closed before reopening.
    #[error("Ring file set is already open in '{directory}'")]
    AlreadyOpen {
        /// Directory of the currently open ring instance.
        directory: PathBuf,
    },

    /// The ring instance directory could not be created.
    #[error("Failed to create ring directory '{directory}': {source}")]
    CreateDirectory {
        /// Directory that could not be created.
        directory: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// One of the buffer files could not be created for writing.
    #[error("Failed to create buffer file '{path}': {source}")]
    CreateFile {
        /// Path of the file that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Writing a sample slot failed.
    #[error("Failed to write sample to file index {file_index}: {source}")]
    WriteSample {
        /// Index of the file the write targeted.
        file_index: usize,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The completion descriptor could not be written on close.
    #[error("Failed to write completion descriptor '{path}': {source}")]
    WriteManifest {
        /// Path of the `complete.json` file.
        path: PathBuf,
        /// Underlying serialization or I/O error.
        source: serde_json::Error,
    },

    /// I/O error from the operating system.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
