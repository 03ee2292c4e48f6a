//! Fixed-slot multi-file set with wraparound.
//!
//! One ring instance on disk is a directory holding `num_files` files
//! (`buffer0.dat` … `buffer<N-1>.dat`), each with room for a fixed number
//! of fixed-size sample slots. Writes land at the current file and offset;
//! when a file fills up it is rewound to its start and the write position
//! moves to the next file, modulo the file count, so the oldest data is
//! overwritten. Closing the set writes a `complete.json` descriptor with
//! the exact cursor position so an out-of-band reader can locate the
//! oldest/newest boundary.

use crate::error::{Result, RingStoreError};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the completion descriptor written on close.
pub const COMPLETION_FILE: &str = "complete.json";

/// Name of the k-th buffer file of a ring instance.
pub fn buffer_file_name(index: usize) -> String {
    format!("buffer{index}.dat")
}

/// Exact write cursor position at the time a ring instance closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WritingPoint {
    /// Index of the file the next write would have targeted.
    pub file_index: u64,
    /// Byte offset within that file.
    pub byte_offset: u64,
}

/// Completion descriptor emitted when a ring instance closes.
///
/// This is the sole recovery aid for readers of the rotating files: it
/// records the layout and where the last write ended, from which the
/// oldest/newest boundary inside the wraparound is computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRecord {
    /// Size of each sample slot in bytes.
    pub bytes_per_sample: u64,
    /// Capacity of each buffer file in bytes.
    pub bytes_per_file: u64,
    /// Number of buffer files in the ring instance.
    pub files_per_ringbuffer: u64,
    /// Cursor position at close time.
    pub writing_point: WritingPoint,
}

#[derive(Debug)]
struct OpenRing {
    directory: PathBuf,
    files: Vec<File>,
    sample_size: usize,
    file_capacity: usize,
    current_file: usize,
    offset: usize,
}

/// A set of pre-created, fixed-capacity files written in a circular order.
///
/// The set is a two-state machine: `Closed` until [`open`] succeeds, `Open`
/// until [`close`]. Opening is all-or-nothing; on any failure nothing is
/// retained and the set stays closed. [`close`] is idempotent and reachable
/// from every path, including drop.
///
/// [`open`]: RingFileSet::open
/// [`close`]: RingFileSet::close
#[derive(Debug, Default)]
pub struct RingFileSet {
    ring: Option<OpenRing>,
}

impl RingFileSet {
    /// Create a closed file set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the file set: create the directory and all buffer files.
    ///
    /// Zero-valued layout parameters are clamped to 1. Fails if the set is
    /// already open, if the directory cannot be created, or if any buffer
    /// file cannot be created; partial progress is rolled back (handles
    /// opened so far are closed and the set remains closed).
    pub fn open(
        &mut self,
        directory: &Path,
        sample_size: usize,
        samples_per_file: usize,
        num_files: usize,
    ) -> Result<()> {
        if let Some(ring) = &self.ring {
            return Err(RingStoreError::AlreadyOpen {
                directory: ring.directory.clone(),
            });
        }

        let sample_size = sample_size.max(1);
        let samples_per_file = samples_per_file.max(1);
        let num_files = num_files.max(1);

        fs::create_dir_all(directory).map_err(|source| RingStoreError::CreateDirectory {
            directory: directory.to_path_buf(),
            source,
        })?;

        let mut files = Vec::with_capacity(num_files);
        for index in 0..num_files {
            let path = directory.join(buffer_file_name(index));
            let file = File::create(&path)
                .map_err(|source| RingStoreError::CreateFile { path, source })?;
            files.push(file);
        }

        debug!(
            directory = %directory.display(),
            sample_size,
            samples_per_file,
            num_files,
            "opened ring file set"
        );

        self.ring = Some(OpenRing {
            directory: directory.to_path_buf(),
            files,
            sample_size,
            file_capacity: samples_per_file * sample_size,
            current_file: 0,
            offset: 0,
        });
        Ok(())
    }

    /// Write one sample slot and advance the cursor.
    ///
    /// The write goes straight through an unbuffered [`File`], so the data
    /// reaches the operating system before this call returns. Reaching the
    /// end of a file rewinds it and advances to the next file, overwriting
    /// the oldest recorded data. A no-op when the set is closed.
    pub fn write(&mut self, sample: &[u8]) -> Result<()> {
        let Some(ring) = self.ring.as_mut() else {
            return Ok(());
        };
        debug_assert_eq!(sample.len(), ring.sample_size);

        let index = ring.current_file;
        ring.files[index]
            .write_all(sample)
            .map_err(|source| RingStoreError::WriteSample {
                file_index: index,
                source,
            })?;

        ring.offset = (ring.offset + ring.sample_size) % ring.file_capacity;
        if ring.offset == 0 {
            ring.files[index].seek(SeekFrom::Start(0)).map_err(|source| {
                RingStoreError::WriteSample {
                    file_index: index,
                    source,
                }
            })?;
            ring.current_file = (index + 1) % ring.files.len();
        }
        Ok(())
    }

    /// Close the file set, writing the completion descriptor.
    ///
    /// All file handles are released and the state is cleared even if the
    /// descriptor cannot be written. A no-op when already closed.
    pub fn close(&mut self) -> Result<()> {
        let Some(ring) = self.ring.take() else {
            return Ok(());
        };

        let record = CompletionRecord {
            bytes_per_sample: ring.sample_size as u64,
            bytes_per_file: ring.file_capacity as u64,
            files_per_ringbuffer: ring.files.len() as u64,
            writing_point: WritingPoint {
                file_index: ring.current_file as u64,
                byte_offset: ring.offset as u64,
            },
        };

        debug!(
            directory = %ring.directory.display(),
            file_index = ring.current_file,
            byte_offset = ring.offset,
            "closing ring file set"
        );

        write_manifest(&ring.directory.join(COMPLETION_FILE), &record)
        // `ring` drops here, closing every buffer file handle.
    }

    /// Whether the file set is currently open.
    ///
    /// A cheap status probe for monitoring; not a synchronization
    /// primitive.
    pub fn is_open(&self) -> bool {
        self.ring.is_some()
    }

    /// Current write cursor as `(file_index, byte_offset)`, if open.
    pub fn writing_point(&self) -> Option<(usize, usize)> {
        self.ring
            .as_ref()
            .map(|ring| (ring.current_file, ring.offset))
    }

    /// Directory of the open ring instance, if any.
    pub fn directory(&self) -> Option<&Path> {
        self.ring.as_ref().map(|ring| ring.directory.as_path())
    }
}

impl Drop for RingFileSet {
    fn drop(&mut self) {
        if self.is_open() {
            if let Err(error) = self.close() {
                debug!(%error, "failed to write completion descriptor on drop");
            }
        }
    }
}

fn write_manifest(path: &Path, record: &CompletionRecord) -> Result<()> {
    let manifest_error = |source| RingStoreError::WriteManifest {
        path: path.to_path_buf(),
        source,
    };

    let mut file =
        File::create(path).map_err(|e| manifest_error(serde_json::Error::io(e)))?;
    serde_json::to_writer_pretty(&mut file, record).map_err(manifest_error)?;
    file.write_all(b"\n")
        .map_err(|e| manifest_error(serde_json::Error::io(e)))?;
    Ok(())
}
