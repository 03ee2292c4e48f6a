//! Bounded startup byte buffer.
//!
//! Reads a file once during initialization of the real-time application
//! and serves the bytes back on request. Purely synchronous, no
//! concurrency; read failures are absorbed so the host always gets a
//! (possibly empty) buffer instead of an error.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// Binary content of a file read once at startup.
#[derive(Debug, Clone, Default)]
pub struct StartupFile {
    data: Vec<u8>,
}

impl StartupFile {
    /// Read at most `max_bytes` from `path`.
    ///
    /// A missing or unreadable file yields an empty buffer; the failure is
    /// logged and never surfaced to the caller.
    pub fn load<P: AsRef<Path>>(path: P, max_bytes: usize) -> Self {
        let path = path.as_ref();
        let mut data = Vec::new();

        match File::open(path) {
            Ok(file) => {
                if let Err(error) = file.take(max_bytes as u64).read_to_end(&mut data) {
                    warn!(path = %path.display(), %error, "failed to read startup file");
                    data.clear();
                } else {
                    debug!(path = %path.display(), bytes = data.len(), "loaded startup file");
                }
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "failed to open startup file");
            }
        }

        Self { data }
    }

    /// Copy the stored bytes into `out`, truncated to whichever of the
    /// output length and the stored length is smaller. Returns the number
    /// of bytes copied.
    pub fn copy_into(&self, out: &mut [u8]) -> usize {
        let len = self.data.len().min(out.len());
        out[..len].copy_from_slice(&self.data[..len]);
        len
    }

    /// The stored bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Number of bytes read at load time.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing was read.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
