//! Resource download seam.
//!
//! The reconciler only decides *what* to fetch and where it lands; the actual
//! transfer sits behind [`ResourceDownloader`] so tests can swap in a
//! recording stub. The shipped implementation is the blocking curl adapter in
//! [`http`].

pub mod http;

use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level failure (connect, DNS, reset) during the transfer.
    #[error("network: {0}")]
    Network(#[from] curl::Error),

    /// The server answered with a non-2xx status.
    #[error("GET {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u32 },

    /// Transfer completed but the byte count differs from the declared
    /// content length. Reported as a failure for this resource only.
    #[error("size mismatch: expected {expected} bytes, wrote {received}")]
    SizeMismatch { expected: u64, received: u64 },

    /// Destination file could not be created or written.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of a successful fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Bytes were transferred to the destination file.
    Downloaded(u64),
    /// The destination file already matched the remote size; nothing fetched.
    AlreadyComplete,
}

/// Fetches one resource into a destination directory.
pub trait ResourceDownloader {
    /// Fetches `url` into `<dest_dir>/<filename>`.
    ///
    /// With `force` false, an existing destination file whose size equals the
    /// remote content length is left untouched.
    fn fetch(
        &self,
        url: &str,
        dest_dir: &Path,
        filename: &str,
        force: bool,
    ) -> Result<FetchOutcome, DownloadError>;
}
