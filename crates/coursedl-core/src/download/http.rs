//! Blocking HTTP downloader: HEAD probe, streamed GET, size verification.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use super::{DownloadError, FetchOutcome, ResourceDownloader};

/// curl-backed [`ResourceDownloader`].
///
/// A HEAD probe fetches the declared content length first, both to skip
/// already-complete files and to verify the byte count after the GET. The GET
/// itself has no overall timeout: resource archives can be large and the
/// transfer is bounded by network conditions alone.
#[derive(Debug, Default)]
pub struct HttpDownloader;

impl HttpDownloader {
    pub fn new() -> Self {
        HttpDownloader
    }

    /// HEAD probe for the declared content length, if the server sends one.
    fn probe_content_length(&self, url: &str) -> Result<Option<u64>, DownloadError> {
        let mut content_length = None;

        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.nobody(true)?;
        easy.follow_location(true)?;
        easy.connect_timeout(Duration::from_secs(30))?;
        easy.timeout(Duration::from_secs(60))?;

        {
            let mut transfer = easy.transfer();
            transfer.header_function(|line| {
                if let Ok(line) = std::str::from_utf8(line) {
                    if let Some((name, value)) = line.split_once(':') {
                        if name.trim().eq_ignore_ascii_case("content-length") {
                            content_length = value.trim().parse::<u64>().ok();
                        }
                    }
                }
                true
            })?;
            transfer.perform()?;
        }

        let status = easy.response_code()?;
        if !(200..300).contains(&status) {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }
        Ok(content_length)
    }
}

impl ResourceDownloader for HttpDownloader {
    fn fetch(
        &self,
        url: &str,
        dest_dir: &Path,
        filename: &str,
        force: bool,
    ) -> Result<FetchOutcome, DownloadError> {
        std::fs::create_dir_all(dest_dir)?;
        let target = dest_dir.join(filename);

        let expected = self.probe_content_length(url)?;

        if !force {
            if let (Ok(meta), Some(expected)) = (target.metadata(), expected) {
                if meta.len() == expected {
                    tracing::debug!(path = %target.display(), "already downloaded, skipping");
                    return Ok(FetchOutcome::AlreadyComplete);
                }
            }
        }

        let mut file = File::create(&target)?;
        let mut written: u64 = 0;
        let mut write_err: Option<std::io::Error> = None;

        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(Duration::from_secs(30))?;

        let perform_result = {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                match file.write_all(data) {
                    Ok(()) => {
                        written += data.len() as u64;
                        Ok(data.len())
                    }
                    Err(e) => {
                        write_err = Some(e);
                        Ok(0) // abort transfer
                    }
                }
            })?;
            transfer.perform()
        };

        // A write failure aborts the transfer, which curl reports as its own
        // error; surface the underlying IO error instead.
        if let Some(e) = write_err {
            return Err(DownloadError::Io(e));
        }
        perform_result?;

        let status = easy.response_code()?;
        if !(200..300).contains(&status) {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }

        if let Some(expected) = expected {
            if written != expected {
                return Err(DownloadError::SizeMismatch {
                    expected,
                    received: written,
                });
            }
        }

        tracing::debug!(url, path = %target.display(), bytes = written, "download complete");
        Ok(FetchOutcome::Downloaded(written))
    }
}
