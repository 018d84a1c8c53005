//! Resource download with mirror fallback.

use crate::error::SetupError;
use crate::progress::DownloadReporter;
use crate::types::{display_name, DownloadTarget, FetchConfig};
use futures_util::StreamExt;
use md5::{Digest, Md5};
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, error, info, warn};

/// Downloads resources over HTTP(S).
///
/// # Example
///
/// ```no_run
/// use prereq::{DownloadTarget, FetchConfig, Fetcher};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = Fetcher::new(FetchConfig::default())?;
/// let target = DownloadTarget::new(
///     vec![
///         "https://primary.example.com/ninja.zip".to_string(),
///         "https://mirror.example.com/ninja.zip".to_string(),
///     ],
///     "vendor/ninja/ninja.zip",
/// );
/// fetcher.fetch(&target, &|_received: u64, _total: Option<u64>| {}).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self, SetupError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent);
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Downloads `target` to its destination, trying each candidate URL in order.
    ///
    /// A failed candidate has its partial file removed before the next one is
    /// tried; a cleanup failure is logged and does not stop the remaining mirrors.
    /// Each candidate is attempted once. If none succeeds the call fails with
    /// `DownloadFailed` naming the destination.
    ///
    /// # Returns
    ///
    /// The destination path on success.
    pub async fn fetch(
        &self,
        target: &DownloadTarget,
        reporter: &dyn DownloadReporter,
    ) -> Result<PathBuf, SetupError> {
        let destination = &target.destination;
        let candidates = target.source.candidates();
        if candidates.is_empty() {
            return Err(SetupError::DownloadFailed(format!(
                "no candidate URLs for {}",
                destination.display()
            )));
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut last_error = None;
        for (index, url) in candidates.iter().enumerate() {
            info!(
                "Downloading {} to {} ({}/{})",
                url,
                destination.display(),
                index + 1,
                candidates.len()
            );
            match self
                .download_file(url, destination, target.md5.as_deref(), reporter)
                .await
            {
                Ok(bytes) => {
                    info!("✅ Downloaded {} ({} bytes)", target.display_name(), bytes);
                    return Ok(destination.clone());
                }
                Err(e) => {
                    if let Err(cleanup) = remove_partial(destination).await {
                        warn!(
                            "Could not remove partial download {}: {}",
                            destination.display(),
                            cleanup
                        );
                    }
                    if index + 1 < candidates.len() {
                        warn!("Failed to download {}: {}. Trying next mirror", url, e);
                    } else {
                        warn!("Failed to download {}: {}", url, e);
                    }
                    last_error = Some(e);
                }
            }
        }

        error!("❌ All {} candidate URL(s) failed", candidates.len());
        Err(SetupError::DownloadFailed(match last_error {
            Some(e) => format!("{} (last error: {})", destination.display(), e),
            None => destination.display().to_string(),
        }))
    }

    /// Streams one URL to `filename`, hashing as it writes when a digest is expected.
    ///
    /// Returns the number of bytes written. Leaves cleanup to the caller.
    async fn download_file(
        &self,
        url: &str,
        filename: &Path,
        expected_md5: Option<&str>,
        reporter: &dyn DownloadReporter,
    ) -> Result<u64, SetupError> {
        let mut file = BufWriter::new(tokio::fs::File::create(filename).await?);
        let response = self.client.get(url).send().await?.error_for_status()?;
        let content_length = response.content_length();
        if content_length.is_none() {
            debug!("Content-Length header was not present for {}", url);
        }

        let mut hasher = expected_md5.map(|_| Md5::new());
        let mut received = 0u64;
        let mut byte_stream = response.bytes_stream();

        while let Some(piece) = byte_stream.next().await {
            let chunk = piece?;
            if let Some(ref mut h) = hasher {
                h.update(&chunk);
            }
            file.write_all(&chunk).await?;
            received += chunk.len() as u64;
            reporter.on_chunk(received, content_length);
        }
        file.flush().await?;

        if let Some(content_length) = content_length {
            if received != content_length {
                warn!(
                    "Size mismatch for {}: server reported {} bytes, received {}",
                    url, content_length, received
                );
            }
        }

        if let (Some(expected), Some(hasher)) = (expected_md5, hasher) {
            let computed = format!("{:x}", hasher.finalize());
            if computed != expected {
                return Err(SetupError::ChecksumMismatch {
                    file: display_name(filename),
                    expected: expected.to_string(),
                    actual: computed,
                });
            }
            debug!("MD5 verified for {}", display_name(filename));
        }

        Ok(received)
    }
}

/// Removes a partially written download, tolerating its absence.
async fn remove_partial(path: &Path) -> Result<(), SetupError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
