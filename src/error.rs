//! Error types for prerequisite operations.

use std::io;
use thiserror::Error;

/// Errors that can occur while fetching, extracting, or checking prerequisites.
#[derive(Error, Debug)]
pub enum SetupError {
    /// I/O error during file operations.
    #[error(transparent)]
    IoError(#[from] io::Error),

    /// HTTP request error during download.
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),

    /// Every candidate URL for a resource failed.
    #[error("Download failed: {0}")]
    DownloadFailed(String),

    /// Downloaded bytes did not hash to the expected digest.
    #[error("MD5 mismatch for {file}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    /// The archive could not be opened or one of its entries is corrupt.
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    /// A version string had an empty or non-numeric component.
    #[error("Invalid version string '{0}'")]
    InvalidVersion(String),

    /// A tool ran but did not report a recognisable version.
    #[error("Could not determine version of {tool}: {reason}")]
    ToolCheckFailed { tool: String, reason: String },
}
