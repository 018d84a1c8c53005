//! Local file verification used to skip downloads that are already in place.

use crate::error::SetupError;
use crate::types::display_name;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Computes the MD5 hash of a local file.
///
/// Reads in 1 MiB chunks on a blocking thread so large archives neither sit in
/// memory nor stall the async runtime.
///
/// # Returns
///
/// The MD5 hash as a lowercase hexadecimal string, or an error.
pub async fn compute_file_md5(path: &Path) -> Result<String, SetupError> {
    let path: PathBuf = path.to_path_buf();

    tokio::task::spawn_blocking(move || {
        use md5::{Digest, Md5};
        use std::io::Read;

        let file = std::fs::File::open(&path)?;
        let mut reader = std::io::BufReader::with_capacity(1024 * 1024, file);
        let mut hasher = Md5::new();
        let mut buffer = vec![0u8; 1024 * 1024];

        loop {
            let n = reader.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok::<String, SetupError>(format!("{:x}", hasher.finalize()))
    })
    .await
    .map_err(|e| SetupError::IoError(std::io::Error::other(format!("Task join error: {}", e))))?
}

/// Decides whether an existing local file can stand in for a download.
///
/// # Returns
///
/// `Ok(false)` if the file is missing or its MD5 differs from `expected_md5`,
/// `Ok(true)` if it exists and either matches or no digest was given.
pub async fn verify_local_file(
    path: &Path,
    expected_md5: Option<&str>,
) -> Result<bool, SetupError> {
    let file_display_name = display_name(path);

    let local_metadata = match tokio::fs::metadata(path).await {
        Ok(m) if m.is_file() => m,
        _ => return Ok(false),
    };

    let Some(expected) = expected_md5 else {
        info!(
            "✅ File {} trusted (exists, {} bytes, no checksum)",
            file_display_name,
            local_metadata.len()
        );
        return Ok(true);
    };

    match compute_file_md5(path).await {
        Ok(local_md5) if local_md5.eq_ignore_ascii_case(expected) => {
            info!("✅ File {} verified (MD5 match)", file_display_name);
            Ok(true)
        }
        Ok(local_md5) => {
            info!(
                "❌ MD5 mismatch for {}: local={}, expected={}",
                file_display_name, local_md5, expected
            );
            Ok(false)
        }
        Err(e) => {
            warn!("⚠️  Failed to compute MD5 for {}: {}", file_display_name, e);
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // md5("hello world")
    const HELLO_MD5: &str = "5eb63bbbe01eeed093cb22bb8f5acdc3";

    #[tokio::test]
    async fn hashes_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, b"hello world").unwrap();

        assert_eq!(compute_file_md5(&path).await.unwrap(), HELLO_MD5);
    }

    #[tokio::test]
    async fn verifies_against_expected_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");

        assert!(!verify_local_file(&path, None).await.unwrap());

        std::fs::write(&path, b"hello world").unwrap();
        assert!(verify_local_file(&path, None).await.unwrap());
        assert!(verify_local_file(&path, Some(HELLO_MD5)).await.unwrap());
        assert!(verify_local_file(&path, Some(HELLO_MD5.to_uppercase().as_str()))
            .await
            .unwrap());
        assert!(!verify_local_file(&path, Some("00000000000000000000000000000000"))
            .await
            .unwrap());
    }
}
