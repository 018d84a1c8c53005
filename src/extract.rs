//! Zip archive extraction with skip-existing semantics and throughput tracking.

use crate::error::SetupError;
use crate::progress::ExtractReporter;
use crate::types::display_name;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use zip::ZipArchive;

/// One file or directory stored in an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    index: usize,
    /// Name as stored in the archive.
    pub name: String,
    /// Path relative to the extraction directory.
    pub path: PathBuf,
    /// Uncompressed size in bytes.
    pub size: u64,
    pub is_dir: bool,
}

/// Entry listing of an archive, in stored order.
#[derive(Debug, Clone, Default)]
pub struct ArchiveContents {
    entries: Vec<ArchiveEntry>,
}

impl ArchiveContents {
    /// Reads the entry table of `archive` without decompressing anything.
    pub fn read<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Self, SetupError> {
        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let file = archive.by_index_raw(index).map_err(|e| {
                SetupError::ExtractionFailed(format!("unreadable entry #{}: {}", index, e))
            })?;
            let path = file.enclosed_name().ok_or_else(|| {
                SetupError::ExtractionFailed(format!(
                    "entry '{}' would be written outside the destination",
                    file.name()
                ))
            })?;
            entries.push(ArchiveEntry {
                index,
                name: file.name().to_string(),
                path,
                size: file.size(),
                is_dir: file.is_dir(),
            });
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of the uncompressed sizes of all entries.
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }
}

/// Running totals for one extraction call.
#[derive(Debug, Clone)]
pub struct ExtractionProgress {
    total_bytes: u64,
    extracted_bytes: u64,
    started: Instant,
}

impl ExtractionProgress {
    pub fn new(total_bytes: u64) -> Self {
        Self {
            total_bytes,
            extracted_bytes: 0,
            started: Instant::now(),
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn extracted_bytes(&self) -> u64 {
        self.extracted_bytes
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn record_extracted(&mut self, bytes: u64) {
        self.extracted_bytes += bytes;
    }

    fn add_to_total(&mut self, bytes: u64) {
        self.total_bytes += bytes;
    }

    fn remove_from_total(&mut self, bytes: u64) {
        self.total_bytes = self.total_bytes.saturating_sub(bytes);
    }

    /// Share of the pending bytes extracted so far; 100 when nothing was pending.
    pub fn percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            return 100.0;
        }
        (self.extracted_bytes as f64 / self.total_bytes as f64 * 100.0).min(100.0)
    }

    /// Average throughput since the extraction started, e.g. `"512.00 KB/s"`.
    pub fn throughput(&self) -> String {
        format_throughput(self.extracted_bytes, self.elapsed())
    }
}

/// Formats `bytes` over `elapsed` as KB/s, switching to MB/s above 1024 KB/s.
pub fn format_throughput(bytes: u64, elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    let kb_per_sec = if secs > 0.0 {
        bytes as f64 / 1024.0 / secs
    } else {
        0.0
    };
    if kb_per_sec > 1024.0 {
        format!("{:.2} MB/s", kb_per_sec / 1024.0)
    } else {
        format!("{:.2} KB/s", kb_per_sec)
    }
}

/// Outcome of one extraction call.
#[derive(Debug, Clone)]
pub struct ExtractionSummary {
    /// Bytes that needed extracting (entries absent from disk).
    pub total_bytes: u64,
    pub extracted_bytes: u64,
    pub extracted_entries: usize,
    pub skipped_entries: usize,
    pub elapsed: Duration,
}

/// Extracts a zip archive into the directory that contains it.
///
/// Entries whose target path already exists are left untouched and do not count
/// towards the progress total, so an interrupted extraction can simply be run
/// again. `reporter` is called after every entry with the percentage of pending
/// bytes done and the average throughput.
///
/// # Arguments
///
/// * `archive_path` - Path to the zip file
/// * `delete_archive_after` - Remove the zip file once every entry is in place
/// * `reporter` - Progress callback
///
/// # Returns
///
/// A summary of what was extracted, or `ExtractionFailed` if the archive cannot
/// be read. Files extracted before a corrupt entry remain on disk.
pub fn extract_archive(
    archive_path: &Path,
    delete_archive_after: bool,
    reporter: &dyn ExtractReporter,
) -> Result<ExtractionSummary, SetupError> {
    let destination = match archive_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let archive_name = display_name(archive_path);

    let file = File::open(archive_path).map_err(|e| {
        SetupError::ExtractionFailed(format!("cannot open {}: {}", archive_path.display(), e))
    })?;
    let mut archive = ZipArchive::new(BufReader::with_capacity(1024 * 1024, file))
        .map_err(|e| SetupError::ExtractionFailed(format!("{}: {}", archive_name, e)))?;
    let contents = ArchiveContents::read(&mut archive)?;

    // Pending entries are decided once, up front, so the denominator is fixed
    // before the first report.
    let pending: Vec<bool> = contents
        .entries()
        .iter()
        .map(|entry| !entry.is_dir && !destination.join(&entry.path).exists())
        .collect();
    let total_bytes: u64 = contents
        .entries()
        .iter()
        .zip(&pending)
        .filter(|(_, pending)| **pending)
        .map(|(entry, _)| entry.size)
        .sum();

    info!(
        "📂 Extracting {} ({} entries, {} bytes pending) to {}",
        archive_name,
        contents.len(),
        total_bytes,
        destination.display()
    );

    let mut progress = ExtractionProgress::new(total_bytes);
    let mut extracted_entries = 0usize;
    let mut skipped_entries = 0usize;

    for (entry, was_pending) in contents.entries().iter().zip(pending) {
        let target = destination.join(&entry.path);

        if entry.is_dir {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }

            if target.exists() {
                if was_pending {
                    progress.remove_from_total(entry.size);
                }
                debug!("Skipping existing {}", target.display());
                skipped_entries += 1;
            } else {
                if !was_pending {
                    progress.add_to_total(entry.size);
                }
                extract_entry(&mut archive, entry, &target)?;
                progress.record_extracted(entry.size);
                extracted_entries += 1;
            }
        }

        reporter.on_progress(progress.percentage(), &progress.throughput());
    }

    if contents.is_empty() {
        reporter.on_progress(progress.percentage(), &progress.throughput());
    }

    let summary = ExtractionSummary {
        total_bytes: progress.total_bytes(),
        extracted_bytes: progress.extracted_bytes(),
        extracted_entries,
        skipped_entries,
        elapsed: progress.elapsed(),
    };

    info!(
        "✅ Extracted {} files from {} ({} already present) in {}",
        extracted_entries,
        archive_name,
        skipped_entries,
        humantime::format_duration(Duration::from_millis(summary.elapsed.as_millis() as u64))
    );

    if delete_archive_after {
        std::fs::remove_file(archive_path)?;
        debug!("Removed {}", archive_path.display());
    }

    Ok(summary)
}

/// Writes one entry to `target`; a half-written file is removed on failure so a
/// later run does not mistake it for a finished one.
fn extract_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    entry: &ArchiveEntry,
    target: &Path,
) -> Result<(), SetupError> {
    let corrupt = |e: &dyn std::fmt::Display| {
        SetupError::ExtractionFailed(format!("corrupt entry '{}': {}", entry.name, e))
    };

    let mut zip_file = archive.by_index(entry.index).map_err(|e| corrupt(&e))?;
    let mut out = File::create(target)?;
    if let Err(e) = io::copy(&mut zip_file, &mut out) {
        drop(out);
        let _ = std::fs::remove_file(target);
        return Err(corrupt(&e));
    }

    #[cfg(unix)]
    if let Some(mode) = zip_file.unix_mode() {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(target, std::fs::Permissions::from_mode(mode & 0o777))?;
    }

    Ok(())
}
