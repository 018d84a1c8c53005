//! Main orchestration logic for preparing a checkout.

use crate::config::{ResourceSpec, SetupManifest};
use crate::download::Fetcher;
use crate::env::EnvironmentStore;
use crate::error::SetupError;
use crate::extract::{extract_archive, ExtractionSummary};
use crate::progress::{DownloadBar, ExtractBar};
use crate::toolchain::{check_tool, ToolStatus};
use crate::types::{SetupStage, UrlSource};
use crate::verify::verify_local_file;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What happened to one resource.
#[derive(Debug, Clone)]
pub enum ResourceOutcome {
    /// The destination was already present (and matched its checksum), or an
    /// archive resource was already extracted from the same source.
    AlreadyPresent(PathBuf),
    /// Downloaded and left as-is.
    Downloaded(PathBuf),
    /// Downloaded and extracted.
    Extracted(PathBuf, ExtractionSummary),
}

/// Result of a setup run.
#[derive(Debug, Clone, Default)]
pub struct SetupReport {
    pub tools: Vec<(String, ToolStatus)>,
    pub resources: Vec<(String, ResourceOutcome)>,
}

impl SetupReport {
    /// False if any checked tool is missing or too old.
    pub fn is_satisfied(&self) -> bool {
        self.tools.iter().all(|(_, status)| status.is_satisfied())
    }

    pub fn unsatisfied_tools(&self) -> impl Iterator<Item = (&str, &ToolStatus)> {
        self.tools
            .iter()
            .filter(|(_, status)| !status.is_satisfied())
            .map(|(name, status)| (name.as_str(), status))
    }
}

/// Checks tools and fetches resources listed in a manifest.
///
/// This is the main entry point for preparing a checkout. It performs the
/// following steps:
///
/// 1. Checks every required tool's version (reported, not installed)
/// 2. Downloads each resource from its mirrors, skipping ones already in place
/// 3. Extracts resources marked as archives next to the download
///
/// A completed extraction leaves a `<archive>.extracted` marker recording the
/// source it came from. While the marker matches the manifest entry the
/// resource is reported as [`ResourceOutcome::AlreadyPresent`] and neither
/// fetched nor extracted again, even when its archive was deleted.
///
/// # Arguments
///
/// * `manifest` - Tools and resources to process
/// * `root` - Directory relative resource destinations resolve against
/// * `fetcher` - HTTP downloader
/// * `stage` - Execution stage control
/// * `env` - Environment used to resolve tool overrides
///
/// # Returns
///
/// A report of tool statuses and resource outcomes. Missing tools do not fail the
/// run; a resource that cannot be fetched or extracted does.
pub async fn run_setup(
    manifest: &SetupManifest,
    root: &Path,
    fetcher: &Fetcher,
    stage: SetupStage,
    env: &dyn EnvironmentStore,
) -> Result<SetupReport, SetupError> {
    let mut report = SetupReport::default();

    if stage.checks_tools() {
        info!("🔍 Checking {} tool(s)", manifest.tools.len());
        for tool in &manifest.tools {
            let status = check_tool(tool, env).await?;
            report.tools.push((tool.name.clone(), status));
        }
    } else {
        info!("Skipping tool checks");
    }

    if stage.fetches_resources() {
        info!("📦 Preparing {} resource(s)", manifest.resources.len());
        for resource in &manifest.resources {
            let target = resource.target(root);
            let destination = target.destination.clone();

            if resource.extract {
                let marker = ExtractionMarker::for_resource(resource);
                if marker.matches(&destination).await {
                    info!("{} already extracted next to {}", resource.name, destination.display());
                    report.resources.push((
                        resource.name.clone(),
                        ResourceOutcome::AlreadyPresent(destination),
                    ));
                    continue;
                }
            }

            let present = verify_local_file(&destination, target.md5.as_deref()).await?;
            if present {
                info!("{} already present at {}", resource.name, destination.display());
            } else {
                let bar = DownloadBar::new(&resource.name);
                if let Err(e) = fetcher.fetch(&target, &bar).await {
                    bar.abandon(format!("❌ {} failed", resource.name));
                    return Err(e);
                }
                bar.finish(format!("✅ {}", resource.name));
            }

            if !resource.extract {
                let outcome = if present {
                    ResourceOutcome::AlreadyPresent(destination)
                } else {
                    ResourceOutcome::Downloaded(destination)
                };
                report.resources.push((resource.name.clone(), outcome));
                continue;
            }

            // A kept archive may belong to an interrupted extraction; re-running
            // only writes the entries that are still missing.
            let summary = extract_in_background(
                destination.clone(),
                !resource.keep_archive,
                resource.name.clone(),
            )
            .await?;
            ExtractionMarker::for_resource(resource).write(&destination).await?;
            report.resources.push((
                resource.name.clone(),
                ResourceOutcome::Extracted(destination, summary),
            ));
        }
    } else {
        info!("Skipping resources");
    }

    for (name, status) in report.unsatisfied_tools() {
        warn!("{}: {}", name, status);
    }

    Ok(report)
}

/// Records which source an archive resource was extracted from.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
struct ExtractionMarker {
    url: UrlSource,
    md5: Option<String>,
}

impl ExtractionMarker {
    fn for_resource(resource: &ResourceSpec) -> Self {
        Self {
            url: resource.url.clone(),
            md5: resource.md5.as_ref().map(|md5| md5.to_ascii_lowercase()),
        }
    }

    fn path(archive: &Path) -> PathBuf {
        let mut name = archive.file_name().unwrap_or_default().to_os_string();
        name.push(".extracted");
        archive.with_file_name(name)
    }

    /// True if a marker next to `archive` records this same source.
    async fn matches(&self, archive: &Path) -> bool {
        let path = Self::path(archive);
        let Ok(bytes) = tokio::fs::read(&path).await else {
            return false;
        };
        match serde_json::from_slice::<ExtractionMarker>(&bytes) {
            Ok(found) if found == *self => true,
            Ok(_) => {
                debug!("Source changed since {} was written", path.display());
                false
            }
            Err(e) => {
                warn!("Ignoring unreadable marker {}: {}", path.display(), e);
                false
            }
        }
    }

    async fn write(&self, archive: &Path) -> Result<(), SetupError> {
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(Self::path(archive), json).await?;
        Ok(())
    }
}

/// Runs [`extract_archive`] on the blocking pool with a progress bar.
pub async fn extract_in_background(
    archive: PathBuf,
    delete_archive_after: bool,
    name: String,
) -> Result<ExtractionSummary, SetupError> {
    tokio::task::spawn_blocking(move || {
        let bar = ExtractBar::new(&name);
        let result = extract_archive(&archive, delete_archive_after, &bar);
        match &result {
            Ok(summary) => bar.finish(format!(
                "✅ {} files, {}",
                summary.extracted_entries,
                crate::extract::format_throughput(summary.extracted_bytes, summary.elapsed)
            )),
            Err(_) => bar.finish("❌ extraction failed"),
        }
        result
    })
    .await
    .map_err(|e| SetupError::IoError(std::io::Error::other(format!("Task join error: {}", e))))?
}
