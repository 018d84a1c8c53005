//! prereq - Fetch, extract, and version-check the prerequisites of an engine checkout
//!
//! This library provides the pieces a bootstrap script needs before a build can
//! start: downloading resources from a list of mirrors, unpacking zip archives
//! in place, and checking that installed tools are recent enough.
//!
//! # Features
//!
//! - **Mirror Fallback**: Try candidate URLs in order, cleaning up after each failure
//! - **Resumable Extraction**: Skip archive entries that already exist on disk
//! - **Progress Tracking**: Byte progress for downloads, percentage and throughput for extraction
//! - **Version Checks**: Dotted-numeric comparison of tool versions
//! - **MD5 Verification**: Optional checksum for downloaded resources
//!
//! # Example
//!
//! ```no_run
//! use prereq::{extract_archive, DownloadTarget, FetchConfig, Fetcher};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = Fetcher::new(FetchConfig::default())?;
//! let target = DownloadTarget::new("https://example.com/tools.zip", "vendor/tools.zip");
//! let archive = fetcher.fetch(&target, &|_: u64, _: Option<u64>| {}).await?;
//!
//! extract_archive(&archive, true, &|percent: f64, speed: &str| {
//!     println!("{:.2}% ({})", percent, speed);
//! })?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod download;
pub mod env;
pub mod error;
pub mod extract;
pub mod orchestrator;
pub mod progress;
pub mod toolchain;
pub mod types;
pub mod verify;
pub mod version;

pub use config::{ResourceSpec, SetupManifest};
pub use download::Fetcher;
pub use env::{EnvironmentStore, MemoryEnvironment, ProcessEnvironment};
pub use error::SetupError;
pub use extract::{extract_archive, ArchiveContents, ExtractionProgress, ExtractionSummary};
pub use orchestrator::{run_setup, ResourceOutcome, SetupReport};
pub use progress::{DownloadReporter, ExtractReporter};
pub use toolchain::{check_tool, ToolRequirement, ToolStatus};
pub use types::{DownloadTarget, FetchConfig, SetupStage, UrlSource};
pub use version::{compare_versions, Version};
