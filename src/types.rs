//! Data structures shared by the fetch, extract, and setup stages.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where a resource can be downloaded from.
///
/// Deserializes from either a bare string or a list of strings, so manifests can
/// write `"url": "https://..."` or `"url": ["https://primary", "https://mirror"]`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum UrlSource {
    /// A single URL.
    Single(String),
    /// Fallback mirrors, tried in order.
    Mirrors(Vec<String>),
}

impl UrlSource {
    /// The candidate URLs in the order they should be tried.
    pub fn candidates(&self) -> &[String] {
        match self {
            UrlSource::Single(url) => std::slice::from_ref(url),
            UrlSource::Mirrors(urls) => urls,
        }
    }
}

impl From<&str> for UrlSource {
    fn from(url: &str) -> Self {
        UrlSource::Single(url.to_string())
    }
}

impl From<Vec<String>> for UrlSource {
    fn from(urls: Vec<String>) -> Self {
        UrlSource::Mirrors(urls)
    }
}

/// A resource to download and the path it should land at.
#[derive(Debug, Clone)]
pub struct DownloadTarget {
    /// Candidate URLs for the resource.
    pub source: UrlSource,
    /// Final location of the downloaded file.
    pub destination: PathBuf,
    /// Expected MD5 of the body as lowercase hex, if known.
    pub md5: Option<String>,
}

impl DownloadTarget {
    pub fn new(source: impl Into<UrlSource>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            md5: None,
        }
    }

    /// Requires the downloaded body to hash to `md5`.
    pub fn with_md5(mut self, md5: impl Into<String>) -> Self {
        self.md5 = Some(md5.into().to_ascii_lowercase());
        self
    }

    /// File name of the destination, for log messages.
    pub fn display_name(&self) -> String {
        display_name(&self.destination)
    }
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

/// Configuration for the HTTP side of downloads.
///
/// # Example
///
/// ```
/// use prereq::FetchConfig;
///
/// let config = FetchConfig {
///     user_agent: "Mozilla/5.0".to_string(),
///     use_system_proxy: false,
/// };
/// ```
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User-Agent header sent with every request (default: `"Mozilla/5.0"`).
    ///
    /// Some download hosts reject requests that carry a tool's default user agent.
    pub user_agent: String,
    /// Honour `HTTP_PROXY`/`HTTPS_PROXY` from the environment (default: true).
    pub use_system_proxy: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0".to_string(),
            use_system_proxy: true,
        }
    }
}

/// Stage control for the setup process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStage {
    /// Check tools, then fetch and extract resources
    All,
    /// Only check tool versions
    ToolsOnly,
    /// Only fetch and extract resources
    ResourcesOnly,
}

impl SetupStage {
    pub(crate) fn checks_tools(self) -> bool {
        matches!(self, SetupStage::All | SetupStage::ToolsOnly)
    }

    pub(crate) fn fetches_resources(self) -> bool {
        matches!(self, SetupStage::All | SetupStage::ResourcesOnly)
    }
}
