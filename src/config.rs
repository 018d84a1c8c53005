//! Setup manifest: which tools to check and which resources to fetch.

use crate::env::EnvironmentStore;
use crate::error::SetupError;
use crate::toolchain::ToolRequirement;
use crate::types::{DownloadTarget, UrlSource};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable consulted for the manifest path when none is given.
pub const MANIFEST_ENV_VAR: &str = "PREREQ_MANIFEST";

/// Manifest file name used when neither a flag nor the variable names one.
pub const DEFAULT_MANIFEST: &str = "prereq.json";

/// A downloadable prerequisite.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ResourceSpec {
    /// Display name, e.g. `"premake"`.
    pub name: String,
    /// One URL or a list of mirrors.
    pub url: UrlSource,
    /// Where the download lands; relative paths resolve against the manifest.
    pub destination: PathBuf,
    /// Expected MD5 of the download as hex.
    #[serde(default)]
    pub md5: Option<String>,
    /// Extract the download as a zip archive next to itself.
    #[serde(default)]
    pub extract: bool,
    /// Keep the archive after extraction.
    #[serde(default)]
    pub keep_archive: bool,
}

impl ResourceSpec {
    /// Builds the download target, resolving the destination against `root`.
    pub fn target(&self, root: &Path) -> DownloadTarget {
        let destination = if self.destination.is_absolute() {
            self.destination.clone()
        } else {
            root.join(&self.destination)
        };
        let target = DownloadTarget::new(self.url.clone(), destination);
        match &self.md5 {
            Some(md5) => target.with_md5(md5.as_str()),
            None => target,
        }
    }
}

/// Everything a checkout needs before it can build.
///
/// # Example
///
/// ```json
/// {
///   "tools": [
///     { "name": "CMake", "program": "cmake", "min_version": "3.28" },
///     { "name": "Ninja", "program": "ninja", "min_version": "1.10.0" }
///   ],
///   "resources": [
///     {
///       "name": "premake",
///       "url": ["https://primary/premake.zip", "https://mirror/premake.zip"],
///       "destination": "vendor/premake/premake.zip",
///       "extract": true
///     }
///   ]
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SetupManifest {
    #[serde(default)]
    pub tools: Vec<ToolRequirement>,
    #[serde(default)]
    pub resources: Vec<ResourceSpec>,
}

impl SetupManifest {
    /// Reads a manifest from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SetupError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Picks the manifest path: explicit flag, then `PREREQ_MANIFEST`, then `prereq.json`.
    pub fn locate(explicit: Option<&Path>, env: &dyn EnvironmentStore) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| env.get(MANIFEST_ENV_VAR).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MANIFEST))
    }
}

/// Directory that relative manifest paths resolve against.
pub fn manifest_root(manifest_path: &Path) -> PathBuf {
    match manifest_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MemoryEnvironment;

    const MANIFEST: &str = r#"{
        "tools": [
            { "name": "CMake", "program": "cmake", "min_version": "3.28", "env_override": "PREREQ_CMAKE" }
        ],
        "resources": [
            {
                "name": "premake",
                "url": ["https://primary/premake.zip", "https://mirror/premake.zip"],
                "destination": "vendor/premake/premake.zip",
                "md5": "ABCDEF",
                "extract": true
            },
            { "name": "license", "url": "https://primary/LICENSE", "destination": "/tmp/LICENSE" }
        ]
    }"#;

    #[test]
    fn loads_manifest_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prereq.json");
        std::fs::write(&path, MANIFEST).unwrap();

        let manifest = SetupManifest::load(&path).unwrap();
        assert_eq!(manifest.tools.len(), 1);
        assert_eq!(manifest.tools[0].env_override.as_deref(), Some("PREREQ_CMAKE"));
        assert_eq!(manifest.resources.len(), 2);
        assert!(manifest.resources[0].extract);
        assert!(!manifest.resources[0].keep_archive);
        assert!(!manifest.resources[1].extract);
        assert_eq!(manifest.resources[1].md5, None);
    }

    #[test]
    fn targets_resolve_relative_destinations() {
        let manifest: SetupManifest = serde_json::from_str(MANIFEST).unwrap();
        let root = Path::new("/work/engine");

        let premake = manifest.resources[0].target(root);
        assert_eq!(
            premake.destination,
            PathBuf::from("/work/engine/vendor/premake/premake.zip")
        );
        assert_eq!(premake.source.candidates().len(), 2);
        assert_eq!(premake.md5.as_deref(), Some("abcdef"));

        let license = manifest.resources[1].target(root);
        assert_eq!(license.destination, PathBuf::from("/tmp/LICENSE"));
    }

    #[test]
    fn malformed_manifest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prereq.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            SetupManifest::load(&path),
            Err(SetupError::SerdeJsonError(_))
        ));
    }

    #[test]
    fn locate_prefers_flag_then_env() {
        let env = MemoryEnvironment::new();
        assert_eq!(SetupManifest::locate(None, &env), PathBuf::from("prereq.json"));

        env.set(MANIFEST_ENV_VAR, "ci/prereq.json");
        assert_eq!(SetupManifest::locate(None, &env), PathBuf::from("ci/prereq.json"));
        assert_eq!(
            SetupManifest::locate(Some(Path::new("mine.json")), &env),
            PathBuf::from("mine.json")
        );
        assert_eq!(manifest_root(Path::new("mine.json")), PathBuf::from("."));
        assert_eq!(manifest_root(Path::new("ci/prereq.json")), PathBuf::from("ci"));
    }
}
