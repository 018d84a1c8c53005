//! Detection of installed build tools and their versions.

use crate::env::EnvironmentStore;
use crate::error::SetupError;
use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use tracing::{debug, info, warn};

/// A tool that must be on the machine in at least a given version.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ToolRequirement {
    /// Display name, e.g. `"CMake"`.
    pub name: String,
    /// Executable to run, e.g. `"cmake"`.
    pub program: String,
    /// Arguments that make the tool print its version.
    #[serde(default = "default_version_args")]
    pub args: Vec<String>,
    /// Oldest acceptable version.
    pub min_version: String,
    /// Environment variable that, when set, names the executable to use instead.
    #[serde(default)]
    pub env_override: Option<String>,
}

fn default_version_args() -> Vec<String> {
    vec!["--version".to_string()]
}

impl ToolRequirement {
    pub fn new(name: &str, program: &str, min_version: &str) -> Self {
        Self {
            name: name.to_string(),
            program: program.to_string(),
            args: default_version_args(),
            min_version: min_version.to_string(),
            env_override: None,
        }
    }

    /// The executable to run, honouring `env_override`.
    pub fn resolve_program(&self, env: &dyn EnvironmentStore) -> String {
        self.env_override
            .as_deref()
            .and_then(|var| env.get(var))
            .unwrap_or_else(|| self.program.clone())
    }
}

/// Result of checking one tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolStatus {
    Satisfied { version: Version },
    Outdated { found: Version, required: Version },
    Missing,
}

impl ToolStatus {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, ToolStatus::Satisfied { .. })
    }
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolStatus::Satisfied { version } => write!(f, "{} installed", version),
            ToolStatus::Outdated { found, required } => {
                write!(f, "{} required but {} installed", required, found)
            }
            ToolStatus::Missing => write!(f, "not installed"),
        }
    }
}

/// Pulls the first dotted version number out of a tool's `--version` output.
///
/// Handles `cmake version 3.28.1`, `Ubuntu clang version 18.1.3 (1ubuntu1)` and
/// ninja's bare `1.11.1`. Suffixes such as `-rc1` are dropped.
pub fn parse_version_output(output: &str) -> Option<Version> {
    output.split_whitespace().find_map(|token| {
        let numeric: &str = token
            .split(|c: char| !(c.is_ascii_digit() || c == '.'))
            .next()?
            .trim_end_matches('.');
        if !numeric.starts_with(|c: char| c.is_ascii_digit()) || !numeric.contains('.') {
            return None;
        }
        numeric.parse().ok()
    })
}

/// Runs a tool's version command and compares the result with its minimum.
///
/// # Returns
///
/// `ToolStatus::Missing` if the executable cannot be found, otherwise whether the
/// installed version satisfies the requirement. A tool that runs but reports no
/// recognisable version is `ToolCheckFailed`.
pub async fn check_tool(
    requirement: &ToolRequirement,
    env: &dyn EnvironmentStore,
) -> Result<ToolStatus, SetupError> {
    let required: Version = requirement.min_version.parse()?;
    let program = requirement.resolve_program(env);
    debug!("Running {} {:?}", program, requirement.args);

    let output = match tokio::process::Command::new(&program)
        .args(&requirement.args)
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("{} ({}) is not installed", requirement.name, program);
            return Ok(ToolStatus::Missing);
        }
        Err(e) => return Err(e.into()),
    };

    if !output.status.success() {
        return Err(SetupError::ToolCheckFailed {
            tool: requirement.name.clone(),
            reason: format!("{} exited with {}", program, output.status),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let found = parse_version_output(&stdout)
        .or_else(|| parse_version_output(&stderr))
        .ok_or_else(|| SetupError::ToolCheckFailed {
            tool: requirement.name.clone(),
            reason: format!("no version number in output of {}", program),
        })?;

    if found.satisfies(&required) {
        info!("✅ {} {} is installed", requirement.name, found);
        Ok(ToolStatus::Satisfied { version: found })
    } else {
        warn!(
            "❌ {} {} is required but version {} is installed",
            requirement.name, required, found
        );
        Ok(ToolStatus::Outdated { found, required })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MemoryEnvironment;

    #[test]
    fn parses_common_version_banners() {
        let cmake = "cmake version 3.28.1\n\nCMake suite maintained and supported by Kitware.";
        assert_eq!(parse_version_output(cmake).unwrap().to_string(), "3.28.1");

        let clang = "Ubuntu clang version 18.1.3 (1ubuntu1)\nTarget: x86_64-pc-linux-gnu\nInstalledDir: /usr/bin";
        assert_eq!(parse_version_output(clang).unwrap().to_string(), "18.1.3");

        assert_eq!(parse_version_output("1.11.1\n").unwrap().to_string(), "1.11.1");
        assert_eq!(parse_version_output("tool 2.0.0-rc1").unwrap().to_string(), "2.0.0");
        assert_eq!(parse_version_output("no digits here"), None);
        assert_eq!(parse_version_output("build 42"), None);
    }

    #[test]
    fn requirement_defaults_from_json() {
        let json = r#"{"name": "Ninja", "program": "ninja", "min_version": "1.10.0"}"#;
        let req: ToolRequirement = serde_json::from_str(json).unwrap();
        assert_eq!(req.args, vec!["--version".to_string()]);
        assert_eq!(req.env_override, None);
    }

    #[test]
    fn env_override_replaces_program() {
        let mut req = ToolRequirement::new("CMake", "cmake", "3.28");
        req.env_override = Some("PREREQ_CMAKE".to_string());

        assert_eq!(req.resolve_program(&MemoryEnvironment::new()), "cmake");
        let env = MemoryEnvironment::new().with("PREREQ_CMAKE", "/opt/cmake/bin/cmake");
        assert_eq!(req.resolve_program(&env), "/opt/cmake/bin/cmake");
    }

    #[tokio::test]
    async fn missing_program_is_reported() {
        let req = ToolRequirement::new("Nothing", "prereq-definitely-not-installed", "1.0");
        let status = check_tool(&req, &MemoryEnvironment::new()).await.unwrap();
        assert_eq!(status, ToolStatus::Missing);
        assert!(!status.is_satisfied());
    }

    #[tokio::test]
    async fn invalid_minimum_is_rejected() {
        let req = ToolRequirement::new("Bad", "sh", "latest");
        let err = check_tool(&req, &MemoryEnvironment::new()).await.unwrap_err();
        assert!(matches!(err, SetupError::InvalidVersion(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn compares_reported_version() {
        let mut req = ToolRequirement::new("Fake", "sh", "2.4");
        req.args = vec!["-c".to_string(), "echo fake version 2.5.0".to_string()];
        let status = check_tool(&req, &MemoryEnvironment::new()).await.unwrap();
        assert_eq!(
            status,
            ToolStatus::Satisfied {
                version: "2.5.0".parse().unwrap()
            }
        );

        req.min_version = "3.0".to_string();
        let status = check_tool(&req, &MemoryEnvironment::new()).await.unwrap();
        assert!(matches!(status, ToolStatus::Outdated { .. }));
        assert_eq!(status.to_string(), "3.0 required but 2.5.0 installed");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unparseable_output_fails() {
        let mut req = ToolRequirement::new("Quiet", "sh", "1.0");
        req.args = vec!["-c".to_string(), "echo hello".to_string()];
        let err = check_tool(&req, &MemoryEnvironment::new()).await.unwrap_err();
        assert!(matches!(err, SetupError::ToolCheckFailed { .. }));
    }
}
