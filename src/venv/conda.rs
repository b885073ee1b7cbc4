//! Conda environment metadata from `conda info --json`

use crate::services::host::ToolHost;
use crate::services::process::ToolCommand;
use serde::Deserialize;

/// The subset of `conda info --json` used to describe an environment.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct CondaInfo {
    #[serde(default)]
    pub active_prefix: Option<String>,
    #[serde(default)]
    pub active_prefix_name: Option<String>,
    #[serde(default)]
    pub conda_version: Option<String>,
    #[serde(default)]
    pub python_version: Option<String>,
    #[serde(default)]
    pub envs: Vec<String>,
}

impl CondaInfo {
    /// Ask `conda` for its info. Any failure yields `None`.
    pub fn query(host: &dyn ToolHost) -> Option<Self> {
        let command = ToolCommand::new("conda").args(["info", "--json"]);
        let output = host.run(&command, None)?;
        if !output.success() || output.stdout.is_empty() {
            tracing::debug!("({}) exited with {}", command, output.exit_code);
            return None;
        }
        Self::parse(&output.stdout)
    }

    pub fn parse(json: &str) -> Option<Self> {
        match serde_json::from_str(json) {
            Ok(info) => Some(info),
            Err(e) => {
                tracing::debug!("Failed to parse conda info: {}", e);
                None
            }
        }
    }

    /// Python version in PEP 440 spelling.
    pub fn normalized_python_version(&self) -> String {
        self.python_version
            .as_deref()
            .map(normalize_python_version)
            .unwrap_or_default()
    }
}

/// Convert conda's `sys.version_info` rendering into a PEP 440 version.
///
/// `3.11.5.final.0` becomes `3.11.5`, `3.13.0.candidate.1` becomes `3.13.0rc1`.
pub fn normalize_python_version(raw: &str) -> String {
    let version = raw
        .replace(".alpha.", "a")
        .replace(".beta.", "b")
        .replace(".candidate.", "rc");
    match version.split_once(".final.") {
        Some((release, _)) => release.to_string(),
        None => version,
    }
}
