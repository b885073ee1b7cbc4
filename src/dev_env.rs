//! Embedded Python environments
//!
//! Applications such as Blender and GDB ship their own Python. Their module
//! search path is found by running the application with a small script that
//! prints `sys.path` as JSON, and is then fed to the language server as
//! `analysis.extraPaths`.

use crate::services::host::ToolHost;
use crate::services::process::ToolCommand;
use crate::workspace::extra_paths_mut;
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

const PRINT_SYS_PATH: &str = r#"import sys
import json
json.dump({"executable": sys.executable, "paths": sys.path}, sys.stdout)"#;

/// Applications with a known way of reporting their `sys.path`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevEnvironment {
    Blender,
    Gdb,
}

#[derive(Debug, Deserialize)]
struct SysPathReport {
    #[serde(default)]
    executable: Option<String>,
    paths: Vec<String>,
}

impl DevEnvironment {
    pub const ALL: [DevEnvironment; 2] = [DevEnvironment::Blender, DevEnvironment::Gdb];

    pub fn name(self) -> &'static str {
        match self {
            DevEnvironment::Blender => "blender",
            DevEnvironment::Gdb => "gdb",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|env| env.name() == name)
    }

    fn script_file_name(self) -> &'static str {
        match self {
            DevEnvironment::Blender => "print_sys_path.py",
            DevEnvironment::Gdb => "print_sys_path.commands",
        }
    }

    fn script(self) -> String {
        match self {
            DevEnvironment::Blender => format!("{PRINT_SYS_PATH}\nexit(0)\n"),
            DevEnvironment::Gdb => format!("python\n{PRINT_SYS_PATH}\nend\nexit\n"),
        }
    }

    fn command(self, binary: &str, script: &Path) -> ToolCommand {
        let script = script.to_string_lossy();
        match self {
            DevEnvironment::Blender => {
                ToolCommand::new(binary).args(["--background", "--python", script.as_ref()])
            }
            DevEnvironment::Gdb => {
                ToolCommand::new(binary).args(["--batch", "--command", script.as_ref()])
            }
        }
    }

    /// Run `binary` and return the `sys.path` of its embedded Python.
    pub fn find_paths(self, binary: &str, host: &dyn ToolHost) -> Result<Vec<String>> {
        let script_dir = tempfile::Builder::new()
            .prefix("pyright-env-")
            .tempdir()
            .context("Failed to create a temporary directory")?;
        let script_path = script_dir.path().join(self.script_file_name());
        std::fs::write(&script_path, self.script())
            .with_context(|| format!("Failed to write {:?}", script_path))?;

        let command = self.command(binary, &script_path);
        let output = host
            .run(&command, None)
            .ok_or_else(|| anyhow!("Failed to run command: {command}"))?;
        if !output.success() {
            bail!(
                "Command exited with code {}: {command}",
                output.exit_code
            );
        }

        let report = self.parse_report(&output.stdout)?;
        tracing::debug!(
            "{} python {:?} reports {} paths",
            self,
            report.executable.as_deref().unwrap_or("?"),
            report.paths.len()
        );
        Ok(report.paths)
    }

    fn parse_report(self, stdout: &str) -> Result<SysPathReport> {
        let json = match self {
            // Blender prints a banner before running the script
            DevEnvironment::Blender => {
                let start = stdout
                    .match_indices("{\"")
                    .map(|(index, _)| index)
                    .find(|&index| index == 0 || stdout[..index].ends_with('\n'))
                    .ok_or_else(|| anyhow!("Unexpected output from blender"))?;
                &stdout[start..]
            }
            DevEnvironment::Gdb => stdout,
        };
        serde_json::from_str(json.trim()).context("Failed to parse sys.path report")
    }

    /// Look up the paths and prepend them to `analysis.extraPaths` of the
    /// `python` configuration section.
    pub fn apply(self, section: &mut Value, binary: &str, host: &dyn ToolHost) -> Result<()> {
        let paths = self.find_paths(binary, host)?;
        inject_extra_paths(section, &paths, ExtraPathsOp::Prepend);
        Ok(())
    }
}

impl fmt::Display for DevEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How new paths combine with the existing `analysis.extraPaths`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtraPathsOp {
    #[default]
    Prepend,
    Append,
    Replace,
}

/// Merge `paths` into `analysis.extraPaths` of `section`.
///
/// The result keeps the first occurrence of each path; paths differing only
/// by a trailing separator count as the same path. Non-string entries
/// already present are dropped.
pub fn inject_extra_paths<S: AsRef<str>>(section: &mut Value, paths: &[S], op: ExtraPathsOp) {
    let Some(section) = section.as_object_mut() else {
        tracing::debug!("python configuration section is not an object; not injecting paths");
        return;
    };
    let Some(extra_paths) = extra_paths_mut(section) else {
        tracing::warn!("analysis.extraPaths is not a list; not injecting paths");
        return;
    };

    let current: Vec<String> = extra_paths
        .iter()
        .filter_map(|value| value.as_str().map(str::to_string))
        .collect();
    let new: Vec<String> = paths.iter().map(|p| p.as_ref().to_string()).collect();

    let merged = match op {
        ExtraPathsOp::Prepend => new.into_iter().chain(current).collect(),
        ExtraPathsOp::Append => current.into_iter().chain(new).collect(),
        ExtraPathsOp::Replace => new,
    };

    let mut seen: Vec<PathBuf> = Vec::new();
    let mut next = Vec::new();
    for path in merged {
        let key = PathBuf::from(&path);
        if !seen.contains(&key) {
            seen.push(key);
            next.push(Value::String(path));
        }
    }

    tracing::debug!("analysis.extraPaths is now ({:?}): {:?}", op, next);
    *extra_paths = next;
}
