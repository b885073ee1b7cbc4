//! Virtual environment finders
//!
//! Each [`Probe`] is one detection strategy. All of them share the same
//! two-step contract:
//!
//! 1. [`Probe::can_support`] is a cheap check (marker files, environment
//!    variables, a PATH lookup). It never runs a subprocess and treats any
//!    filesystem error as "not supported".
//! 2. [`Probe::find`] does the actual work and may run an external tool.
//!    Tool failures (missing binary, non-zero exit, unexpected output) turn
//!    into `None`, never into an error.

use super::descriptor::{VenvDescriptor, VenvKind};
use crate::services::host::ToolHost;
use crate::services::process::{CommandOutput, ToolCommand};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// `rye show` prints one `key: value` pair per line
static RYE_VENV_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^venv:[ \t]*(.*?)\s*$").expect("valid rye venv pattern"));

/// A virtual environment detection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Probe {
    /// `.venv/` or `venv/` inside the project
    LocalDotVenv,
    /// The active conda environment (`CONDA_PREFIX`)
    EnvVarCondaPrefix,
    /// The activated venv (`VIRTUAL_ENV`)
    EnvVarVirtualEnv,
    /// `rye show`
    Rye,
    /// `poetry env info -p`
    Poetry,
    /// `pdm info --python`
    Pdm,
    /// `hatch env find`
    Hatch,
    /// `pipenv --py`
    Pipenv,
    /// `pyenv which python`
    Pyenv,
    /// Any immediate subdirectory of the project that is a venv
    AnySubdirectory,
}

/// How the output of an environment manager is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToolOutput {
    /// stdout is the venv directory
    VenvDir,
    /// stdout is the interpreter path
    PythonExecutable,
    /// stdout contains a `venv: <dir>` line
    RyeShow,
}

/// Static description of a tool-backed probe.
#[derive(Debug, Clone, Copy)]
struct ToolSpec {
    program: &'static str,
    args: &'static [&'static str],
    /// Any one of these files in the project enables the probe
    markers: &'static [&'static str],
    output: ToolOutput,
    /// Reject output when the exit code is non-zero
    require_success: bool,
}

impl Probe {
    pub fn name(self) -> &'static str {
        match self {
            Probe::LocalDotVenv => "local_dot_venv",
            Probe::EnvVarCondaPrefix => "env_var_conda_prefix",
            Probe::EnvVarVirtualEnv => "env_var_virtual_env",
            Probe::Rye => "rye",
            Probe::Poetry => "poetry",
            Probe::Pdm => "pdm",
            Probe::Hatch => "hatch",
            Probe::Pipenv => "pipenv",
            Probe::Pyenv => "pyenv",
            Probe::AnySubdirectory => "any_subdirectory",
        }
    }

    /// Whether the result depends on the directory being probed.
    ///
    /// Environment variable probes give the same answer everywhere, so the
    /// resolver only asks them once.
    pub fn is_directory_dependent(self) -> bool {
        !matches!(self, Probe::EnvVarCondaPrefix | Probe::EnvVarVirtualEnv)
    }

    fn tool_spec(self) -> Option<ToolSpec> {
        let spec = match self {
            Probe::Rye => ToolSpec {
                program: "rye",
                args: &["show"],
                markers: &["pyproject.toml"],
                output: ToolOutput::RyeShow,
                require_success: false,
            },
            Probe::Poetry => ToolSpec {
                program: "poetry",
                args: &["env", "info", "-p"],
                markers: &["poetry.lock"],
                output: ToolOutput::VenvDir,
                require_success: false,
            },
            Probe::Pdm => ToolSpec {
                program: "pdm",
                args: &["info", "--python"],
                markers: &[".pdm-python"],
                output: ToolOutput::PythonExecutable,
                require_success: false,
            },
            // hatch prints its exceptions to stdout, so the exit code is the
            // only reliable failure signal
            Probe::Hatch => ToolSpec {
                program: "hatch",
                args: &["env", "find"],
                markers: &["pyproject.toml", "hatch.toml"],
                output: ToolOutput::VenvDir,
                require_success: true,
            },
            Probe::Pipenv => ToolSpec {
                program: "pipenv",
                args: &["--py"],
                markers: &["Pipfile"],
                output: ToolOutput::PythonExecutable,
                require_success: false,
            },
            Probe::Pyenv => ToolSpec {
                program: "pyenv",
                args: &["which", "python"],
                markers: &[".python-version"],
                output: ToolOutput::PythonExecutable,
                require_success: false,
            },
            Probe::LocalDotVenv
            | Probe::EnvVarCondaPrefix
            | Probe::EnvVarVirtualEnv
            | Probe::AnySubdirectory => return None,
        };
        Some(spec)
    }

    /// Cheap check whether this probe applies to `project_dir`.
    pub fn can_support(self, project_dir: &Path, host: &dyn ToolHost) -> bool {
        match self {
            Probe::LocalDotVenv | Probe::AnySubdirectory => true,
            Probe::EnvVarCondaPrefix => host.non_empty_var("CONDA_PREFIX").is_some(),
            Probe::EnvVarVirtualEnv => host.non_empty_var("VIRTUAL_ENV").is_some(),
            _ => match self.tool_spec() {
                Some(spec) => {
                    spec.markers
                        .iter()
                        .any(|marker| project_dir.join(marker).is_file())
                        && host.which(spec.program).is_some()
                }
                None => false,
            },
        }
    }

    /// Look for a virtual environment for `project_dir`.
    ///
    /// Callers must check [`Probe::can_support`] first.
    pub fn find(self, project_dir: &Path, host: &dyn ToolHost) -> Option<VenvDescriptor> {
        match self {
            Probe::LocalDotVenv => find_first_valid(
                [project_dir.join(".venv"), project_dir.join("venv")],
                &[VenvKind::Pep405],
                host,
            ),
            Probe::EnvVarCondaPrefix => {
                let prefix = host.non_empty_var("CONDA_PREFIX")?;
                VenvDescriptor::from_venv_dir(VenvKind::Conda, prefix, host)
            }
            Probe::EnvVarVirtualEnv => {
                let venv = host.non_empty_var("VIRTUAL_ENV")?;
                VenvDescriptor::from_venv_dir(VenvKind::Pep405, venv, host)
            }
            Probe::AnySubdirectory => {
                find_first_valid(list_subdirectories(project_dir), &VenvKind::ALL, host)
            }
            _ => self.find_with_tool(project_dir, host),
        }
    }

    fn find_with_tool(self, project_dir: &Path, host: &dyn ToolHost) -> Option<VenvDescriptor> {
        let spec = self.tool_spec()?;
        let program = host
            .which(spec.program)
            .unwrap_or_else(|| PathBuf::from(spec.program));
        let command = ToolCommand::new(program).args(spec.args.iter().copied());

        let output = host.run(&command, Some(project_dir))?;
        let value = interpret_output(&spec, &output)?;
        tracing::debug!("{} reported {:?} for {:?}", self, value, project_dir);

        // Tools run inside the project, so relative output is relative to it
        let value = if value.starts_with('~') {
            PathBuf::from(value)
        } else {
            project_dir.join(value)
        };

        match spec.output {
            ToolOutput::VenvDir | ToolOutput::RyeShow => {
                VenvDescriptor::from_venv_dir(VenvKind::Pep405, value, host)
            }
            ToolOutput::PythonExecutable => {
                VenvDescriptor::from_python_executable(VenvKind::Pep405, value, host)
            }
        }
    }
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Extract the path a tool printed, or `None` if the run is unusable.
fn interpret_output(spec: &ToolSpec, output: &CommandOutput) -> Option<String> {
    if spec.require_success && !output.success() {
        return None;
    }
    let value = match spec.output {
        ToolOutput::VenvDir | ToolOutput::PythonExecutable => output.stdout.trim().to_string(),
        ToolOutput::RyeShow => RYE_VENV_LINE
            .captures(&output.stdout)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default(),
    };
    (!value.is_empty()).then_some(value)
}

/// First candidate directory that is a valid venv of one of `kinds`.
///
/// Candidates that cannot be inspected are skipped.
fn find_first_valid(
    candidates: impl IntoIterator<Item = PathBuf>,
    kinds: &[VenvKind],
    host: &dyn ToolHost,
) -> Option<VenvDescriptor> {
    candidates
        .into_iter()
        .filter(|candidate| candidate.is_dir())
        .find_map(|candidate| {
            kinds
                .iter()
                .find_map(|&kind| VenvDescriptor::from_venv_dir(kind, &candidate, host))
        })
}

/// Immediate subdirectories of `dir`, sorted by name.
///
/// Unreadable directories and entries are skipped.
fn list_subdirectories(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("Cannot list {:?}: {}", dir, e);
            return Vec::new();
        }
    };

    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(e) => {
                tracing::debug!("Skipping unreadable entry in {:?}: {}", dir, e);
                None
            }
        })
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::host::TestHost;
    use crate::venv::descriptor::python_executable_in;
    use std::fs;
    use tempfile::TempDir;

    fn make_venv(root: &Path) -> PathBuf {
        let python = python_executable_in(root);
        fs::create_dir_all(python.parent().unwrap()).unwrap();
        fs::write(&python, "").unwrap();
        fs::write(root.join("pyvenv.cfg"), "version = 3.12.0\n").unwrap();
        root.canonicalize().unwrap()
    }

    fn spec_of(probe: Probe) -> ToolSpec {
        probe.tool_spec().unwrap()
    }

    #[test]
    fn test_local_dot_venv_prefers_dot_venv() {
        let tmp = TempDir::new().unwrap();
        let dot_venv = make_venv(&tmp.path().join(".venv"));
        make_venv(&tmp.path().join("venv"));

        let host = TestHost::new();
        assert!(Probe::LocalDotVenv.can_support(tmp.path(), &host));
        let found = Probe::LocalDotVenv.find(tmp.path(), &host).unwrap();
        assert_eq!(found.venv_directory(), dot_venv);
    }

    #[test]
    fn test_local_dot_venv_falls_back_to_venv() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join(".venv")).unwrap();
        let venv = make_venv(&tmp.path().join("venv"));

        let found = Probe::LocalDotVenv.find(tmp.path(), &TestHost::new()).unwrap();
        assert_eq!(found.venv_directory(), venv);
    }

    #[test]
    fn test_env_var_probes() {
        let tmp = TempDir::new().unwrap();
        let venv = make_venv(&tmp.path().join("active"));

        let host = TestHost::new().with_var("VIRTUAL_ENV", venv.to_string_lossy());
        assert!(Probe::EnvVarVirtualEnv.can_support(Path::new("/anywhere"), &host));
        assert!(!Probe::EnvVarCondaPrefix.can_support(Path::new("/anywhere"), &host));
        let found = Probe::EnvVarVirtualEnv.find(Path::new("/anywhere"), &host).unwrap();
        assert_eq!(found.venv_directory(), venv);

        let empty = TestHost::new().with_var("VIRTUAL_ENV", "");
        assert!(!Probe::EnvVarVirtualEnv.can_support(tmp.path(), &empty));
    }

    #[test]
    fn test_conda_prefix_requires_conda_layout() {
        let tmp = TempDir::new().unwrap();
        let venv = make_venv(&tmp.path().join("not_conda"));

        let host = TestHost::new().with_var("CONDA_PREFIX", venv.to_string_lossy());
        assert!(Probe::EnvVarCondaPrefix.can_support(tmp.path(), &host));
        assert!(Probe::EnvVarCondaPrefix.find(tmp.path(), &host).is_none());

        fs::create_dir(venv.join("conda-meta")).unwrap();
        let found = Probe::EnvVarCondaPrefix.find(tmp.path(), &host).unwrap();
        assert_eq!(found.kind(), VenvKind::Conda);
    }

    #[test]
    fn test_tool_probe_needs_marker_and_binary() {
        let tmp = TempDir::new().unwrap();
        let with_poetry = TestHost::new().with_program("poetry");

        assert!(!Probe::Poetry.can_support(tmp.path(), &with_poetry));

        fs::write(tmp.path().join("poetry.lock"), "").unwrap();
        assert!(Probe::Poetry.can_support(tmp.path(), &with_poetry));
        assert!(!Probe::Poetry.can_support(tmp.path(), &TestHost::new()));
    }

    #[test]
    fn test_hatch_accepts_either_marker() {
        let tmp = TempDir::new().unwrap();
        let host = TestHost::new().with_program("hatch");
        fs::write(tmp.path().join("hatch.toml"), "").unwrap();
        assert!(Probe::Hatch.can_support(tmp.path(), &host));
    }

    #[test]
    fn test_poetry_find() {
        let tmp = TempDir::new().unwrap();
        let venv = make_venv(&tmp.path().join("cache/proj-py3.12"));
        let host = TestHost::new().with_program("poetry").with_output(
            "poetry env info -p",
            CommandOutput::new(format!("{}\n", venv.display()), "", 0),
        );

        let found = Probe::Poetry.find(tmp.path(), &host).unwrap();
        assert_eq!(found.venv_directory(), venv);
        assert_eq!(host.invocations(), vec!["poetry env info -p".to_string()]);
    }

    #[test]
    fn test_pdm_find_from_interpreter() {
        let tmp = TempDir::new().unwrap();
        let venv = make_venv(&tmp.path().join(".venv"));
        let python = python_executable_in(&venv);
        let host = TestHost::new().with_program("pdm").with_output(
            "pdm info --python",
            CommandOutput::new(python.to_string_lossy(), "", 0),
        );

        let found = Probe::Pdm.find(tmp.path(), &host).unwrap();
        assert_eq!(found.venv_directory(), venv);
    }

    #[test]
    fn test_tool_failure_is_none() {
        let tmp = TempDir::new().unwrap();
        let host = TestHost::new()
            .with_program("pipenv")
            .with_output("pipenv --py", CommandOutput::new("", "No virtualenv", 1));
        assert!(Probe::Pipenv.find(tmp.path(), &host).is_none());

        let spawn_failure = TestHost::new().with_program("pyenv");
        assert!(Probe::Pyenv.find(tmp.path(), &spawn_failure).is_none());
    }

    #[test]
    fn test_hatch_rejects_nonzero_exit_with_stdout() {
        let spec = spec_of(Probe::Hatch);
        let failed = CommandOutput::new("Traceback (most recent call last): ...", "", 1);
        assert_eq!(interpret_output(&spec, &failed), None);

        let ok = CommandOutput::new("/home/u/.local/share/hatch/env/virtual/p/x", "", 0);
        assert_eq!(
            interpret_output(&spec, &ok).as_deref(),
            Some("/home/u/.local/share/hatch/env/virtual/p/x")
        );

        // Other tools only look at stdout
        let poetry = CommandOutput::new("/venv", "", 1);
        assert_eq!(
            interpret_output(&spec_of(Probe::Poetry), &poetry).as_deref(),
            Some("/venv")
        );
    }

    #[test]
    fn test_rye_show_parsing() {
        let spec = spec_of(Probe::Rye);
        let output = CommandOutput::new(
            "project: demo\npath: /work/demo\nvenv: /work/demo/.venv\ntarget python: 3.12\nvenv python: cpython@3.12.3\nvirtual: false\n",
            "",
            0,
        );
        assert_eq!(
            interpret_output(&spec, &output).as_deref(),
            Some("/work/demo/.venv")
        );

        let no_venv = CommandOutput::new("project: demo\nvenv python: cpython@3.12\n", "", 0);
        assert_eq!(interpret_output(&spec, &no_venv), None);
    }

    #[test]
    fn test_any_subdirectory_finds_first_sorted() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("aaa_docs")).unwrap();
        let env_b = make_venv(&tmp.path().join("b-env"));
        make_venv(&tmp.path().join("c-env"));
        fs::write(tmp.path().join("a_file"), "").unwrap();

        let found = Probe::AnySubdirectory.find(tmp.path(), &TestHost::new()).unwrap();
        assert_eq!(found.venv_directory(), env_b);
    }

    #[test]
    fn test_any_subdirectory_unreadable_project() {
        let missing = Path::new("/this/path/does/not/exist");
        assert!(Probe::AnySubdirectory.find(missing, &TestHost::new()).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_permission_denied_is_not_supported() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let locked = tmp.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("poetry.lock"), "").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let host = TestHost::new().with_program("poetry");
        // Root ignores permission bits
        let enforced = fs::read_dir(&locked).is_err();
        let poetry_supported = Probe::Poetry.can_support(&locked, &host);
        let any_subdirectory = Probe::AnySubdirectory.find(&locked, &host);
        let local_dot_venv = Probe::LocalDotVenv.find(&locked, &host);

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        if enforced {
            assert!(!poetry_supported);
            assert!(any_subdirectory.is_none());
            assert!(local_dot_venv.is_none());
            assert!(host.invocations().is_empty());
        }
    }
}
