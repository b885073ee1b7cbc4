//! Host environment abstraction for testability.
//!
//! Everything the resolver learns from outside the project directory goes
//! through the [`ToolHost`] trait: environment variables, PATH lookups and
//! external commands. Production code uses [`SystemHost`]; tests use
//! [`TestHost`] to script all three without touching the real process
//! environment.

use super::process::{CommandOutput, SubprocessRunner, ToolCommand};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Read-only view of the process environment plus command execution.
pub trait ToolHost: Send + Sync + std::fmt::Debug {
    /// Value of an environment variable, `None` if unset or not unicode.
    fn var(&self, key: &str) -> Option<String>;

    /// Resolve `program` on the execution PATH.
    fn which(&self, program: &str) -> Option<PathBuf>;

    /// Run a command to completion. `None` means it could not be started.
    fn run(&self, command: &ToolCommand, cwd: Option<&Path>) -> Option<CommandOutput>;

    /// Non-empty value of an environment variable.
    fn non_empty_var(&self, key: &str) -> Option<String> {
        self.var(key).filter(|value| !value.is_empty())
    }
}

/// Type alias for a shared host.
pub type SharedToolHost = Arc<dyn ToolHost>;

/// Production implementation backed by the real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHost {
    runner: SubprocessRunner,
}

impl SystemHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedToolHost {
        Arc::new(Self::new())
    }
}

impl ToolHost for SystemHost {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn which(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }

    fn run(&self, command: &ToolCommand, cwd: Option<&Path>) -> Option<CommandOutput> {
        self.runner.run(command, cwd)
    }
}

/// Scripted host for tests.
///
/// - `var()` reads from an in-memory map
/// - `which()` succeeds for registered programs and returns the bare name
/// - `run()` replays the output registered for the exact command line, then
///   the output registered for the program alone; anything else behaves
///   like a missing binary
/// - every `run()` call is recorded
///
/// # Example
///
/// ```
/// use pyright_env::services::host::{TestHost, ToolHost};
/// use pyright_env::services::process::{CommandOutput, ToolCommand};
///
/// let host = TestHost::new()
///     .with_var("VIRTUAL_ENV", "/tmp/venv")
///     .with_program("poetry")
///     .with_output("poetry env info -p", CommandOutput::new("/tmp/venv", "", 0));
///
/// assert_eq!(host.var("VIRTUAL_ENV").as_deref(), Some("/tmp/venv"));
/// assert!(host.which("poetry").is_some());
///
/// let command = ToolCommand::new("poetry").args(["env", "info", "-p"]);
/// assert_eq!(host.run(&command, None).unwrap().stdout, "/tmp/venv");
/// assert_eq!(host.invocations(), vec!["poetry env info -p".to_string()]);
/// ```
#[derive(Debug, Default)]
pub struct TestHost {
    vars: HashMap<String, String>,
    programs: HashSet<String>,
    outputs: HashMap<String, CommandOutput>,
    program_outputs: HashMap<String, CommandOutput>,
    invocations: Mutex<Vec<String>>,
}

impl TestHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.programs.insert(program.into());
        self
    }

    /// Register the output replayed for `command_line` (as rendered by
    /// [`ToolCommand`]'s `Display`).
    pub fn with_output(mut self, command_line: impl Into<String>, output: CommandOutput) -> Self {
        self.outputs.insert(command_line.into(), output);
        self
    }

    /// Register the output replayed for any invocation of `program` without
    /// an exact match, for commands whose arguments are not known up front
    /// (temporary script paths).
    pub fn with_program_output(mut self, program: impl Into<String>, output: CommandOutput) -> Self {
        self.program_outputs.insert(program.into(), output);
        self
    }

    /// Command lines passed to `run()`, in call order.
    pub fn invocations(&self) -> Vec<String> {
        self.invocations
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl ToolHost for TestHost {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    fn which(&self, program: &str) -> Option<PathBuf> {
        self.programs
            .contains(program)
            .then(|| PathBuf::from(program))
    }

    fn run(&self, command: &ToolCommand, _cwd: Option<&Path>) -> Option<CommandOutput> {
        let line = command.to_string();
        if let Ok(mut calls) = self.invocations.lock() {
            calls.push(line.clone());
        }
        self.outputs
            .get(&line)
            .or_else(|| {
                self.program_outputs
                    .get(command.program.to_string_lossy().as_ref())
            })
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_var_filters_empty_values() {
        let host = TestHost::new()
            .with_var("CONDA_PREFIX", "")
            .with_var("VIRTUAL_ENV", "/venv");

        assert_eq!(host.var("CONDA_PREFIX").as_deref(), Some(""));
        assert_eq!(host.non_empty_var("CONDA_PREFIX"), None);
        assert_eq!(host.non_empty_var("VIRTUAL_ENV").as_deref(), Some("/venv"));
        assert_eq!(host.non_empty_var("MISSING"), None);
    }

    #[test]
    fn test_unregistered_command_behaves_like_missing_binary() {
        let host = TestHost::new().with_program("pdm");
        let command = ToolCommand::new("pdm").args(["info", "--python"]);

        assert!(host.run(&command, None).is_none());
        assert_eq!(host.invocations(), vec!["pdm info --python".to_string()]);
    }

    #[test]
    fn test_exact_output_wins_over_program_output() {
        let host = TestHost::new()
            .with_output("gdb --version", CommandOutput::new("GNU gdb 14", "", 0))
            .with_program_output("gdb", CommandOutput::new("", "boom", 1));

        let version = ToolCommand::new("gdb").arg("--version");
        assert_eq!(host.run(&version, None).unwrap().stdout, "GNU gdb 14");

        let batch = ToolCommand::new("gdb").args(["--batch", "--command", "/tmp/x.py"]);
        assert_eq!(host.run(&batch, None).unwrap().exit_code, 1);
    }

    #[test]
    fn test_system_host_reads_path() {
        let host = SystemHost::new();
        assert!(host.var("PATH").is_some() || host.var("Path").is_some());
        assert!(host.which("this_command_does_not_exist_12345").is_none());
    }
}
