//! Synchronous external tool execution
//!
//! Environment managers (`poetry`, `pdm`, `hatch`, `conda`, ...) are queried by
//! running them once and reading what they print. Commands are always built
//! as an argument vector, never through a shell.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// An external command: a program plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for ToolCommand {
    /// Renders the command line the way a user would type it (for logs).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Captured result of a finished process.
///
/// Both streams are stored with trailing whitespace removed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Process exit code, `-1` when the process was terminated by a signal
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: trim_output(stdout.into()),
            stderr: trim_output(stderr.into()),
            exit_code,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

fn trim_output(mut text: String) -> String {
    let len = text.trim_end().len();
    text.truncate(len);
    text
}

/// Runs external commands to completion on the calling thread.
///
/// There is no timeout: a hanging tool blocks the caller until it exits.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubprocessRunner;

impl SubprocessRunner {
    pub fn new() -> Self {
        Self
    }

    /// Run `command` in `cwd` and capture its output.
    ///
    /// Returns `None` if the process could not be started at all. A non-empty
    /// stderr is logged as a warning but does not count as a failure; callers
    /// decide success from the exit code and stdout.
    pub fn run(&self, command: &ToolCommand, cwd: Option<&Path>) -> Option<CommandOutput> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        hide_console_window(&mut cmd);

        tracing::debug!("Running command ({}) in {:?}", command, cwd);

        let output = match cmd.output() {
            Ok(output) => output,
            Err(e) => {
                tracing::error!("Failed running command ({}): {}", command, e);
                return None;
            }
        };

        let result = CommandOutput::new(
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
            output.status.code().unwrap_or(-1),
        );

        if !result.stderr.is_empty() {
            tracing::warn!("Command ({}) wrote to stderr: {}", command, result.stderr);
        }

        Some(result)
    }
}

#[cfg(windows)]
fn hide_console_window(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;
    use windows_sys::Win32::System::Threading::CREATE_NO_WINDOW;

    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_console_window(_cmd: &mut Command) {}
