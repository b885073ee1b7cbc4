//! Log file locations
//!
//! Logs live under the XDG state directory:
//! `$XDG_STATE_HOME/pyright-env/logs/` (usually `~/.local/state/pyright-env/logs/`).
//! File names carry the process id so several language server hosts can log
//! side by side.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const APP_DIR: &str = "pyright-env";

static LOG_DIR: OnceLock<PathBuf> = OnceLock::new();

/// The log directory, created on first use.
///
/// Falls back to the system temp directory when the state directory cannot
/// be determined or created.
pub fn log_dir() -> &'static Path {
    LOG_DIR.get_or_init(|| {
        let fallback = std::env::temp_dir().join(format!("{APP_DIR}-logs"));
        let Some(dir) = state_log_dir(std::env::var_os("XDG_STATE_HOME").map(PathBuf::from))
        else {
            return fallback;
        };

        match fs::create_dir_all(&dir) {
            Ok(()) => dir,
            Err(e) => {
                tracing::warn!("Failed to create log directory {:?}: {}", dir, e);
                fallback
            }
        }
    })
}

/// `<state home>/pyright-env/logs`, ignoring a relative `XDG_STATE_HOME`.
fn state_log_dir(xdg_state_home: Option<PathBuf>) -> Option<PathBuf> {
    let state_home = xdg_state_home
        .filter(|path| path.is_absolute())
        .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("state")))?;
    Some(state_home.join(APP_DIR).join("logs"))
}

/// `{log_dir}/pyright-env-{PID}.log`
pub fn main_log_path() -> PathBuf {
    log_dir().join(format!("{APP_DIR}-{}.log", std::process::id()))
}

/// `{log_dir}/warnings-{PID}.log`
pub fn warnings_log_path() -> PathBuf {
    log_dir().join(format!("warnings-{}.log", std::process::id()))
}
