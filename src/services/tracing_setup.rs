//! Tracing subscriber setup for hosts and tests

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use super::warning_log::{WarningLogHandle, WarningLogLayer};

/// Install the global subscriber: `log_file_path` gets everything allowed by
/// `RUST_LOG` (DEBUG when unset), and WARN+ also goes to the warnings file.
///
/// Returns `None` if a file cannot be created or a global subscriber is
/// already installed.
pub fn init_global(log_file_path: &Path) -> Option<WarningLogHandle> {
    let (warning_layer, warning_handle) = super::warning_log::create().ok()?;
    let log_file = File::create(log_file_path).ok()?;

    build_subscriber(log_file, Some(warning_layer))
        .try_init()
        .ok()?;
    tracing::debug!("Logging to {:?}", log_file_path);
    Some(warning_handle)
}

/// Like [`init_global`], writing to [`super::log_dirs::main_log_path`].
pub fn init_default() -> Option<WarningLogHandle> {
    init_global(&super::log_dirs::main_log_path())
}

/// Subscriber used by [`init_global`], exposed so tests can install it
/// with `tracing::subscriber::with_default`.
pub fn build_subscriber(
    log_file: File,
    warning_layer: Option<WarningLogLayer>,
) -> impl tracing::Subscriber + Send + Sync {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::DEBUG.into())
        .from_env_lossy();

    let fmt_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .with(warning_layer)
}
