//! Host-facing services: process execution, environment access and logging.

pub mod host;
pub mod log_dirs;
pub mod process;
pub mod tracing_setup;
pub mod warning_log;
