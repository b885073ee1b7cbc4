//! Virtual environment resolution
//!
//! The resolver walks from the project directory up to the filesystem root.
//! At every level it asks each selected probe, in order, whether it can find
//! a venv; the first valid hit wins. All probes are tried at the nearest
//! directory before moving to its parent.
//!
//! ```text
//!   /proj/sub/sub2   local_dot_venv → env_var_* → rye → ... → any_subdirectory
//!   /proj/sub        local_dot_venv → rye → ... → any_subdirectory
//!   /proj            local_dot_venv ✓
//! ```
//!
//! Environment variable probes do not depend on the directory and are only
//! asked at the first level. The resolver keeps no state between calls.

use super::descriptor::VenvDescriptor;
use super::probe::Probe;
use super::registry::ProbeRegistry;
use crate::path_utils::absolutize;
use crate::services::host::{SharedToolHost, SystemHost};
use std::fmt;
use std::path::Path;

/// Finder name recorded on descriptors that come from an explicit
/// interpreter path.
pub const EXPLICIT_FINDER_NAME: &str = "explicit_python_path";

/// Non-fatal problems noticed while resolving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveWarning {
    /// A configured finder name is not in the registry
    UnknownFinder(String),
}

impl fmt::Display for ResolveWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveWarning::UnknownFinder(name) => {
                write!(f, "Unsupported venv finder name: {:?}", name)
            }
        }
    }
}

/// Outcome of one resolution.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// The environment found, if any
    pub venv: Option<VenvDescriptor>,
    pub warnings: Vec<ResolveWarning>,
}

/// Stateless driver over the probe registry.
#[derive(Debug, Clone)]
pub struct VenvResolver {
    registry: ProbeRegistry,
    host: SharedToolHost,
}

impl Default for VenvResolver {
    fn default() -> Self {
        Self::new(SystemHost::shared())
    }
}

impl VenvResolver {
    pub fn new(host: SharedToolHost) -> Self {
        Self {
            registry: ProbeRegistry::standard(),
            host,
        }
    }

    pub fn registry(&self) -> &ProbeRegistry {
        &self.registry
    }

    /// Resolve the virtual environment for `start_dir`.
    ///
    /// A non-empty `explicit_python_path` bypasses every probe: the result is
    /// whatever that interpreter's venv resolves to, possibly nothing. This
    /// includes a value made only of whitespace, which never resolves.
    pub fn resolve<S: AsRef<str>>(
        &self,
        start_dir: &Path,
        finder_names: &[S],
        explicit_python_path: Option<&str>,
    ) -> Resolution {
        let mut resolution = Resolution::default();

        if let Some(python) = explicit_python_path.filter(|path| !path.is_empty()) {
            resolution.venv = self.resolve_explicit(python.trim());
            return resolution;
        }

        let selection = self.registry.select(finder_names);
        for name in selection.unknown {
            tracing::warn!("Unsupported venv finder name: {:?}", name);
            resolution.warnings.push(ResolveWarning::UnknownFinder(name));
        }

        resolution.venv = self.walk(start_dir, &selection.probes);
        resolution
    }

    fn resolve_explicit(&self, python: &str) -> Option<VenvDescriptor> {
        let found = VenvDescriptor::from_python_executable_any(python, self.host.as_ref());
        match found {
            Some(mut venv) => {
                venv.set_finder_name(EXPLICIT_FINDER_NAME);
                tracing::debug!("Using explicit interpreter {:?}", python);
                Some(venv)
            }
            None => {
                tracing::debug!("Explicit interpreter {:?} is not inside a venv", python);
                None
            }
        }
    }

    fn walk(&self, start_dir: &Path, probes: &[Probe]) -> Option<VenvDescriptor> {
        if probes.is_empty() {
            return None;
        }

        let start_dir = absolutize(start_dir);
        for (level, dir) in start_dir.ancestors().enumerate() {
            for &probe in probes {
                if level > 0 && !probe.is_directory_dependent() {
                    continue;
                }
                if let Some(venv) = self.try_probe(probe, dir) {
                    return Some(venv);
                }
            }
        }

        tracing::debug!("No venv found for {:?}", start_dir);
        None
    }

    fn try_probe(&self, probe: Probe, dir: &Path) -> Option<VenvDescriptor> {
        let host = self.host.as_ref();
        if !probe.can_support(dir, host) {
            return None;
        }

        let mut venv = probe.find(dir, host)?;
        venv.set_finder_name(probe.name());
        tracing::debug!(
            "Found venv {:?} with {} at {:?}",
            venv.venv_directory(),
            probe,
            dir
        );
        Some(venv)
    }
}
