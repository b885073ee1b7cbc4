//! Ordered table of available finders

use super::probe::Probe;

/// Every probe, highest priority first.
///
/// Local and already-activated environments are trusted before asking
/// external tools; tools come in rough order of adoption; the brute-force
/// subdirectory scan is last.
pub const PROBES_BY_PRIORITY: [Probe; 10] = [
    Probe::LocalDotVenv,
    Probe::EnvVarCondaPrefix,
    Probe::EnvVarVirtualEnv,
    Probe::Rye,
    Probe::Poetry,
    Probe::Pdm,
    Probe::Hatch,
    Probe::Pipenv,
    Probe::Pyenv,
    Probe::AnySubdirectory,
];

/// Probes picked for one resolution, plus the names that matched nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeSelection {
    pub probes: Vec<Probe>,
    pub unknown: Vec<String>,
}

/// Name-addressable registry of probes.
#[derive(Debug, Clone)]
pub struct ProbeRegistry {
    probes: Vec<Probe>,
}

impl Default for ProbeRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl ProbeRegistry {
    /// The registry with all built-in probes.
    pub fn standard() -> Self {
        Self {
            probes: PROBES_BY_PRIORITY.to_vec(),
        }
    }

    /// Probes in priority order.
    pub fn probes(&self) -> &[Probe] {
        &self.probes
    }

    /// Probe names in priority order.
    pub fn names(&self) -> Vec<&'static str> {
        self.probes.iter().map(|probe| probe.name()).collect()
    }

    /// Find a probe by its exact (case-sensitive) name.
    pub fn lookup(&self, name: &str) -> Option<Probe> {
        self.probes.iter().copied().find(|probe| probe.name() == name)
    }

    /// Map user-supplied names to probes, keeping the caller's order.
    ///
    /// Repeated names are only used once. Unknown names are collected in
    /// [`ProbeSelection::unknown`] instead of failing.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> ProbeSelection {
        let mut selection = ProbeSelection::default();
        for name in names {
            let name = name.as_ref();
            match self.lookup(name) {
                Some(probe) if !selection.probes.contains(&probe) => selection.probes.push(probe),
                Some(_) => {}
                None => selection.unknown.push(name.to_string()),
            }
        }
        selection
    }
}
