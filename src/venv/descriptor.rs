//! Validated description of a Python virtual environment

use super::conda::CondaInfo;
use super::pyvenv_cfg::PyvenvCfg;
use crate::path_utils::resolve_existing;
use crate::services::host::ToolHost;
use serde::Serialize;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// Layout family of a virtual environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VenvKind {
    /// Standard library style venv marked by `pyvenv.cfg` (PEP 405)
    Pep405,
    /// Conda environment marked by a `conda-meta/` directory
    Conda,
}

impl VenvKind {
    /// All kinds, in the order they are tried when the kind is unknown.
    pub const ALL: [VenvKind; 2] = [VenvKind::Pep405, VenvKind::Conda];

    /// Name of the file or directory that marks this kind of environment.
    pub fn marker(self) -> &'static str {
        match self {
            VenvKind::Pep405 => "pyvenv.cfg",
            VenvKind::Conda => "conda-meta",
        }
    }

    fn has_marker(self, venv_dir: &Path) -> bool {
        let marker = venv_dir.join(self.marker());
        match self {
            VenvKind::Pep405 => marker.is_file(),
            VenvKind::Conda => marker.is_dir(),
        }
    }
}

/// Interpreter location inside a venv for the current platform.
pub fn python_executable_in(venv_dir: &Path) -> PathBuf {
    if cfg!(windows) {
        venv_dir.join("Scripts").join("python.exe")
    } else {
        venv_dir.join("bin").join("python")
    }
}

/// A discovered virtual environment.
///
/// Only valid environments are ever handed out: the directory exists, the
/// interpreter exists and the kind's marker exists. Two descriptors are
/// equal when they point at the same (symlink-resolved) directory.
#[derive(Debug, Clone, Serialize)]
pub struct VenvDescriptor {
    kind: VenvKind,
    venv_directory: PathBuf,
    prompt: String,
    python_version: String,
    finder_name: String,
    #[serde(skip)]
    pyvenv_cfg: Option<PyvenvCfg>,
}

impl VenvDescriptor {
    /// Describe the venv rooted at `venv_dir`.
    ///
    /// A leading `~` is expanded and the path is resolved to an absolute,
    /// symlink-free form. Returns `None` if the path cannot be resolved or
    /// the directory is not a valid `kind` environment. Metadata problems
    /// never fail construction; they only leave `prompt`/`python_version`
    /// at their defaults.
    pub fn from_venv_dir(
        kind: VenvKind,
        venv_dir: impl AsRef<Path>,
        host: &dyn ToolHost,
    ) -> Option<Self> {
        let venv_directory = resolve_existing(venv_dir.as_ref())?;

        let mut descriptor = Self {
            kind,
            venv_directory,
            prompt: String::new(),
            python_version: String::new(),
            finder_name: String::new(),
            pyvenv_cfg: None,
        };
        if !descriptor.is_valid() {
            return None;
        }

        descriptor.refresh_metadata(host);
        Some(descriptor)
    }

    /// Describe the venv owning `python_executable` (`<venv>/bin/python`).
    ///
    /// Returns `None` if the path has no second-level parent.
    pub fn from_python_executable(
        kind: VenvKind,
        python_executable: impl AsRef<Path>,
        host: &dyn ToolHost,
    ) -> Option<Self> {
        let venv_dir = python_executable.as_ref().parent()?.parent()?;
        if venv_dir.as_os_str().is_empty() {
            return None;
        }
        Self::from_venv_dir(kind, venv_dir, host)
    }

    /// Like [`Self::from_python_executable`], trying every [`VenvKind`] in order.
    pub fn from_python_executable_any(
        python_executable: impl AsRef<Path>,
        host: &dyn ToolHost,
    ) -> Option<Self> {
        let python_executable = python_executable.as_ref();
        VenvKind::ALL
            .into_iter()
            .find_map(|kind| Self::from_python_executable(kind, python_executable, host))
    }

    /// Describe the PEP 405 venv containing `pyvenv_cfg_file`.
    pub fn from_pyvenv_cfg_file(
        pyvenv_cfg_file: impl AsRef<Path>,
        host: &dyn ToolHost,
    ) -> Option<Self> {
        let venv_dir = pyvenv_cfg_file.as_ref().parent()?;
        if venv_dir.as_os_str().is_empty() {
            return None;
        }
        Self::from_venv_dir(VenvKind::Pep405, venv_dir, host)
    }

    /// Re-check the validity invariant against the filesystem.
    pub fn is_valid(&self) -> bool {
        self.venv_directory.is_dir()
            && self.python_executable().is_file()
            && self.kind.has_marker(&self.venv_directory)
    }

    fn refresh_metadata(&mut self, host: &dyn ToolHost) {
        match self.kind {
            VenvKind::Pep405 => {
                let cfg = PyvenvCfg::load(&self.venv_directory.join(VenvKind::Pep405.marker()));
                self.prompt = cfg.prompt().unwrap_or_default().to_string();
                self.python_version = cfg.version().unwrap_or_default().to_string();
                self.pyvenv_cfg = Some(cfg);
            }
            VenvKind::Conda => {
                if let Some(info) = CondaInfo::query(host) {
                    self.prompt = info.active_prefix_name.clone().unwrap_or_default();
                    self.python_version = info.normalized_python_version();
                }
            }
        }

        if self.prompt.is_empty() {
            self.prompt = self.directory_name();
        }
    }

    fn directory_name(&self) -> String {
        self.venv_directory
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn kind(&self) -> VenvKind {
        self.kind
    }

    pub fn venv_directory(&self) -> &Path {
        &self.venv_directory
    }

    pub fn python_executable(&self) -> PathBuf {
        python_executable_in(&self.venv_directory)
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn python_version(&self) -> &str {
        &self.python_version
    }

    /// Name of the finder that produced this descriptor, empty if none did.
    pub fn finder_name(&self) -> &str {
        &self.finder_name
    }

    pub(crate) fn set_finder_name(&mut self, name: &str) {
        self.finder_name = name.to_string();
    }

    /// Parsed `pyvenv.cfg`, for PEP 405 environments.
    pub fn pyvenv_cfg(&self) -> Option<&PyvenvCfg> {
        self.pyvenv_cfg.as_ref()
    }

    /// The `site-packages` directory of this environment, if it exists.
    ///
    /// On POSIX the `lib/pythonX.Y` directory matching the known version is
    /// preferred; otherwise the first `lib/python*` with a `site-packages`
    /// child (by name) is used.
    pub fn site_packages_dir(&self) -> Option<PathBuf> {
        if cfg!(windows) {
            let dir = self.venv_directory.join("Lib").join("site-packages");
            return dir.is_dir().then_some(dir);
        }

        let lib_dir = self.venv_directory.join("lib");
        if let Some(minor) = major_minor(&self.python_version) {
            let dir = lib_dir.join(format!("python{}", minor)).join("site-packages");
            if dir.is_dir() {
                return Some(dir);
            }
        }

        let entries = match std::fs::read_dir(&lib_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!("Cannot list {:?}: {}", lib_dir, e);
                return None;
            }
        };
        let mut candidates: Vec<PathBuf> = entries
            .flatten()
            .filter(|entry| entry.file_name().to_string_lossy().starts_with("python"))
            .map(|entry| entry.path().join("site-packages"))
            .filter(|dir| dir.is_dir())
            .collect();
        candidates.sort();
        candidates.into_iter().next()
    }
}

/// `"3.11.4"` -> `"3.11"`
fn major_minor(version: &str) -> Option<String> {
    let mut parts = version.split('.');
    let major = parts.next().filter(|p| p.chars().all(|c| c.is_ascii_digit()))?;
    let minor: String = parts
        .next()?
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if major.is_empty() || minor.is_empty() {
        return None;
    }
    Some(format!("{}.{}", major, minor))
}

impl PartialEq for VenvDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.venv_directory == other.venv_directory
    }
}

impl Eq for VenvDescriptor {}

impl Hash for VenvDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.venv_directory.hash(state);
    }
}
