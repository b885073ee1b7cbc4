//! Python virtual environment resolution for Pyright hosts
//!
//! Given a project directory, [`resolve_venv`] walks up the directory tree
//! and asks a fixed, ordered set of finders (local `.venv`, activated
//! environments, rye, poetry, pdm, hatch, pipenv, pyenv, any subdirectory)
//! for a usable environment. The result tells the language server which
//! interpreter and `site-packages` to analyse against.
//!
//! ```no_run
//! use pyright_env::config::VenvConfig;
//! use std::path::Path;
//!
//! let config = VenvConfig::default();
//! if let Some(venv) = pyright_env::resolve_venv(Path::new("/home/me/proj"), &config) {
//!     println!("{} ({})", venv.python_executable().display(), venv.finder_name());
//! }
//! ```

pub mod config;
pub mod dev_env;
pub mod path_utils;
pub mod services;
pub mod venv;
pub mod workspace;

use config::VenvConfig;
use std::path::Path;
use venv::{ProbeRegistry, VenvDescriptor, VenvResolver};

/// Resolve the venv for `project_dir` using the system environment.
///
/// Unknown finder names in `config` are logged and skipped. Use
/// [`VenvResolver`] directly to receive them as values.
pub fn resolve_venv(project_dir: &Path, config: &VenvConfig) -> Option<VenvDescriptor> {
    VenvResolver::default()
        .resolve(
            project_dir,
            &config.finder_names,
            config.explicit_python_path(),
        )
        .venv
}

/// Names accepted in [`VenvConfig::finder_names`], highest priority first.
pub fn list_available_finder_names() -> Vec<&'static str> {
    ProbeRegistry::standard().names()
}
