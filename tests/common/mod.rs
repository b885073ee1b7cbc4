// Not every test binary uses every fixture
#![allow(dead_code)]

pub mod tracing;

use pyright_env::services::host::TestHost;
use pyright_env::venv::descriptor::python_executable_in;
use pyright_env::venv::VenvResolver;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A temporary project tree.
pub struct Project {
    _tmp: TempDir,
    root: PathBuf,
}

impl Project {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().canonicalize().unwrap().join("proj");
        fs::create_dir_all(&root).unwrap();
        Self { _tmp: tmp, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// A directory next to the project root, outside its tree.
    pub fn outside(&self, name: &str) -> PathBuf {
        self.root.parent().unwrap().join(name)
    }

    pub fn mkdir(&self, relative: &str) -> PathBuf {
        let dir = self.root.join(relative);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    pub fn touch(&self, relative: &str) -> PathBuf {
        let file = self.root.join(relative);
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "").unwrap();
        file
    }
}

/// Lay out a PEP 405 venv at `dir` and return its canonical path.
pub fn make_pep405_venv(dir: &Path, pyvenv_cfg: &str) -> PathBuf {
    let python = python_executable_in(dir);
    fs::create_dir_all(python.parent().unwrap()).unwrap();
    fs::write(&python, "").unwrap();
    fs::write(dir.join("pyvenv.cfg"), pyvenv_cfg).unwrap();
    dir.canonicalize().unwrap()
}

/// Lay out a conda environment at `dir` and return its canonical path.
pub fn make_conda_env(dir: &Path) -> PathBuf {
    let python = python_executable_in(dir);
    fs::create_dir_all(python.parent().unwrap()).unwrap();
    fs::write(&python, "").unwrap();
    fs::create_dir_all(dir.join("conda-meta")).unwrap();
    dir.canonicalize().unwrap()
}

pub fn resolver_with(host: TestHost) -> (VenvResolver, Arc<TestHost>) {
    let host = Arc::new(host);
    (VenvResolver::new(host.clone()), host)
}
