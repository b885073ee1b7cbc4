//! Glue between a resolved venv and the language server's workspace
//! configuration.

use crate::path_utils::{absolutize, resolve_existing};
use crate::venv::VenvDescriptor;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Convert a `file:` URI to a path. Other schemes yield `None`.
pub fn uri_to_file_path(uri: &str) -> Option<PathBuf> {
    let url = url::Url::parse(uri).ok()?;
    if url.scheme() != "file" {
        return None;
    }
    url.to_file_path().ok()
}

/// The workspace folder containing `path`. The deepest folder wins when
/// folders are nested.
pub fn find_workspace_folder<P: AsRef<Path>>(folders: &[P], path: &Path) -> Option<PathBuf> {
    let normalize = |p: &Path| resolve_existing(p).unwrap_or_else(|| absolutize(p));
    let path = normalize(path);

    folders
        .iter()
        .map(|folder| normalize(folder.as_ref()))
        .filter(|folder| path.starts_with(folder))
        .max_by_key(|folder| folder.components().count())
}

/// Point the `python` configuration section at `venv`.
///
/// The venv's site-packages directory is put first in `analysis.extraPaths`
/// unless already listed, and `pythonPath` is set unless it already has a
/// value. A section that is not a JSON object is left alone.
pub fn apply_venv_to_python_settings(section: &mut Value, venv: &VenvDescriptor) {
    let Some(section) = section.as_object_mut() else {
        tracing::debug!("python configuration section is not an object; not patching");
        return;
    };

    if let Some(site_packages) = venv.site_packages_dir() {
        let site_packages = Value::String(site_packages.to_string_lossy().into_owned());
        if let Some(extra_paths) = extra_paths_mut(section) {
            if !extra_paths.contains(&site_packages) {
                extra_paths.insert(0, site_packages);
            }
        }
    }

    let has_python_path = match section.get("pythonPath") {
        Some(Value::String(path)) => !path.is_empty(),
        Some(Value::Null) | None => false,
        Some(_) => true,
    };
    if !has_python_path {
        section.insert(
            "pythonPath".to_string(),
            Value::String(venv.python_executable().to_string_lossy().into_owned()),
        );
    }
}

/// `analysis.extraPaths` in `section`, created when missing.
///
/// `None` when an existing `analysis` or `extraPaths` has an unexpected type.
pub(crate) fn extra_paths_mut(section: &mut Map<String, Value>) -> Option<&mut Vec<Value>> {
    let analysis = section
        .entry("analysis")
        .or_insert_with(|| Value::Object(Map::new()));
    let extra_paths = analysis
        .as_object_mut()?
        .entry("extraPaths")
        .or_insert_with(|| Value::Array(Vec::new()));
    if extra_paths.is_null() {
        *extra_paths = Value::Array(Vec::new());
    }
    extra_paths.as_array_mut()
}

/// Values a host can show in its status bar for the active venv.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusVariables {
    pub finder_name: String,
    pub python_version: String,
    pub venv_prompt: String,
}

impl StatusVariables {
    pub fn from_descriptor(venv: &VenvDescriptor) -> Self {
        Self {
            finder_name: venv.finder_name().to_string(),
            python_version: venv.python_version().to_string(),
            venv_prompt: venv.prompt().to_string(),
        }
    }
}
