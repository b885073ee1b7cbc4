//! Path utilities for path expansion and normalization.

use std::path::{Path, PathBuf};

/// Expand tilde (~) in a path to the user's home directory.
///
/// # Examples
/// - `~/.virtualenvs/app` -> `/home/user/.virtualenvs/app`
/// - `~` -> `/home/user`
/// - `/absolute/path` -> `/absolute/path` (unchanged)
/// - `~other/path` -> `~other/path` (unchanged, other users are not expanded)
///
/// If the home directory cannot be determined, the path is returned unchanged.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Some(text) = path.to_str() else {
        return path.to_path_buf();
    };
    let rest = match text.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with(['/', '\\']) => rest,
        _ => return path.to_path_buf(),
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest.trim_start_matches(['/', '\\'])),
        None => path.to_path_buf(),
    }
}

/// Make `path` absolute and free of symlinks.
///
/// Returns `None` when the path does not exist or cannot be inspected
/// (for example a permission error on one of its components).
pub fn resolve_existing(path: &Path) -> Option<PathBuf> {
    let expanded = expand_tilde(path);
    match std::fs::canonicalize(&expanded) {
        Ok(resolved) => Some(resolved),
        Err(e) => {
            tracing::debug!("Cannot resolve {:?}: {}", expanded, e);
            None
        }
    }
}

/// Make `path` absolute without requiring it to exist.
///
/// Existing paths are canonicalized; others are joined onto the current
/// directory when relative.
pub fn absolutize(path: &Path) -> PathBuf {
    if let Ok(resolved) = std::fs::canonicalize(path) {
        return resolved;
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tilde_with_path() {
        let result = expand_tilde(Path::new("~/.venvs/app"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(result, home.join(".venvs/app"));
        }
    }

    #[test]
    fn test_expand_tilde_just_tilde() {
        let result = expand_tilde(Path::new("~"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(result, home);
        }
    }

    #[test]
    fn test_expand_tilde_leaves_other_paths() {
        assert_eq!(
            expand_tilde(Path::new("/absolute/path")),
            PathBuf::from("/absolute/path")
        );
        assert_eq!(
            expand_tilde(Path::new("relative/path")),
            PathBuf::from("relative/path")
        );
        assert_eq!(
            expand_tilde(Path::new("~other/path")),
            PathBuf::from("~other/path")
        );
    }

    #[test]
    fn test_resolve_existing_missing_path() {
        assert!(resolve_existing(Path::new("/this/path/does/not/exist")).is_none());
    }

    #[test]
    fn test_absolutize_relative_missing_path() {
        let result = absolutize(Path::new("no/such/dir"));
        assert!(result.is_absolute());
        assert!(result.ends_with("no/such/dir"));
    }
}
