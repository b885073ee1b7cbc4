//! `pyvenv.cfg` parsing
//!
//! The file is a flat `key = value` block without a section header. Both `=`
//! and `:` separate keys from values, keys are case-insensitive, and lines
//! starting with `#` or `;` are comments. Continuation lines (indented lines
//! following a key) are appended to the previous value.

use std::collections::BTreeMap;
use std::path::Path;

/// Parsed contents of a `pyvenv.cfg` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PyvenvCfg {
    entries: BTreeMap<String, String>,
}

impl PyvenvCfg {
    /// Read and parse a `pyvenv.cfg` file.
    ///
    /// Unreadable files yield an empty configuration.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) => {
                tracing::debug!("Failed to read {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Self {
        let mut entries: BTreeMap<String, String> = BTreeMap::new();
        let mut last_key: Option<String> = None;

        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                last_key = None;
                continue;
            }
            if trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            let indented = line.starts_with(char::is_whitespace);
            if indented {
                if let Some(value) = last_key.as_ref().and_then(|key| entries.get_mut(key)) {
                    if !value.is_empty() {
                        value.push('\n');
                    }
                    value.push_str(trimmed);
                    continue;
                }
            }

            let Some(split_at) = trimmed.find(['=', ':']) else {
                last_key = None;
                continue;
            };
            let key = trimmed[..split_at].trim().to_lowercase();
            let value = trimmed[split_at + 1..].trim().to_string();
            if key.is_empty() {
                last_key = None;
                continue;
            }

            entries.insert(key.clone(), value);
            last_key = Some(key);
        }

        Self { entries }
    }

    /// Value for `key` (case-insensitive).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(&key.to_lowercase()).map(String::as_str)
    }

    /// Value for `key` interpreted as a boolean (`true`/`false`, any case).
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)?.to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }

    /// Prompt configured with `python -m venv --prompt`.
    pub fn prompt(&self) -> Option<&str> {
        self.get("prompt").filter(|prompt| !prompt.is_empty())
    }

    /// Python version. The `venv` module writes `version`, `uv` writes
    /// `version_info`.
    pub fn version(&self) -> Option<&str> {
        self.get("version")
            .filter(|version| !version.is_empty())
            .or_else(|| self.get("version_info").filter(|version| !version.is_empty()))
    }

    pub fn include_system_site_packages(&self) -> bool {
        self.get_bool("include-system-site-packages").unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STDLIB_VENV: &str = "home = /usr/bin
include-system-site-packages = false
version = 3.11.4
executable = /usr/bin/python3.11
command = /usr/bin/python3 -m venv /home/user/proj/.venv
";

    const UV_VENV: &str = "home = /opt/python/bin
implementation = CPython
uv = 0.4.18
version_info = 3.12.6
include-system-site-packages = TRUE
prompt = my-project
";

    #[test]
    fn test_parse_stdlib_venv() {
        let cfg = PyvenvCfg::parse(STDLIB_VENV);
        assert_eq!(cfg.get("home"), Some("/usr/bin"));
        assert_eq!(cfg.version(), Some("3.11.4"));
        assert_eq!(cfg.prompt(), None);
        assert!(!cfg.include_system_site_packages());
        assert_eq!(
            cfg.get("command"),
            Some("/usr/bin/python3 -m venv /home/user/proj/.venv")
        );
    }

    #[test]
    fn test_parse_uv_venv() {
        let cfg = PyvenvCfg::parse(UV_VENV);
        assert_eq!(cfg.version(), Some("3.12.6"));
        assert_eq!(cfg.prompt(), Some("my-project"));
        assert!(cfg.include_system_site_packages());
        assert_eq!(cfg.get("Implementation"), Some("CPython"));
    }

    #[test]
    fn test_colon_separator_and_comments() {
        let cfg = PyvenvCfg::parse("# comment\n; another\nPrompt: (dev)\nversion=3.9.1\n");
        assert_eq!(cfg.prompt(), Some("(dev)"));
        assert_eq!(cfg.version(), Some("3.9.1"));
        assert_eq!(cfg.iter().count(), 2);
    }

    #[test]
    fn test_continuation_lines() {
        let cfg = PyvenvCfg::parse("command = python -m venv\n    --prompt x\nversion = 3.10\n");
        assert_eq!(cfg.get("command"), Some("python -m venv\n--prompt x"));
        assert_eq!(cfg.version(), Some("3.10"));
    }

    #[test]
    fn test_garbage_is_ignored() {
        let cfg = PyvenvCfg::parse("not a key value line\n= orphan value\n");
        assert!(cfg.is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let cfg = PyvenvCfg::load(Path::new("/this/path/does/not/exist/pyvenv.cfg"));
        assert!(cfg.is_empty());
    }
}
