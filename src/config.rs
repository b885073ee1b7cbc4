use crate::dev_env::DevEnvironment;
use crate::services::host::ToolHost;
use crate::venv::registry::PROBES_BY_PRIORITY;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings that drive virtual environment resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VenvConfig {
    /// Finder names to try, in order. Unknown names are ignored with a
    /// warning. Defaults to every finder in priority order.
    #[serde(default = "default_finder_names", alias = "venvStrategies")]
    pub finder_names: Vec<String>,

    /// Interpreter to use instead of probing.
    /// When non-empty, no finder runs even if this interpreter is not in a
    /// venv. Surrounding whitespace is ignored, so a value made only of
    /// whitespace resolves to nothing.
    #[serde(default, alias = "pythonPath")]
    pub explicit_python_path: Option<String>,

    /// Embedded Python whose `sys.path` is added to `analysis.extraPaths`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_environment: Option<DevEnvironmentConfig>,
}

fn default_finder_names() -> Vec<String> {
    PROBES_BY_PRIORITY
        .iter()
        .map(|probe| probe.name().to_string())
        .collect()
}

impl Default for VenvConfig {
    fn default() -> Self {
        Self {
            finder_names: default_finder_names(),
            explicit_python_path: None,
            dev_environment: None,
        }
    }
}

/// Dev environment settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DevEnvironmentConfig {
    /// Environment name (`blender` or `gdb`)
    pub name: String,

    /// Executable to run, e.g. `/opt/blender/blender`
    pub binary: String,
}

impl VenvConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;
        tracing::debug!("Loaded venv config from {:?}", path);
        Self::from_json_str(&contents)
    }

    /// The explicit interpreter, if set to a non-empty string.
    pub fn explicit_python_path(&self) -> Option<&str> {
        self.explicit_python_path
            .as_deref()
            .filter(|path| !path.is_empty())
    }

    /// Run the configured dev environment, if any, and prepend its
    /// `sys.path` to `analysis.extraPaths` of the `python` section.
    ///
    /// Returns `Ok(false)` when no dev environment is configured.
    pub fn apply_dev_environment(
        &self,
        section: &mut serde_json::Value,
        host: &dyn ToolHost,
    ) -> anyhow::Result<bool> {
        let Some(dev) = &self.dev_environment else {
            return Ok(false);
        };
        let env = DevEnvironment::from_name(&dev.name)
            .ok_or_else(|| anyhow::anyhow!("unknown dev_environment: {:?}", dev.name))?;
        env.apply(section, dev.binary.trim(), host)?;
        Ok(true)
    }

    /// Validate the configuration
    ///
    /// Unknown finder names are not an error here; the resolver reports them
    /// as warnings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.finder_names.iter().any(|name| name.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "finder_names cannot contain empty names".to_string(),
            ));
        }

        if let Some(dev) = &self.dev_environment {
            if DevEnvironment::from_name(&dev.name).is_none() {
                return Err(ConfigError::ValidationError(format!(
                    "unknown dev_environment: {:?}",
                    dev.name
                )));
            }
            if dev.binary.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "dev_environment.binary cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// JSON schema for editor-side settings validation
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(VenvConfig)
    }
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(msg) => write!(f, "IO error: {msg}"),
            ConfigError::ParseError(msg) => write!(f, "Parse error: {msg}"),
            ConfigError::ValidationError(msg) => write!(f, "Validation error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
