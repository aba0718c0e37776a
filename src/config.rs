use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::errors::{PluginError, Result};

/// Include patterns used when none are configured
pub const DEFAULT_INCLUDE: [&str; 2] = ["**/*.styl", "**/*.stylus"];

/// Options bag forwarded verbatim to the compiler backend
pub type CompilerOptions = serde_json::Map<String, serde_json::Value>;

/// Plugin configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PluginOptions {
    /// Patterns of module identifiers the plugin claims
    pub include: Vec<String>,

    /// Patterns of module identifiers the plugin never claims
    pub exclude: Vec<String>,

    /// Opaque compiler options
    pub compiler: CompilerOptions,

    /// Base directory for relative patterns and reported filenames
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            include: DEFAULT_INCLUDE.iter().map(|p| p.to_string()).collect(),
            exclude: Vec::new(),
            compiler: CompilerOptions::new(),
            cwd: None,
        }
    }
}

impl PluginOptions {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PluginError::ConfigError {
                message: format!("Failed to read config file {}: {}", path.display(), e),
            })?;

        serde_yaml::from_str(&content)
            .map_err(|e| PluginError::ConfigError {
                message: format!("Failed to parse YAML config: {}", e),
            })
    }

    /// Load configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PluginError::ConfigError {
                message: format!("Failed to read config file {}: {}", path.display(), e),
            })?;

        serde_json::from_str(&content)
            .map_err(|e| PluginError::ConfigError {
                message: format!("Failed to parse JSON config: {}", e),
            })
    }

    /// Load configuration from a file (auto-detect format)
    pub fn from_file(path: &Path) -> Result<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(PluginError::ConfigError {
                message: format!(
                    "Unsupported config file format: {}. Use .yaml, .yml, or .json",
                    path.display()
                ),
            }),
        }
    }

    /// Merge with another configuration; `other` wins on conflicts
    pub fn merge(mut self, other: Self) -> Self {
        for pattern in other.include {
            if !self.include.contains(&pattern) {
                self.include.push(pattern);
            }
        }
        for pattern in other.exclude {
            if !self.exclude.contains(&pattern) {
                self.exclude.push(pattern);
            }
        }

        self.compiler.extend(other.compiler);

        if other.cwd.is_some() {
            self.cwd = other.cwd;
        }

        self
    }

    /// Set a single compiler option
    pub fn with_compiler_option(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.compiler.insert(key.to_string(), value.into());
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Working directory, falling back to the process cwd
    pub fn working_directory(&self) -> PathBuf {
        self.cwd
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}
