//! Stylesheet compiler abstraction
//!
//! The plugin never interprets the preprocessor language itself. It hands the
//! module source to a [`StyleCompiler`] backend:
//! - [`StylusCommand`]: the Stylus CLI run as a subprocess
//! - [`SassCompiler`]: in-process indented Sass via grass (feature `sass`)

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::config::CompilerOptions;
use crate::errors::CompileError;

mod stylus;
#[cfg(feature = "sass")]
mod sass;

pub use stylus::StylusCommand;
#[cfg(feature = "sass")]
pub use sass::SassCompiler;

/// Per-module context handed to a compiler
#[derive(Debug, Clone, Copy)]
pub struct CompileContext<'a> {
    /// Module path relative to `cwd`, used in diagnostics
    pub filename: &'a str,

    /// Plugin working directory; relative paths resolve against it
    pub cwd: &'a Path,

    /// Options bag from the plugin configuration, forwarded verbatim
    pub options: &'a CompilerOptions,
}

impl CompileContext<'_> {
    /// Absolute directory of the module, searched for its relative imports
    pub fn source_dir(&self) -> Option<PathBuf> {
        parent_dir(self.filename).map(|dir| self.cwd.join(dir))
    }

    /// `path` as seen from the working directory
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.cwd.join(path)
    }
}

/// Single-shot asynchronous stylesheet compiler
#[async_trait]
pub trait StyleCompiler: Send + Sync {
    /// Compile `source` to CSS
    async fn compile(&self, source: &str, context: &CompileContext<'_>) -> Result<String, CompileError>;

    /// Human-readable backend name for logs
    fn name(&self) -> &'static str;
}

/// Read a boolean option, treating absent or non-bool values as false
pub(crate) fn flag(options: &CompilerOptions, key: &str) -> bool {
    options.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}

/// Read a string-or-list option as a list of strings
pub(crate) fn string_list(options: &CompilerOptions, key: &str) -> Vec<String> {
    match options.get(key) {
        Some(serde_json::Value::String(s)) => vec![s.clone()],
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Directory containing `filename`, if it has one
pub(crate) fn parent_dir(filename: &str) -> Option<&str> {
    std::path::Path::new(filename)
        .parent()
        .and_then(|p| p.to_str())
        .filter(|p| !p.is_empty())
}
