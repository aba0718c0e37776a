//! Include/exclude predicate deciding which module identifiers the plugin claims

use glob::{MatchOptions, Pattern};
use std::path::Path;

use crate::config::PluginOptions;
use crate::errors::{PluginError, Result};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Compiled include/exclude rule-set
#[derive(Debug, Clone)]
pub struct Filter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl Filter {
    /// Build a filter, anchoring relative patterns at `base`
    pub fn new(include: &[String], exclude: &[String], base: &Path) -> Result<Self> {
        Ok(Self {
            include: compile_patterns(include, base)?,
            exclude: compile_patterns(exclude, base)?,
        })
    }

    pub fn from_options(options: &PluginOptions) -> Result<Self> {
        Self::new(&options.include, &options.exclude, &options.working_directory())
    }

    /// Whether `id` should be handled by the plugin
    pub fn accepts(&self, id: &str) -> bool {
        // NUL-prefixed ids are virtual modules owned by other plugins
        if id.contains('\0') {
            return false;
        }

        let id = normalize_path(id);

        if self.exclude.iter().any(|p| p.matches_with(&id, MATCH_OPTIONS)) {
            return false;
        }

        self.include.is_empty() || self.include.iter().any(|p| p.matches_with(&id, MATCH_OPTIONS))
    }
}

/// Replace Windows separators with forward slashes
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

fn compile_patterns(patterns: &[String], base: &Path) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|pattern| Pattern::new(&anchor_pattern(pattern, base)).map_err(PluginError::from))
        .collect()
}

/// Anchor a relative pattern at `base`; `**` and absolute patterns are kept as-is
fn anchor_pattern(pattern: &str, base: &Path) -> String {
    let mut pattern = normalize_path(pattern);
    // a trailing `**` means every file below the directory
    if pattern == "**" || pattern.ends_with("/**") {
        pattern.push_str("/*");
    }
    if pattern.starts_with("**") || Path::new(&pattern).is_absolute() || pattern.starts_with('/') {
        return pattern;
    }

    let base = normalize_path(&base.to_string_lossy());
    let relative = pattern.strip_prefix("./").unwrap_or(&pattern);
    format!("{}/{}", Pattern::escape(base.trim_end_matches('/')), relative)
}
