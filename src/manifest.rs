use serde::{Deserialize, Serialize};
use indexmap::IndexMap;
use chrono::{DateTime, Utc};

use crate::pipeline::BuiltModule;

/// Metadata for the generated manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Version of the manifest format
    pub version: String,

    /// Timestamp when the manifest was generated
    pub generated_at: DateTime<Utc>,

    /// Number of stylesheets compiled
    pub modules_compiled: usize,

    /// Compiler backend used
    pub compiler: String,

    /// Plugin version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_version: Option<String>,
}

/// One compiled stylesheet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManifestModule {
    /// Synthetic identifier the compiled CSS was served under
    pub compiled_id: String,

    /// Size of the final CSS in bytes
    pub css_size_bytes: usize,

    /// File the CSS was written to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// Statistics about the run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestStatistics {
    /// Total CSS size in bytes
    pub total_css_bytes: usize,

    /// Processing time in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
}

/// Complete manifest structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub metadata: ManifestMetadata,

    /// Source module identifier to its compiled output
    pub modules: IndexMap<String, ManifestModule>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<ManifestStatistics>,
}

impl Manifest {
    pub fn new(compiler: &str) -> Self {
        Self {
            metadata: ManifestMetadata {
                version: "1.0.0".to_string(),
                generated_at: Utc::now(),
                modules_compiled: 0,
                compiler: compiler.to_string(),
                plugin_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            },
            modules: IndexMap::new(),
            statistics: None,
        }
    }

    /// Record a built module and where its CSS went
    pub fn add_module(&mut self, module: &BuiltModule, output: Option<String>) {
        self.modules.insert(
            module.entry.clone(),
            ManifestModule {
                compiled_id: module.id.clone(),
                css_size_bytes: module.code.len(),
                output,
            },
        );
        self.metadata.modules_compiled = self.modules.len();
    }

    pub fn finish(&mut self, processing_time_ms: Option<u64>) {
        self.statistics = Some(ManifestStatistics {
            total_css_bytes: self.modules.values().map(|m| m.css_size_bytes).sum(),
            processing_time_ms,
        });
    }

    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}
