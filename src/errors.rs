use thiserror::Error;

/// Failure reported by a stylesheet compiler backend
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Failed to start compiler `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{filename}: compiler exited with {status}: {stderr}")]
    Failed {
        filename: String,
        status: String,
        stderr: String,
    },

    #[error("Compiler produced invalid output: {0}")]
    InvalidOutput(String),

    #[error("Syntax error: {0}")]
    Syntax(String),
}

/// Main error type for the stylus-plugin crate
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Pattern error: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Glob error: {0}")]
    Glob(#[from] glob::GlobError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to compile {id}: {source}")]
    Compile {
        id: String,
        #[source]
        source: CompileError,
    },

    #[error("No files found matching the provided patterns")]
    NoFilesFound,

    #[error("Could not resolve import {importee:?} from {importer}")]
    UnresolvedImport { importee: String, importer: String },

    #[error("Failed to write output to {path}: {message}")]
    OutputError { path: String, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl PluginError {
    /// Identifier of the module whose compilation failed, if any
    pub fn module_id(&self) -> Option<&str> {
        match self {
            PluginError::Compile { id, .. } => Some(id),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PluginError>;
