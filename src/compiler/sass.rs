//! In-process compiler for the indented Sass dialect, backed by grass

use async_trait::async_trait;
use grass::{InputSyntax, Options, OutputStyle};

use super::{flag, string_list, CompileContext, StyleCompiler};
use crate::errors::CompileError;

/// Indented-syntax Sass compiler
#[derive(Debug, Clone, Default)]
pub struct SassCompiler;

impl SassCompiler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StyleCompiler for SassCompiler {
    async fn compile(&self, source: &str, context: &CompileContext<'_>) -> Result<String, CompileError> {
        let style = if flag(context.options, "compress") {
            OutputStyle::Compressed
        } else {
            OutputStyle::Expanded
        };

        let mut options = Options::default()
            .input_syntax(InputSyntax::Sass)
            .style(style);

        // grass runs in-process, so every load path must be anchored at the
        // plugin cwd rather than the process cwd
        if let Some(dir) = context.source_dir() {
            options = options.load_path(dir);
        }
        for path in string_list(context.options, "paths") {
            options = options.load_path(context.resolve(&path));
        }

        grass::from_string(source.to_string(), &options).map_err(|e| CompileError::Syntax(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "sass"
    }
}
