//! Stylus plugin: compiles claimed modules and redirects the host to the
//! compiled CSS through a synthetic module identifier.
//!
//! The hand-off for one stylesheet runs across all three hooks:
//! 1. `transform` compiles the source, caches the CSS under `<id>.css` and
//!    replaces the module with `import "<id>.css"`
//! 2. `resolve_id` claims `<id>.css` so the host never looks for it on disk
//! 3. `load` returns the cached CSS, which downstream CSS plugins then see
//!    as an ordinary stylesheet

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::cache::{CompilationCache, SyntheticId};
use crate::compiler::{CompileContext, StyleCompiler, StylusCommand};
use crate::config::PluginOptions;
use crate::errors::{PluginError, Result};
use crate::filter::{normalize_path, Filter};
use crate::hooks::{HookOutcome, Plugin, SourceMap, TransformOutput};

pub const PLUGIN_NAME: &str = "stylus-compiler";

/// Plugin instance. Each instance owns its own cache, so separate builds
/// never observe each other's compiled modules.
pub struct StylusPlugin {
    options: PluginOptions,
    filter: Filter,
    cache: CompilationCache,
    compiler: Arc<dyn StyleCompiler>,
    cwd: PathBuf,
}

impl StylusPlugin {
    /// Create a plugin compiling through the Stylus CLI
    pub fn new(options: PluginOptions) -> Result<Self> {
        Self::with_compiler(options, StylusCommand::new())
    }

    /// Create a plugin with a specific compiler backend
    pub fn with_compiler<C: StyleCompiler + 'static>(options: PluginOptions, compiler: C) -> Result<Self> {
        Self::with_shared_compiler(options, Arc::new(compiler))
    }

    pub fn with_shared_compiler(options: PluginOptions, compiler: Arc<dyn StyleCompiler>) -> Result<Self> {
        let cwd = options.working_directory();
        let filter = Filter::new(&options.include, &options.exclude, &cwd)?;
        debug!(
            include = ?options.include,
            exclude = ?options.exclude,
            compiler = compiler.name(),
            "Created {} plugin", PLUGIN_NAME
        );

        Ok(Self {
            options,
            filter,
            cache: CompilationCache::new(),
            compiler,
            cwd,
        })
    }

    pub fn options(&self) -> &PluginOptions {
        &self.options
    }

    /// Compiled modules produced so far in this build
    pub fn cache(&self) -> &CompilationCache {
        &self.cache
    }

    /// Whether `id` is claimed by this plugin
    pub fn accepts(&self, id: &str) -> bool {
        self.filter.accepts(id)
    }

    /// `id` relative to the working directory, for compiler diagnostics
    fn relative_filename(&self, id: &str) -> String {
        normalize_path(&relative_to(Path::new(id), &self.cwd).to_string_lossy())
    }
}

/// `path` relative to `base`, climbing out with `..` where needed. Relative
/// paths and paths on a different root are returned unchanged.
fn relative_to(path: &Path, base: &Path) -> PathBuf {
    if path.is_relative() || base.is_relative() {
        return path.to_path_buf();
    }

    let path_parts: Vec<Component> = path.components().collect();
    let base_parts: Vec<Component> = base
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    let common = path_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();
    if common == 0 {
        return path.to_path_buf();
    }

    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push(Component::ParentDir);
    }
    for part in &path_parts[common..] {
        relative.push(part);
    }
    relative
}

impl std::fmt::Debug for StylusPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StylusPlugin")
            .field("options", &self.options)
            .field("compiler", &self.compiler.name())
            .field("cached", &self.cache.len())
            .finish()
    }
}

#[async_trait]
impl Plugin for StylusPlugin {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn resolve_id(&self, importee: &str, importer: Option<&str>) -> HookOutcome<String> {
        debug!(importee, importer = ?importer, "resolveId");
        // compiled ids exist only in the cache; no other resolver may see them
        if self.cache.contains(importee) {
            HookOutcome::Handled(importee.to_string())
        } else {
            HookOutcome::Deferred
        }
    }

    fn load(&self, id: &str) -> HookOutcome<String> {
        debug!(id, "load");
        self.cache.get(id).into()
    }

    async fn transform(&self, code: &str, id: &str) -> Result<HookOutcome<TransformOutput>> {
        debug!(id, "transform");
        trace!(id, code, "transform source");

        if !self.filter.accepts(id) {
            return Ok(HookOutcome::Deferred);
        }

        let filename = self.relative_filename(id);
        let context = CompileContext {
            filename: &filename,
            cwd: &self.cwd,
            options: &self.options.compiler,
        };

        let css = self
            .compiler
            .compile(code, &context)
            .await
            .map_err(|source| PluginError::Compile {
                id: id.to_string(),
                source,
            })?;

        let compiled_id = SyntheticId::for_source(id);
        if self.cache.contains(compiled_id.as_str()) {
            debug!(%compiled_id, "Recompiled module, replacing cached CSS");
        }
        let code = compiled_id.stub_module();
        self.cache.put(compiled_id, css);

        Ok(HookOutcome::Handled(TransformOutput {
            code,
            map: SourceMap::empty(),
        }))
    }
}
