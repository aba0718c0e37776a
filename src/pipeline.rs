//! Minimal sequential host that drives plugins through the hook contract
//!
//! This is not a bundler. It resolves, loads and transforms one module at a
//! time and follows single-import stub modules, which is enough to turn a
//! stylesheet entry into the CSS a downstream stage would receive.

use futures::future::join_all;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::errors::{PluginError, Result};
use crate::hooks::{HookOutcome, Plugin, SourceMap};

/// Redirect chains longer than this are treated as import cycles
const MAX_REDIRECTS: usize = 16;

/// Final state of a module after every transform has run
#[derive(Debug, Clone, Serialize)]
pub struct BuiltModule {
    /// Identifier the build started from
    pub entry: String,
    /// Identifier of the module whose code is returned
    pub id: String,
    /// Code after the last transform
    pub code: String,
    /// Every identifier visited, entry first
    pub chain: Vec<String>,
    /// Source maps produced along the way, in order
    #[serde(skip)]
    pub maps: Vec<SourceMap>,
}

/// Ordered plugin list with host default behaviors
#[derive(Default, Clone)]
pub struct Pipeline {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plugin<P: Plugin + 'static>(mut self, plugin: P) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    pub fn add_plugin(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    pub fn plugin_names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// First plugin to handle the import wins; otherwise relative and
    /// absolute paths resolve against the importer's directory
    pub fn resolve_id(&self, importee: &str, importer: Option<&str>) -> Result<String> {
        for plugin in &self.plugins {
            if let HookOutcome::Handled(id) = plugin.resolve_id(importee, importer) {
                debug!(plugin = plugin.name(), importee, %id, "resolved");
                return Ok(id);
            }
        }

        let path = Path::new(importee);
        if path.is_absolute() {
            return Ok(importee.to_string());
        }

        match importer {
            None => Ok(importee.to_string()),
            Some(importer) if importee.starts_with("./") || importee.starts_with("../") => {
                let base = Path::new(importer).parent().unwrap_or_else(|| Path::new(""));
                Ok(base.join(importee).to_string_lossy().into_owned())
            }
            Some(importer) => Err(PluginError::UnresolvedImport {
                importee: importee.to_string(),
                importer: importer.to_string(),
            }),
        }
    }

    /// First plugin to handle the load wins; otherwise read from disk
    pub async fn load(&self, id: &str) -> Result<String> {
        for plugin in &self.plugins {
            if let HookOutcome::Handled(code) = plugin.load(id) {
                debug!(plugin = plugin.name(), id, "loaded");
                return Ok(code);
            }
        }

        Ok(tokio::fs::read_to_string(id).await?)
    }

    /// Run every plugin's transform in order, each seeing the previous output
    pub async fn transform(&self, code: String, id: &str) -> Result<(String, Vec<SourceMap>)> {
        let mut code = code;
        let mut maps = Vec::new();

        for plugin in &self.plugins {
            if let HookOutcome::Handled(output) = plugin.transform(&code, id).await? {
                debug!(plugin = plugin.name(), id, "transformed");
                code = output.code;
                maps.push(output.map);
            }
        }

        Ok((code, maps))
    }

    /// Resolve, load and transform `entry`, following stub imports
    pub async fn build(&self, entry: &str) -> Result<BuiltModule> {
        let id = self.resolve_id(entry, None)?;
        let code = self.load(&id).await?;
        self.build_from(entry, id, code).await
    }

    /// Like [`Pipeline::build`] but starting from in-memory source text
    pub async fn build_source(&self, id: &str, code: String) -> Result<BuiltModule> {
        self.build_from(id, id.to_string(), code).await
    }

    /// Build several entries concurrently; results keep the input order
    pub async fn build_all(&self, entries: &[String]) -> Vec<Result<BuiltModule>> {
        join_all(entries.iter().map(|entry| self.build(entry))).await
    }

    async fn build_from(&self, entry: &str, id: String, code: String) -> Result<BuiltModule> {
        let mut id = id;
        let mut chain = vec![id.clone()];
        let mut all_maps = Vec::new();
        let (mut code, maps) = self.transform(code, &id).await?;
        all_maps.extend(maps);

        while let Some(importee) = stub_import(&code) {
            if chain.len() > MAX_REDIRECTS {
                return Err(PluginError::InvalidInput(format!(
                    "Import chain from {} exceeds {} modules",
                    entry, MAX_REDIRECTS
                )));
            }

            let next = self.resolve_id(&importee, Some(&id))?;
            let loaded = self.load(&next).await?;
            let (transformed, maps) = self.transform(loaded, &next).await?;

            chain.push(next.clone());
            all_maps.extend(maps);
            id = next;
            code = transformed;
        }

        Ok(BuiltModule {
            entry: entry.to_string(),
            id,
            code,
            chain,
            maps: all_maps,
        })
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("plugins", &self.plugin_names())
            .finish()
    }
}

/// Target of a module whose whole body is a single `import "<target>"`
pub fn stub_import(code: &str) -> Option<String> {
    let rest = code.trim().strip_prefix("import ")?;
    let literal = rest.trim().trim_end_matches(';').trim_end();
    if !literal.starts_with('"') {
        return None;
    }
    serde_json::from_str::<String>(literal).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::TransformOutput;
    use async_trait::async_trait;

    #[test]
    fn test_stub_import_detection() {
        assert_eq!(stub_import(r#"import "a.styl.css""#).as_deref(), Some("a.styl.css"));
        assert_eq!(stub_import("import \"a.css\";\n").as_deref(), Some("a.css"));
        assert_eq!(
            stub_import(r#"import "C:\\a \"b\".styl.css""#).as_deref(),
            Some("C:\\a \"b\".styl.css")
        );
        assert_eq!(stub_import("body { color: red; }"), None);
        assert_eq!(stub_import(r#"import "a.css"; import "b.css""#), None);
        assert_eq!(stub_import("import x from 'y'"), None);
    }

    #[test]
    fn test_default_resolution() {
        let pipeline = Pipeline::new();
        assert_eq!(pipeline.resolve_id("/abs/a.css", Some("/src/main.js")).unwrap(), "/abs/a.css");
        assert_eq!(pipeline.resolve_id("./a.css", Some("/src/main.js")).unwrap(), "/src/./a.css");
        assert_eq!(pipeline.resolve_id("entry.styl", None).unwrap(), "entry.styl");
        assert!(matches!(
            pipeline.resolve_id("some-package", Some("/src/main.js")),
            Err(PluginError::UnresolvedImport { .. })
        ));
    }

    struct Upper;

    #[async_trait]
    impl Plugin for Upper {
        fn name(&self) -> &'static str {
            "upper"
        }

        async fn transform(&self, code: &str, id: &str) -> Result<HookOutcome<TransformOutput>> {
            if !id.ends_with(".css") {
                return Ok(HookOutcome::Deferred);
            }
            Ok(HookOutcome::Handled(TransformOutput {
                code: code.to_uppercase(),
                map: SourceMap::empty(),
            }))
        }
    }

    #[tokio::test]
    async fn test_transform_chain_and_disk_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.css");
        std::fs::write(&path, "a { color: red }").unwrap();

        let pipeline = Pipeline::new().with_plugin(Upper);
        let built = pipeline.build(path.to_str().unwrap()).await.unwrap();

        assert_eq!(built.code, "A { COLOR: RED }");
        assert_eq!(built.chain.len(), 1);
        assert_eq!(built.maps.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_io_error() {
        let pipeline = Pipeline::new();
        let err = pipeline.build("/definitely/not/here.css").await.unwrap_err();
        assert!(matches!(err, PluginError::Io(_)));
    }

    /// Redirects every module to itself
    struct Loop;

    #[async_trait]
    impl Plugin for Loop {
        fn name(&self) -> &'static str {
            "loop"
        }

        fn resolve_id(&self, importee: &str, _importer: Option<&str>) -> HookOutcome<String> {
            HookOutcome::Handled(importee.to_string())
        }

        fn load(&self, _id: &str) -> HookOutcome<String> {
            HookOutcome::Handled(String::new())
        }

        async fn transform(&self, _code: &str, id: &str) -> Result<HookOutcome<TransformOutput>> {
            Ok(HookOutcome::Handled(TransformOutput {
                code: format!("import {:?}", id),
                map: SourceMap::empty(),
            }))
        }
    }

    #[tokio::test]
    async fn test_redirect_cycles_are_bounded() {
        let pipeline = Pipeline::new().with_plugin(Loop);
        let err = pipeline.build("virtual").await.unwrap_err();
        assert!(matches!(err, PluginError::InvalidInput(_)));
    }
}
