//! Host bundler plugin contract
//!
//! A host drives plugins through three hooks. A hook either handles the
//! request, which stops the host from consulting later plugins or its own
//! default behavior, or defers to them. [`HookOutcome`] makes that choice
//! explicit instead of overloading an empty return value.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Result of a single hook invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome<T> {
    /// The plugin supplied the value; no further plugins run for this hook
    Handled(T),
    /// The plugin declined; the host continues with its default chain
    Deferred,
}

impl<T> HookOutcome<T> {
    pub fn is_handled(&self) -> bool {
        matches!(self, HookOutcome::Handled(_))
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, HookOutcome::Deferred)
    }

    /// Convert into an `Option`, `None` meaning deferred
    pub fn handled(self) -> Option<T> {
        match self {
            HookOutcome::Handled(value) => Some(value),
            HookOutcome::Deferred => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> HookOutcome<U> {
        match self {
            HookOutcome::Handled(value) => HookOutcome::Handled(f(value)),
            HookOutcome::Deferred => HookOutcome::Deferred,
        }
    }
}

impl<T> From<Option<T>> for HookOutcome<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => HookOutcome::Handled(value),
            None => HookOutcome::Deferred,
        }
    }
}

/// Source map attached to a transform result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMap {
    pub mappings: String,
}

impl SourceMap {
    /// Map with no mappings, for output that has no line correspondence
    /// with its input
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

/// New module code produced by a `transform` hook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformOutput {
    pub code: String,
    pub map: SourceMap,
}

/// Hooks a host bundler invokes on each plugin.
///
/// All hooks default to deferring, so a plugin only implements what it needs.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// The name of this plugin (for logging and error attribution)
    fn name(&self) -> &'static str;

    /// Resolve `importee`, referenced from `importer`, to a module identifier
    #[allow(unused_variables)]
    fn resolve_id(&self, importee: &str, importer: Option<&str>) -> HookOutcome<String> {
        HookOutcome::Deferred
    }

    /// Supply the source text of a resolved module
    #[allow(unused_variables)]
    fn load(&self, id: &str) -> HookOutcome<String> {
        HookOutcome::Deferred
    }

    /// Rewrite the loaded source text of a module
    ///
    /// # Errors
    ///
    /// Return an error to fail the build for this module.
    #[allow(unused_variables)]
    async fn transform(&self, code: &str, id: &str) -> Result<HookOutcome<TransformOutput>> {
        Ok(HookOutcome::Deferred)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_option() {
        assert_eq!(HookOutcome::from(Some(1)), HookOutcome::Handled(1));
        assert_eq!(HookOutcome::<i32>::from(None), HookOutcome::Deferred);
    }

    #[test]
    fn test_handled_empty_value_is_not_deferred() {
        let outcome = HookOutcome::Handled(String::new());
        assert!(outcome.is_handled());
        assert_eq!(outcome.handled(), Some(String::new()));
    }

    #[test]
    fn test_outcome_map() {
        let outcome = HookOutcome::Handled("a.styl").map(str::len);
        assert_eq!(outcome, HookOutcome::Handled(6));
        assert!(HookOutcome::<&str>::Deferred.map(str::len).is_deferred());
    }

    #[test]
    fn test_empty_source_map_serialization() {
        let json = serde_json::to_string(&SourceMap::empty()).unwrap();
        assert_eq!(json, r#"{"mappings":""}"#);
    }

    struct Passthrough;

    impl Plugin for Passthrough {
        fn name(&self) -> &'static str {
            "passthrough"
        }
    }

    #[test]
    fn test_default_hooks_defer() {
        let plugin = Passthrough;
        assert!(plugin.resolve_id("./a.css", Some("/src/main.js")).is_deferred());
        assert!(plugin.load("/src/a.css").is_deferred());
        let outcome = tokio_test::block_on(plugin.transform("a {}", "/src/a.css")).unwrap();
        assert!(outcome.is_deferred());
    }
}
