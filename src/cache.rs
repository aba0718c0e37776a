//! Build-lifetime store of compiled stylesheets keyed by synthetic identifier

use dashmap::DashMap;
use std::borrow::Borrow;
use std::fmt;

/// Suffix marking an identifier as already-compiled CSS
pub const COMPILED_SUFFIX: &str = ".css";

/// Identifier of the compiled-CSS counterpart of a source module
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SyntheticId(String);

impl SyntheticId {
    /// Derive the synthetic identifier for a source module. The source id is
    /// kept as a prefix, so distinct sources never collide.
    pub fn for_source(source_id: &str) -> Self {
        Self(format!("{}{}", source_id, COMPILED_SUFFIX))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Stub module body that redirects the host to this identifier
    pub fn stub_module(&self) -> String {
        // JSON string escaping is a valid JS string literal
        let literal = serde_json::to_string(&self.0).unwrap_or_else(|_| format!("\"{}\"", self.0));
        format!("import {}", literal)
    }
}

impl fmt::Display for SyntheticId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for SyntheticId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SyntheticId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Mapping from synthetic identifier to compiled CSS.
///
/// Owned by a single plugin instance. Concurrent transforms write distinct
/// keys, so the map is shared by reference without an outer lock.
#[derive(Debug, Default)]
pub struct CompilationCache {
    entries: DashMap<SyntheticId, String>,
}

impl CompilationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the compiled text for `key`
    pub fn put(&self, key: SyntheticId, css: String) {
        self.entries.insert(key, css);
    }

    /// Compiled text for `key`; absence is the common case
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached identifiers, sorted
    pub fn keys(&self) -> Vec<SyntheticId> {
        let mut keys: Vec<_> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }
}
