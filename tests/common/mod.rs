//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use stylus_plugin::{CompileContext, CompileError, StyleCompiler};

/// Compiles the tiny subset of indented syntax used in tests:
/// an unindented selector line followed by indented `property value` lines
#[derive(Default)]
pub struct TinyStylus {
    calls: AtomicUsize,
}

impl TinyStylus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StyleCompiler for TinyStylus {
    async fn compile(&self, source: &str, context: &CompileContext<'_>) -> Result<String, CompileError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // give other in-flight transforms a chance to run
        tokio::task::yield_now().await;

        let mut css = String::new();
        let mut open = false;

        for (number, line) in source.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            if !line.starts_with(char::is_whitespace) {
                if open {
                    css.push('}');
                }
                css.push_str(line.trim());
                css.push('{');
                open = true;
                continue;
            }

            if !open {
                return Err(CompileError::Syntax(format!(
                    "{}:{}: property outside of a rule",
                    context.filename,
                    number + 1
                )));
            }

            let line = line.trim();
            let (property, value) = line
                .split_once(|c: char| c == ':' || c.is_whitespace())
                .unwrap_or((line, ""));
            let value = value.trim().trim_start_matches(':').trim().trim_end_matches(';').trim();
            if value.is_empty() {
                return Err(CompileError::Syntax(format!(
                    "{}:{}: expected a value for `{}`",
                    context.filename,
                    number + 1,
                    property
                )));
            }

            css.push_str(&format!("{}:{};", property, value));
        }

        if open {
            css.push('}');
        }
        Ok(css)
    }

    fn name(&self) -> &'static str {
        "tiny-stylus"
    }
}
