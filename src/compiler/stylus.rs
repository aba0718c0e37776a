//! Stylus compiler backend running the `stylus` CLI as a subprocess

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{flag, string_list, CompileContext, StyleCompiler};
use crate::config::CompilerOptions;
use crate::errors::CompileError;

/// Options with a dedicated CLI mapping; everything else goes through the
/// generic `--<key>` translation
const MAPPED_OPTIONS: [&str; 6] = ["compress", "linenos", "paths", "use", "include css", "resolve url"];

/// Compiles stylesheets by piping them through the Stylus CLI
#[derive(Debug, Clone)]
pub struct StylusCommand {
    program: String,
    extra_args: Vec<String>,
}

impl StylusCommand {
    /// Use `stylus` from `PATH`
    pub fn new() -> Self {
        Self::with_program("stylus")
    }

    /// Use a specific executable, e.g. `node_modules/.bin/stylus`
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
        }
    }

    /// Append arguments passed before the translated options
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Translate the options bag and module context into CLI arguments
    pub fn build_args(&self, context: &CompileContext<'_>) -> Vec<String> {
        let options = context.options;
        let mut args = self.extra_args.clone();
        args.push("--print".to_string());

        if flag(options, "compress") {
            args.push("--compress".to_string());
        }
        if flag(options, "linenos") {
            args.push("--line-numbers".to_string());
        }
        if flag(options, "include css") {
            args.push("--include-css".to_string());
        }
        if flag(options, "resolve url") {
            args.push("--resolve-url".to_string());
        }

        // relative @import resolves against the module's own directory
        if let Some(dir) = context.source_dir() {
            args.push("--include".to_string());
            args.push(dir.to_string_lossy().into_owned());
        }
        for path in string_list(options, "paths") {
            args.push("--include".to_string());
            args.push(path);
        }
        for plugin in string_list(options, "use") {
            args.push("--use".to_string());
            args.push(plugin);
        }

        args.extend(generic_args(options));
        args
    }
}

impl Default for StylusCommand {
    fn default() -> Self {
        Self::new()
    }
}

/// `true` becomes `--key`, strings and numbers become `--key value`
fn generic_args(options: &CompilerOptions) -> Vec<String> {
    let mut args = Vec::new();
    for (key, value) in options {
        if MAPPED_OPTIONS.contains(&key.as_str()) {
            continue;
        }
        let name = format!("--{}", key.replace(' ', "-"));
        match value {
            serde_json::Value::Bool(true) => args.push(name),
            serde_json::Value::String(s) => {
                args.push(name);
                args.push(s.clone());
            }
            serde_json::Value::Number(n) => {
                args.push(name);
                args.push(n.to_string());
            }
            _ => {}
        }
    }
    args
}

#[async_trait]
impl StyleCompiler for StylusCommand {
    async fn compile(&self, source: &str, context: &CompileContext<'_>) -> Result<String, CompileError> {
        let args = self.build_args(context);
        debug!("Executing: {} {:?} for {}", self.program, args, context.filename);

        // user `paths` and `--use` plugins are relative to the plugin cwd
        let mut child = Command::new(&self.program)
            .args(&args)
            .current_dir(context.cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CompileError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| {
            CompileError::InvalidOutput("compiler stdin was not captured".to_string())
        })?;

        // feed stdin while draining stdout so large sheets cannot deadlock
        let write = async move {
            stdin.write_all(source.as_bytes()).await?;
            stdin.shutdown().await
        };
        let (written, output) = tokio::join!(write, child.wait_with_output());

        let output = output.map_err(|source| CompileError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(CompileError::Failed {
                filename: context.filename.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // a compiler that exits early may close stdin before reading it all
        if let Err(e) = written {
            return Err(CompileError::Spawn {
                program: self.program.clone(),
                source: e,
            });
        }

        String::from_utf8(output.stdout)
            .map_err(|e| CompileError::InvalidOutput(format!("compiler output is not UTF-8: {}", e)))
    }

    fn name(&self) -> &'static str {
        "stylus"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::Path;

    fn context<'a>(filename: &'a str, options: &'a CompilerOptions) -> CompileContext<'a> {
        CompileContext { filename, cwd: Path::new("/project"), options }
    }

    #[test]
    fn test_default_args() {
        let options = CompilerOptions::new();
        let args = StylusCommand::new().build_args(&context("button.styl", &options));
        assert_eq!(args, vec!["--print"]);
    }

    #[test]
    fn test_mapped_options() {
        let options = json!({
            "compress": true,
            "linenos": false,
            "paths": ["shared", "vendor"],
            "use": "nib",
            "resolve url": true
        });
        let options = options.as_object().cloned().unwrap();
        let args = StylusCommand::new().build_args(&context("src/app.styl", &options));

        assert_eq!(
            args,
            vec![
                "--print",
                "--compress",
                "--resolve-url",
                "--include",
                "/project/src",
                "--include",
                "shared",
                "--include",
                "vendor",
                "--use",
                "nib",
            ]
        );
    }

    #[test]
    fn test_generic_options() {
        let options = json!({ "hoist atrules": true, "import": "mixins", "depth": 2, "sourcemap": false });
        let options = options.as_object().cloned().unwrap();
        let args = generic_args(&options);

        assert!(args.contains(&"--hoist-atrules".to_string()));
        assert!(args.windows(2).any(|w| w == ["--import", "mixins"]));
        assert!(args.windows(2).any(|w| w == ["--depth", "2"]));
        assert!(!args.iter().any(|a| a.contains("sourcemap")));
    }

    #[test]
    fn test_extra_args_come_first() {
        let options = CompilerOptions::new();
        let args = StylusCommand::with_program("npx")
            .arg("stylus")
            .build_args(&context("a.styl", &options));
        assert_eq!(args, vec!["stylus", "--print"]);
    }

    #[tokio::test]
    async fn test_missing_program_is_a_spawn_error() {
        let options = CompilerOptions::new();
        let compiler = StylusCommand::with_program("definitely-not-a-stylus-binary");
        let err = compiler
            .compile("body\n  color red", &context("a.styl", &options))
            .await
            .unwrap_err();
        assert!(matches!(err, CompileError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failure_names_the_module() {
        let options = CompilerOptions::new();
        let dir = tempfile::tempdir().unwrap();
        let compiler = StylusCommand::with_program("sh")
            .arg("-c")
            .arg("cat > /dev/null; echo 'stdin:2:9 expected expression' >&2; exit 3");
        let context = CompileContext { filename: "styles/bad.styl", cwd: dir.path(), options: &options };

        let err = compiler.compile("body\n  color: ;", &context).await.unwrap_err();

        match &err {
            CompileError::Failed { filename, stderr, .. } => {
                assert_eq!(filename, "styles/bad.styl");
                assert_eq!(stderr, "stdin:2:9 expected expression");
            }
            other => panic!("expected a failed run, got {:?}", other),
        }
        assert!(err.to_string().starts_with("styles/bad.styl: "), "{}", err);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_in_plugin_cwd_with_absolute_source_dir() {
        let options = CompilerOptions::new();
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().canonicalize().unwrap();
        let compiler = StylusCommand::with_program("sh")
            .arg("-c")
            .arg(r#"cat > /dev/null; echo "pwd=$(pwd -P)"; echo "args=$*""#)
            .arg("stylus");
        let context = CompileContext { filename: "styles/a.styl", cwd: &cwd, options: &options };

        let output = compiler.compile("a\n  b c", &context).await.unwrap();

        assert!(output.contains(&format!("pwd={}", cwd.display())), "{}", output);
        assert!(output.contains(&format!("--include {}", cwd.join("styles").display())), "{}", output);
    }
}
