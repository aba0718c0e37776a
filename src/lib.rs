pub mod args;
pub mod cache;
pub mod compiler;
pub mod config;
pub mod errors;
pub mod filter;
pub mod hooks;
pub mod manifest;
pub mod pipeline;
pub mod plugin;

pub use args::{Cli, Commands, CompileArgs, CompilerKind, PipeArgs};
pub use cache::{CompilationCache, SyntheticId, COMPILED_SUFFIX};
pub use compiler::{CompileContext, StyleCompiler, StylusCommand};
#[cfg(feature = "sass")]
pub use compiler::SassCompiler;
pub use config::{CompilerOptions, PluginOptions, DEFAULT_INCLUDE};
pub use errors::{CompileError, PluginError, Result};
pub use filter::Filter;
pub use hooks::{HookOutcome, Plugin, SourceMap, TransformOutput};
pub use manifest::Manifest;
pub use pipeline::{BuiltModule, Pipeline};
pub use plugin::{StylusPlugin, PLUGIN_NAME};

#[cfg(feature = "cli")]
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
#[cfg(feature = "cli")]
use std::{fs, time::Instant};
#[cfg(feature = "cli")]
use tracing::{info, warn};

/// Result of a compile run
#[derive(Debug)]
pub struct CompileResult {
    /// Built modules in input order
    pub modules: Vec<BuiltModule>,
    /// Files written, parallel to `modules` when not a dry run
    pub outputs: Vec<PathBuf>,
    pub manifest: Manifest,
    /// Matched files the plugin filter did not claim
    pub skipped: usize,
    pub duration: Duration,
}

/// Instantiate the selected compiler backend
pub fn build_compiler(kind: CompilerKind, stylus_bin: &str) -> Result<Arc<dyn StyleCompiler>> {
    match kind {
        CompilerKind::Stylus => Ok(Arc::new(StylusCommand::with_program(stylus_bin))),
        #[cfg(feature = "sass")]
        CompilerKind::Sass => Ok(Arc::new(SassCompiler::new())),
        #[cfg(not(feature = "sass"))]
        CompilerKind::Sass => Err(PluginError::InvalidInput(
            "The sass compiler requires the `sass` feature".to_string(),
        )),
    }
}

/// Plugin options for a CLI run: config file (or backend defaults), then flags
pub fn resolve_options(
    config: Option<&Path>,
    kind: CompilerKind,
    exclude: &[String],
    compress: bool,
) -> Result<PluginOptions> {
    let mut options = match config {
        Some(path) => PluginOptions::from_file(path)?,
        None => PluginOptions::default(),
    };

    if options.include == PluginOptions::default().include {
        options.include = kind.default_include();
    }

    let overrides = PluginOptions {
        include: Vec::new(),
        exclude: exclude.to_vec(),
        compiler: CompilerOptions::new(),
        cwd: None,
    };
    options = options.merge(overrides);

    if compress {
        options = options.with_compiler_option("compress", true);
    }

    if options.cwd.is_none() {
        let cwd = std::env::current_dir()?;
        options.cwd = Some(cwd.canonicalize().unwrap_or(cwd));
    }

    Ok(options)
}

/// Compile every stylesheet matched by the input patterns
#[cfg(feature = "cli")]
pub async fn compile(args: CompileArgs) -> Result<CompileResult> {
    let start_time = Instant::now();

    args.validate()
        .map_err(PluginError::InvalidInput)?;

    let options = resolve_options(args.config.as_deref(), args.compiler, &args.exclude, args.compress)?;
    let cwd = options.working_directory();
    let compiler = build_compiler(args.compiler, &args.stylus_bin)?;
    let plugin = Arc::new(StylusPlugin::with_shared_compiler(options, compiler)?);

    let files = collect_files(&args.input)?;
    if files.is_empty() {
        return Err(PluginError::NoFilesFound);
    }

    let mut entries = Vec::new();
    let mut skipped = 0;
    for file in &files {
        let id = file.to_string_lossy().into_owned();
        if plugin.accepts(&id) {
            entries.push(id);
        } else {
            warn!("Skipping {}: not matched by include/exclude patterns", file.display());
            skipped += 1;
        }
    }
    if entries.is_empty() {
        return Err(PluginError::NoFilesFound);
    }

    info!("Compiling {} stylesheets with the {} compiler", entries.len(), args.compiler.as_str());

    let progress_bar = if !args.verbose {
        let pb = ProgressBar::new(entries.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({msg})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        pb.set_message("Compiling...");
        Some(pb)
    } else {
        None
    };

    let mut pipeline = Pipeline::new();
    pipeline.add_plugin(plugin.clone());

    let results = futures::future::join_all(entries.iter().map(|entry| {
        let pipeline = &pipeline;
        let progress_bar = progress_bar.as_ref();
        async move {
            let result = pipeline.build(entry).await;
            if let Some(pb) = progress_bar {
                pb.inc(1);
            }
            result
        }
    }))
    .await;

    let modules = results.into_iter().collect::<Result<Vec<_>>>();
    if let Some(pb) = &progress_bar {
        match &modules {
            Ok(_) => pb.finish_with_message("✓ Complete"),
            Err(_) => pb.abandon_with_message("✗ Failed"),
        }
    }
    let modules = modules?;

    let planned: Vec<Option<PathBuf>> = match &args.out_dir {
        Some(dir) => plan_outputs(dir, &cwd, &modules)?.into_iter().map(Some).collect(),
        None => vec![None; modules.len()],
    };

    let mut manifest = Manifest::new(args.compiler.as_str());
    let mut outputs = Vec::new();
    for (module, output) in modules.iter().zip(planned) {
        if let (Some(path), false) = (&output, args.dry_run) {
            write_output(path, &module.code)?;
            outputs.push(path.clone());
        }
        manifest.add_module(module, output.map(|p| p.display().to_string()));
    }

    let duration = start_time.elapsed();
    manifest.finish(Some(duration.as_millis() as u64));

    if let (Some(path), false) = (&args.manifest, args.dry_run) {
        write_output(path, &manifest.to_json(true)?)?;
    }

    info!(
        "Compiled {} stylesheets ({} cached modules) in {:.2}s",
        modules.len(),
        plugin.cache().len(),
        duration.as_secs_f64()
    );

    Ok(CompileResult {
        modules,
        outputs,
        manifest,
        skipped,
        duration,
    })
}

/// Expand glob patterns into unique, canonical file paths
#[cfg(feature = "cli")]
fn collect_files(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for pattern in patterns {
        for entry in glob::glob(pattern)? {
            let path = entry?;
            if path.is_dir() {
                continue;
            }
            let path = path.canonicalize()?;
            if seen.insert(path.clone()) {
                files.push(path);
            }
        }
    }

    Ok(files)
}

/// `<out_dir>/<entry relative to cwd>` with a `.css` extension
#[cfg(feature = "cli")]
fn output_path(out_dir: &Path, cwd: &Path, entry: &str) -> PathBuf {
    let entry = Path::new(entry);
    let relative = entry
        .strip_prefix(cwd)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| entry.file_name().map(PathBuf::from).unwrap_or_default());
    out_dir.join(relative).with_extension("css")
}

/// Output path for every module, refusing to let two modules share a file
#[cfg(feature = "cli")]
fn plan_outputs(out_dir: &Path, cwd: &Path, modules: &[BuiltModule]) -> Result<Vec<PathBuf>> {
    let mut claimed: std::collections::HashMap<PathBuf, &str> = std::collections::HashMap::new();
    let mut outputs = Vec::with_capacity(modules.len());

    for module in modules {
        let path = output_path(out_dir, cwd, &module.entry);
        if let Some(previous) = claimed.insert(path.clone(), &module.entry) {
            return Err(PluginError::OutputError {
                path: path.display().to_string(),
                message: format!("both {} and {} compile to this file", previous, module.entry),
            });
        }
        outputs.push(path);
    }

    Ok(outputs)
}

#[cfg(feature = "cli")]
fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| PluginError::OutputError {
            path: parent.display().to_string(),
            message: e.to_string(),
        })?;
    }

    write_atomic(path, content).map_err(|e| PluginError::OutputError {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Write file atomically by writing to temp file then renaming
#[cfg(feature = "cli")]
fn write_atomic<P: AsRef<Path>>(path: P, content: &str) -> std::io::Result<()> {
    use std::io::Write;

    let path = path.as_ref();
    let temp_path = path.with_extension("tmp");

    let mut file = fs::File::create(&temp_path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;

    fs::rename(&temp_path, path)?;

    Ok(())
}

/// Handle pipe command - read a stylesheet from stdin, output CSS to stdout
pub async fn handle_pipe_command(args: PipeArgs) -> Result<()> {
    use tokio::io::{self, AsyncReadExt, AsyncWriteExt};

    let mut input = String::new();
    io::stdin().read_to_string(&mut input).await?;

    let css = compile_source(&args, input).await?;

    let mut stdout = io::stdout();
    stdout.write_all(css.as_bytes()).await
        .map_err(|e| PluginError::OutputError {
            path: "stdout".to_string(),
            message: e.to_string(),
        })?;
    stdout.flush().await
        .map_err(|e| PluginError::OutputError {
            path: "stdout".to_string(),
            message: e.to_string(),
        })?;

    Ok(())
}

/// Compile in-memory source the way the pipe command does
pub async fn compile_source(args: &PipeArgs, source: String) -> Result<String> {
    let filename = args.filename();
    let options = resolve_options(None, args.compiler, &[], args.compress)?;
    let compiler = build_compiler(args.compiler, &args.stylus_bin)?;
    let plugin = StylusPlugin::with_shared_compiler(options, compiler)?;

    if !plugin.accepts(&filename) {
        return Err(PluginError::InvalidInput(format!(
            "{} is not a {} stylesheet",
            filename,
            args.compiler.as_str()
        )));
    }

    let pipeline = Pipeline::new().with_plugin(plugin);
    let module = pipeline.build_source(&filename, source).await?;
    Ok(module.code)
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_keeps_relative_layout() {
        let path = output_path(Path::new("dist"), Path::new("/project"), "/project/src/button.styl");
        assert_eq!(path, PathBuf::from("dist/src/button.css"));
    }

    #[test]
    fn test_output_path_outside_cwd_uses_file_name() {
        let path = output_path(Path::new("dist"), Path::new("/project"), "/shared/theme.stylus");
        assert_eq!(path, PathBuf::from("dist/theme.css"));
    }

    fn built(entry: &str) -> BuiltModule {
        BuiltModule {
            entry: entry.to_string(),
            id: format!("{}.css", entry),
            code: String::new(),
            chain: vec![entry.to_string()],
            maps: Vec::new(),
        }
    }

    #[test]
    fn test_plan_outputs_rejects_colliding_modules() {
        let modules = [built("/project/src/a.styl"), built("/project/src/a.stylus")];
        let err = plan_outputs(Path::new("dist"), Path::new("/project"), &modules).unwrap_err();

        match err {
            PluginError::OutputError { path, message } => {
                assert_eq!(PathBuf::from(path), PathBuf::from("dist/src/a.css"));
                assert!(message.contains("/project/src/a.styl "), "{}", message);
                assert!(message.contains("/project/src/a.stylus"), "{}", message);
            }
            other => panic!("expected an output error, got {:?}", other),
        }
    }

    #[test]
    fn test_plan_outputs_rejects_same_name_outside_cwd() {
        let modules = [built("/shared/x/theme.styl"), built("/shared/y/theme.styl")];
        assert!(plan_outputs(Path::new("dist"), Path::new("/project"), &modules).is_err());
    }

    #[test]
    fn test_plan_outputs_keeps_module_order() {
        let modules = [built("/project/b.styl"), built("/project/sub/b.styl")];
        let outputs = plan_outputs(Path::new("dist"), Path::new("/project"), &modules).unwrap();
        assert_eq!(outputs, vec![PathBuf::from("dist/b.css"), PathBuf::from("dist/sub/b.css")]);
    }

    #[test]
    fn test_resolve_options_for_sass_backend() {
        let options = resolve_options(None, CompilerKind::Sass, &["legacy/**".to_string()], true).unwrap();
        assert_eq!(options.include, vec!["**/*.sass"]);
        assert_eq!(options.exclude, vec!["legacy/**"]);
        assert_eq!(options.compiler["compress"], serde_json::Value::Bool(true));
        assert!(options.cwd.is_some());
    }

    #[test]
    fn test_write_atomic_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.css");
        write_atomic(&path, "a{}").unwrap();
        write_atomic(&path, "b{}").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "b{}");
        assert!(!dir.path().join("out.tmp").exists());
    }
}
