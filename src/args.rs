use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Stylus compiler CLI - Compiles stylesheets through the bundler plugin pipeline
#[derive(Parser, Debug)]
#[command(name = "stylus-plugin")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile stylesheet files to CSS
    Compile(CompileArgs),
    /// Compile a stylesheet from stdin and write CSS to stdout
    Pipe(PipeArgs),
}

/// Compiler backend selection
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompilerKind {
    /// Stylus CLI subprocess
    #[default]
    Stylus,
    /// Built-in indented Sass compiler
    Sass,
}

impl CompilerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompilerKind::Stylus => "stylus",
            CompilerKind::Sass => "sass",
        }
    }

    /// Include patterns matching this backend's source files
    pub fn default_include(&self) -> Vec<String> {
        match self {
            CompilerKind::Stylus => crate::config::DEFAULT_INCLUDE.iter().map(|p| p.to_string()).collect(),
            CompilerKind::Sass => vec!["**/*.sass".to_string()],
        }
    }
}

/// Arguments for the compile command
#[derive(Parser, Debug, Clone)]
pub struct CompileArgs {
    /// Input file patterns (glob patterns supported)
    #[arg(
        short = 'i',
        long = "input",
        value_name = "PATTERN",
        required = true,
        num_args = 1..,
        help = "Input file patterns of stylesheets to compile"
    )]
    pub input: Vec<String>,

    /// Exclude patterns (glob patterns to exclude)
    #[arg(
        short = 'e',
        long = "exclude",
        value_name = "PATTERN",
        num_args = 0..,
        help = "Patterns of stylesheets to skip"
    )]
    pub exclude: Vec<String>,

    /// Output directory for compiled CSS
    #[arg(
        short = 'o',
        long = "out-dir",
        value_name = "DIR",
        help = "Directory for compiled CSS files (prints to stdout when omitted)"
    )]
    pub out_dir: Option<PathBuf>,

    /// Output manifest file path (JSON)
    #[arg(
        short = 'm',
        long = "manifest",
        value_name = "PATH",
        help = "Path where a JSON manifest of compiled modules will be written"
    )]
    pub manifest: Option<PathBuf>,

    /// Configuration file path (YAML or JSON)
    #[arg(
        short = 'c',
        long = "config",
        value_name = "PATH",
        help = "Path to plugin configuration file (YAML or JSON)"
    )]
    pub config: Option<PathBuf>,

    /// Compiler backend
    #[arg(long = "compiler", value_enum, default_value_t = CompilerKind::Stylus)]
    pub compiler: CompilerKind,

    /// Stylus executable
    #[arg(
        long = "stylus-bin",
        value_name = "PROGRAM",
        env = "STYLUS_BIN",
        default_value = "stylus",
        help = "Stylus executable used by the stylus backend"
    )]
    pub stylus_bin: String,

    /// Enable CSS compression
    #[arg(
        long = "compress",
        default_value_t = false,
        help = "Ask the compiler for compressed CSS"
    )]
    pub compress: bool,

    /// Verbose output
    #[arg(
        short = 'v',
        long = "verbose",
        default_value_t = false,
        help = "Enable verbose output"
    )]
    pub verbose: bool,

    /// Dry run (don't write output files)
    #[arg(
        long = "dry-run",
        default_value_t = false,
        help = "Compile but don't write output files"
    )]
    pub dry_run: bool,
}

/// Arguments for the pipe command
#[derive(Parser, Debug, Clone)]
pub struct PipeArgs {
    /// Module identifier reported to the compiler
    #[arg(
        long = "filename",
        value_name = "NAME",
        help = "Filename used for diagnostics and relative imports (defaults to stdin.styl or stdin.sass)"
    )]
    pub filename: Option<String>,

    /// Compiler backend
    #[arg(long = "compiler", value_enum, default_value_t = CompilerKind::Stylus)]
    pub compiler: CompilerKind,

    /// Stylus executable
    #[arg(long = "stylus-bin", value_name = "PROGRAM", env = "STYLUS_BIN", default_value = "stylus")]
    pub stylus_bin: String,

    /// Enable CSS compression
    #[arg(
        long = "compress",
        default_value_t = false,
        help = "Ask the compiler for compressed CSS"
    )]
    pub compress: bool,
}

impl CompileArgs {
    /// Validate that the arguments are consistent
    pub fn validate(&self) -> Result<(), String> {
        if self.input.is_empty() {
            return Err("At least one input pattern must be provided".to_string());
        }

        if let (Some(out_dir), Some(manifest)) = (&self.out_dir, &self.manifest) {
            if out_dir == manifest {
                return Err("Output directory and manifest paths must be different".to_string());
            }
        }

        if cfg!(not(feature = "sass")) && self.compiler == CompilerKind::Sass {
            return Err("The sass compiler requires the `sass` feature".to_string());
        }

        Ok(())
    }
}

impl PipeArgs {
    pub fn filename(&self) -> String {
        self.filename.clone().unwrap_or_else(|| match self.compiler {
            CompilerKind::Stylus => "stdin.styl".to_string(),
            CompilerKind::Sass => "stdin.sass".to_string(),
        })
    }
}
