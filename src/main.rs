use clap::Parser;
use stylus_plugin::{compile, handle_pipe_command, Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let verbose = matches!(&cli.command, Commands::Compile(args) if args.verbose);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("stylus_plugin=debug")
        } else {
            EnvFilter::new("stylus_plugin=warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        Commands::Compile(args) => {
            let print_css = args.out_dir.is_none() && !args.dry_run;
            match compile(args).await {
                Ok(result) => {
                    if print_css {
                        for module in &result.modules {
                            print!("{}", module.code);
                        }
                    } else {
                        eprintln!("Compilation successful!");
                        eprintln!("  - Compiled {} stylesheets", result.modules.len());
                        if result.skipped > 0 {
                            eprintln!("  - Skipped {} unmatched files", result.skipped);
                        }
                    }
                    Ok(())
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Pipe(args) => {
            handle_pipe_command(args).await?;
            Ok(())
        }
    }
}
