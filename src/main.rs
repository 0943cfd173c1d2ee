//! vardecl CLI - declare implicit globals in JavaScript files

mod commands;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vardecl::config::{default_config_path, load_config, VardeclConfig};
use vardecl::output::OutputMode;

#[derive(Parser)]
#[command(name = "vardecl")]
#[command(version)]
#[command(about = "Declare implicit globals in JavaScript with `var`")]
#[command(long_about = r#"
vardecl finds plain `=` assignments to names that are not declared anywhere
in scope and declares them, touching as little text as possible:
  • `a = 1;` becomes `var a = 1;`
  • `f(b = 2);` gets a `var b;` before the statement
  • a name used across blocks is declared once, in the innermost scope
    covering every use

Example usage:
  vardecl check src/
  vardecl fix src/ --source-map
  vardecl fix legacy.js --stdout
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print machine-readable JSON instead of human output
    #[arg(long, global = true)]
    json: bool,

    /// Path to the config file (defaults to ./vardecl.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite files in place
    Fix {
        /// Files or directories to process
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Print the rewritten code instead of writing it
        #[arg(long)]
        stdout: bool,

        /// Write `<file>.map` next to every rewritten file
        #[arg(long)]
        source_map: bool,

        /// Number of worker threads
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Report files that would change, exiting with 1 if any would
    Check {
        /// Files or directories to process
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Number of worker threads
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Watch a directory and fix files as they change
    Watch {
        /// Directory to watch
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Write `<file>.map` next to every rewritten file
        #[arg(long)]
        source_map: bool,
    },

    /// Write a default vardecl.toml
    Init {
        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let output_mode = OutputMode::from_flag(cli.json);

    match run(cli, output_mode) {
        Ok(code) => Ok(code),
        Err(e) => {
            let message = format!("{:#}", e);
            if output_mode.is_human() {
                vardecl::ui::error(&message);
            } else {
                vardecl::output::emit_error(output_mode, "vardecl", &message)?;
            }
            Ok(ExitCode::from(2))
        }
    }
}

fn run(cli: Cli, output_mode: OutputMode) -> anyhow::Result<ExitCode> {
    let config_path = cli.config;
    match cli.command {
        Commands::Init { force } => {
            let path = config_path.unwrap_or_else(default_config_path);
            commands::run_init(&path, force, output_mode)
        }
        Commands::Fix { paths, stdout, source_map, jobs } => {
            let config = resolve_config(config_path.as_deref(), source_map, jobs)?;
            commands::run_fix(&paths, stdout, &config, output_mode)
        }
        Commands::Check { paths, jobs } => {
            let config = resolve_config(config_path.as_deref(), false, jobs)?;
            commands::run_check(&paths, &config, output_mode)
        }
        Commands::Watch { path, source_map } => {
            let config = resolve_config(config_path.as_deref(), source_map, None)?;
            commands::run_watch(path, &config, output_mode)
        }
    }
}

/// Load the config file, then let CLI flags win over it
fn resolve_config(
    path: Option<&Path>,
    source_map: bool,
    jobs: Option<usize>,
) -> anyhow::Result<VardeclConfig> {
    if let Some(path) = path {
        if !path.exists() {
            anyhow::bail!("config file not found: {}", path.display());
        }
    }
    let mut config = load_config(path)?.unwrap_or_default();
    if source_map {
        config.source_maps = true;
    }
    if jobs.is_some() {
        config.jobs = jobs;
    }
    tracing::debug!(?config, "resolved config");
    Ok(config)
}
