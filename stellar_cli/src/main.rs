//! Command line front end for the world data compiler.
//!
//! Usage:
//!   stellar build [--root <dir>] [--config <file>] [--verbose]
//!   stellar check [--root <dir>] [--config <file>] [--verbose]
//!   stellar init  [--root <dir>]

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use stellar_project::{CONFIG_FILE, ProjectConfig};

#[derive(Parser)]
#[command(name = "stellar")]
#[command(about = "Compiles Lua world data into C tables and spawn routines")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ProjectArgs {
    /// Project root; relative config paths resolve against it
    #[arg(long, default_value = ".")]
    root: PathBuf,
    /// Config file, defaults to <root>/stellar.toml
    #[arg(long)]
    config: Option<PathBuf>,
    /// Debug logging
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile every world and write the generated header and source
    Build(ProjectArgs),
    /// Compile and generate without writing anything
    Check(ProjectArgs),
    /// Write a default stellar.toml if the project has none
    Init {
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load(args: &ProjectArgs) -> Result<(PathBuf, ProjectConfig)> {
    let root = args.root.clone();
    let config_path = args.config.clone().unwrap_or_else(|| root.join(CONFIG_FILE));
    let config = stellar_project::load_config(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    Ok((root, config))
}

fn build(args: &ProjectArgs) -> Result<()> {
    let (root, config) = load(args)?;
    let summary = stellar_compiler::compile_project(&root, &config)
        .with_context(|| format!("failed to compile project at {}", root.display()))?;
    log::info!("compiled {summary}");
    Ok(())
}

fn check(args: &ProjectArgs) -> Result<()> {
    let (root, config) = load(args)?;
    let (_, summary) = stellar_compiler::build_artifacts(&config.resolve(&root))
        .with_context(|| format!("failed to compile project at {}", root.display()))?;
    log::info!("checked {summary}, nothing written");
    Ok(())
}

fn init(root: &Path) -> Result<()> {
    let path = root.join(CONFIG_FILE);
    if path.exists() {
        log::info!("{} already exists", path.display());
        return Ok(());
    }
    fs::create_dir_all(root).with_context(|| format!("failed to create {}", root.display()))?;
    fs::write(&path, stellar_project::default_stellar_toml())
        .with_context(|| format!("failed to write {}", path.display()))?;
    log::info!("wrote {}", path.display());
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let result = match &cli.command {
        Commands::Build(args) => {
            init_logging(args.verbose);
            build(args)
        }
        Commands::Check(args) => {
            init_logging(args.verbose);
            check(args)
        }
        Commands::Init { root } => {
            init_logging(false);
            init(root)
        }
    };

    if let Err(err) = result {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}
