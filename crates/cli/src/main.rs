mod commands;

use std::{
    fs::{self, OpenOptions},
    path::PathBuf,
    sync::Mutex,
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{prelude::*, EnvFilter};

use pkgshelf_core::config::{self, AppConfig};

/// Catalog console package files.
#[derive(Debug, Parser)]
#[command(name = "pkgshelf", version, about)]
struct Cli {
    /// Configuration file to use instead of the platform default.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan a library and save the catalog snapshot.
    Scan {
        /// Library root; defaults to the configured one.
        root: Option<PathBuf>,
        /// Snapshot file; defaults to the configured one.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Skip the external lookup even when it is enabled.
        #[arg(long)]
        no_lookup: bool,
    },
    /// Print the record and raw properties of one package as JSON.
    Inspect {
        /// Package file.
        file: PathBuf,
    },
    /// Print store listing rows for a saved catalog as JSON.
    Export {
        /// Address the store downloads packages and icons from.
        #[arg(long)]
        base_uri: String,
        /// Snapshot file; defaults to the configured one.
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// List saved catalog records, optionally filtered by title or id.
    List {
        /// Case-insensitive search text.
        query: Option<String>,
        /// Snapshot file; defaults to the configured one.
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Re-scan the library whenever packages change.
    Watch {
        /// Library root; defaults to the configured one.
        root: Option<PathBuf>,
        /// Snapshot file; defaults to the configured one.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;

    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Scan {
            root,
            output,
            no_lookup,
        } => commands::scan(config, root, output, no_lookup).await,
        Command::Inspect { file } => commands::inspect(file).await,
        Command::Export { base_uri, catalog } => commands::export(config, catalog, base_uri),
        Command::List { query, catalog } => commands::list(config, catalog, query),
        Command::Watch { root, output } => commands::watch(config, root, output).await,
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<AppConfig> {
    match path {
        Some(path) => {
            config::ensure_default_config_at(path)?;
            AppConfig::load_from(path)
        }
        None => {
            config::ensure_default_config()?;
            AppConfig::load()
        }
    }
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("pkgshelf.log"))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Command output goes to stdout, so console logs use stderr.
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}
