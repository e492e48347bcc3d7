//! tusk command line entry point.

mod app;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Configuration file (defaults to ~/.config/tusk/tusk.toml).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Upload a file from the beginning.
    Push {
        file: PathBuf,
        /// MIME type recorded with the upload.
        #[arg(long)]
        mime: Option<String>,
        /// Bytes per chunk (overrides the configuration).
        #[arg(long)]
        chunk_size: Option<usize>,
    },
    /// Continue an interrupted upload from its stored offset.
    Resume {
        id: String,
        file: PathBuf,
        #[arg(long)]
        chunk_size: Option<usize>,
    },
    /// Print the record of one upload.
    Status { id: String },
    /// List uploads, one page at a time.
    List {
        #[arg(long, default_value_t = 0)]
        page: usize,
    },
    /// Print server capabilities.
    Options,
    /// Print the access token, or replace it with a fresh one.
    Token {
        #[arg(long)]
        rotate: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_path = config::Config::resolve_path(cli.config.as_deref());
    let config = config::Config::load(Some(&config_path))?;
    tracing::debug!(
        files = %config.file_directory.display(),
        records = %config.records_directory.display(),
        "configuration loaded"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config, &config_path, cli.command))
}
