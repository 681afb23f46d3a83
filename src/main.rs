#![deny(clippy::unwrap_used)]

mod cmd;
mod common;
mod config;
mod debouncer;
mod definition;
mod error;
mod generate;
mod process;
mod scanner;
mod watch;
mod writer;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use common::STARTING;
use std::path::PathBuf;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Confgen::parse();

    #[cfg(windows)]
    if let Err(err) = nu_ansi_term::enable_ansi_support() {
        eprintln!("error enabling ANSI support: {:?}", err);
    }

    tracing_subscriber::registry()
        // Filter spans based on the verbosity flags.
        .with(eval_logging(&cli))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(true)
                .compact(),
        )
        // Install this registry as the global tracing registry.
        .try_init()
        .context("error initializing logging")?;

    tracing::info!(
        "{}Starting {} {}",
        STARTING,
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    cli.run().await
}

fn eval_logging(cli: &Confgen) -> tracing_subscriber::EnvFilter {
    let directives = match (cli.verbose, cli.quiet) {
        // quiet overrides verbose
        (_, true) => "error,confgen=warn",
        // increase verbosity
        (0, false) => "error,confgen=info",
        (1, false) => "error,confgen=debug",
        (_, false) => "error,confgen=trace",
    };
    tracing_subscriber::EnvFilter::new(directives)
}

/// Generate configuration files from schema-backed definitions.
#[derive(Parser)]
#[command(about, author, version)]
struct Confgen {
    #[command(subcommand)]
    action: ConfgenSubcommands,
    /// Path to the confgen config file or its directory [default: Confgen.toml]
    #[arg(long, env = "CONFGEN_CONFIG", global(true))]
    pub config: Option<PathBuf>,
    /// Enable verbose logging.
    #[arg(short, long, global(true), action=ArgAction::Count)]
    pub verbose: u8,
    /// Be more quiet, conflicts with --verbose
    #[arg(short, long, global(true), conflicts_with("verbose"))]
    pub quiet: bool,
}

impl Confgen {
    #[tracing::instrument(level = "trace", skip(self))]
    pub async fn run(self) -> Result<()> {
        match self.action {
            ConfgenSubcommands::Generate(inner) => inner.run(self.config).await,
            ConfgenSubcommands::Watch(inner) => inner.run(self.config).await,
            ConfgenSubcommands::Clean(inner) => inner.run(self.config).await,
            ConfgenSubcommands::Config(inner) => inner.run(self.config).await,
        }
    }
}

#[derive(Subcommand)]
enum ConfgenSubcommands {
    /// Generate configuration files from all definitions.
    Generate(cmd::generate::Generate),
    /// Generate, watch for changes and restart a command after each successful generation.
    Watch(cmd::watch::Watch),
    /// Remove all generated files.
    Clean(cmd::clean::Clean),
    /// Confgen config controls.
    Config(cmd::config::Config),
}

#[cfg(test)]
mod tests {
    use crate::Confgen;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Confgen::command().debug_assert();
    }
}
