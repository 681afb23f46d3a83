use crate::{
    config::{
        self, Configuration,
        rt::RtcWatch,
        types::{ConfigDuration, StopSignal},
    },
    watch::WatchSystem,
};
use anyhow::Result;
use clap::Args;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::broadcast;

/// Generate, watch and re-run a command after every successful generation.
#[derive(Clone, Debug, Args)]
#[command(name = "watch")]
#[command(next_help_heading = "Watch")]
pub struct Watch {
    /// Additional path to watch, may be given multiple times
    #[arg(short, long)]
    pub watch: Option<Vec<PathBuf>>,

    /// Path to ignore, may be given multiple times
    #[arg(short, long)]
    pub ignore: Option<Vec<PathBuf>>,

    /// The signal used to stop the command
    #[arg(long)]
    pub signal: Option<StopSignal>,

    /// Time to wait for the command to exit, before killing it
    #[arg(long)]
    pub grace: Option<ConfigDuration>,

    /// The command to restart after each successful generation, followed by its arguments
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,

    // NOTE: flattened structures come last
    #[command(flatten)]
    pub generate: super::generate::Generate,
}

impl Watch {
    /// apply CLI overrides to the configuration
    pub fn apply_to(self, mut config: Configuration) -> Result<Configuration> {
        let Self {
            watch,
            ignore,
            signal,
            grace,
            command,
            generate,
        } = self;

        config.watch.watch = watch.unwrap_or(config.watch.watch);
        config.watch.ignore = ignore.unwrap_or(config.watch.ignore);

        let mut command = command.into_iter();
        if let Some(program) = command.next() {
            config.run.command = Some(program);
            config.run.args = command.collect();
        }
        config.run.signal = signal.unwrap_or(config.run.signal);
        config.run.grace = grace.unwrap_or(config.run.grace);

        generate.apply_to(config)
    }

    #[tracing::instrument(level = "trace", skip(self, config))]
    pub async fn run(self, config: Option<PathBuf>) -> Result<()> {
        let (cfg, working_directory) = config::load(config).await?;
        let cfg = self.apply_to(cfg)?;
        let cfg = RtcWatch::new(cfg, working_directory)?;

        let (shutdown_tx, _) = broadcast::channel(1);
        let system = WatchSystem::new(Arc::new(cfg), shutdown_tx.clone()).await?;

        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("received shutdown signal"),
                Err(err) => tracing::error!("error waiting for shutdown signal: {err}"),
            }
            let _ = shutdown_tx.send(());
        });

        system.generate().await;
        system.run().await;
        Ok(())
    }
}
