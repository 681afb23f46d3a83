use crate::{
    config::{self, Configuration, rt::RtcGenerate},
    generate::Generator,
};
use anyhow::{Result, ensure};
use clap::Args;
use std::{path::PathBuf, sync::Arc};

/// Remove all generated files.
#[derive(Clone, Debug, Args)]
#[command(name = "clean")]
#[command(next_help_heading = "Clean")]
pub struct Clean {
    /// The directory scanned for definition files
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// The directory output paths are resolved against
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Report the files which would be removed, without removing them
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub dry_run: Option<bool>,
}

impl Clean {
    /// apply CLI overrides to the configuration
    pub fn apply_to(self, mut config: Configuration) -> Result<Configuration> {
        let Self {
            root,
            out_dir,
            dry_run,
        } = self;

        config.generate.root = root.unwrap_or(config.generate.root);
        config.generate.out_dir = out_dir.or(config.generate.out_dir);
        config.generate.dry_run = dry_run.unwrap_or(config.generate.dry_run);

        Ok(config)
    }

    #[tracing::instrument(level = "trace", skip(self, config))]
    pub async fn run(self, config: Option<PathBuf>) -> Result<()> {
        let (cfg, working_directory) = config::load(config).await?;
        let cfg = self.apply_to(cfg)?;
        let cfg = RtcGenerate::new(cfg, working_directory)?;

        let summary = Generator::new(Arc::new(cfg), None).clean().await?;
        ensure!(
            summary.is_success(),
            "{} definition(s) could not be resolved",
            summary.failed
        );

        Ok(())
    }
}
