use crate::{
    config::{self, Configuration, rt::RtcGenerate},
    generate::{Generator, Mode},
};
use anyhow::{Result, ensure};
use clap::Args;
use std::{path::PathBuf, sync::Arc};

/// Generate configuration files from all definitions.
#[derive(Clone, Debug, Default, Args)]
#[command(name = "generate")]
#[command(next_help_heading = "Generate")]
pub struct Generate {
    /// The directory scanned for definition files
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Glob pattern selecting definition files, replaces the configured patterns
    #[arg(long = "include", value_name = "GLOB")]
    pub include: Option<Vec<String>>,

    /// Glob pattern of files to skip, replaces the configured patterns
    #[arg(long = "exclude", value_name = "GLOB")]
    pub exclude: Option<Vec<String>>,

    /// The directory output paths are resolved against
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Print the validated value of each definition
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub print: Option<bool>,

    /// Resolve and validate, but don't write any files
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub dry_run: Option<bool>,

    /// Reject overrides which don't match the partial schema
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub strict_overrides: Option<bool>,
}

impl Generate {
    /// apply CLI overrides to the configuration
    pub fn apply_to(self, mut config: Configuration) -> Result<Configuration> {
        let Self {
            root,
            include,
            exclude,
            out_dir,
            print,
            dry_run,
            strict_overrides,
        } = self;

        config.generate.root = root.unwrap_or(config.generate.root);
        config.generate.include = include.unwrap_or(config.generate.include);
        config.generate.exclude = exclude.unwrap_or(config.generate.exclude);
        config.generate.out_dir = out_dir.or(config.generate.out_dir);
        config.generate.print = print.unwrap_or(config.generate.print);
        config.generate.dry_run = dry_run.unwrap_or(config.generate.dry_run);
        config.generate.strict_overrides =
            strict_overrides.unwrap_or(config.generate.strict_overrides);

        Ok(config)
    }

    #[tracing::instrument(level = "trace", skip(self, config))]
    pub async fn run(self, config: Option<PathBuf>) -> Result<()> {
        let (cfg, working_directory) = config::load(config).await?;
        let cfg = self.apply_to(cfg)?;
        let cfg = RtcGenerate::new(cfg, working_directory)?;

        let mut generator = Generator::new(Arc::new(cfg), None);
        let summary = generator.run(Mode::Once).await?;
        ensure!(
            summary.is_success(),
            "{} definition(s) failed to generate",
            summary.failed
        );

        Ok(())
    }
}
