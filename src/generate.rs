//! Generation runs.

use crate::common::{ERROR, GENERATING, SUCCESS, WATCHING, strip_prefix};
use crate::config::rt::RtcGenerate;
use crate::definition::{self, LoadOptions};
use crate::error::GenerateError;
use crate::scanner::Scanner;
use crate::writer::Writer;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

/// How a generation run is driven.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// A single run, invoked from the command line.
    Once,
    /// One of many runs, triggered by file changes.
    Watch,
}

/// The outcome of a generation run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// Definitions which were generated.
    pub succeeded: usize,
    /// Definitions which failed.
    pub failed: usize,
    /// Files written (or removed, when cleaning).
    pub written: Vec<PathBuf>,
}

impl Summary {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Generates the outputs of all definitions below the configured root.
pub struct Generator {
    cfg: Arc<RtcGenerate>,
    scanner: Scanner,
    /// Receives every output path before it is written, so the watch system can ignore it.
    ignore_chan: Option<mpsc::Sender<PathBuf>>,
}

impl Generator {
    /// Create a new instance.
    pub fn new(cfg: Arc<RtcGenerate>, ignore_chan: Option<mpsc::Sender<PathBuf>>) -> Self {
        let scanner = Scanner::new(cfg.include.clone(), cfg.exclude.clone());
        Self {
            cfg,
            scanner,
            ignore_chan,
        }
    }

    /// Run a generation over all definitions.
    ///
    /// A failing definition doesn't stop the run, it is reported and counted in the summary. Only
    /// failing to scan for definitions fails the run.
    #[tracing::instrument(level = "trace", skip(self))]
    pub async fn run(&mut self, mode: Mode) -> Result<Summary> {
        let definitions = self.scanner.find(&self.cfg.root).await?;
        tracing::info!(
            "{}generating {} definition(s)",
            GENERATING,
            definitions.len()
        );

        let mut summary = Summary::default();
        for definition in &definitions {
            match self.generate_one(definition).await {
                Ok(written) => {
                    summary.succeeded += 1;
                    summary.written.extend(written);
                }
                Err(err) => {
                    summary.failed += 1;
                    report(definition, &err);
                }
            }
        }

        match summary.is_success() {
            true => tracing::info!(
                "{}generated {} file(s) from {} definition(s)",
                SUCCESS,
                summary.written.len(),
                summary.succeeded
            ),
            false => tracing::error!(
                "{}{} of {} definition(s) failed",
                ERROR,
                summary.failed,
                definitions.len()
            ),
        }
        if mode == Mode::Watch {
            tracing::info!("{}waiting for changes", WATCHING);
        }

        Ok(summary)
    }

    /// Remove the outputs of all definitions.
    #[tracing::instrument(level = "trace", skip(self))]
    pub async fn clean(&self) -> Result<Summary> {
        let definitions = self.scanner.find(&self.cfg.root).await?;

        let mut summary = Summary::default();
        for definition in &definitions {
            match self.clean_one(definition).await {
                Ok(removed) => {
                    summary.succeeded += 1;
                    summary.written.extend(removed);
                }
                Err(err) => {
                    summary.failed += 1;
                    report(definition, &err);
                }
            }
        }

        tracing::info!(
            "{}removed {} file(s) of {} definition(s)",
            SUCCESS,
            summary.written.len(),
            summary.succeeded
        );
        Ok(summary)
    }

    async fn generate_one(&self, definition: &Path) -> Result<Vec<PathBuf>, GenerateError> {
        tracing::debug!("generating {}", strip_prefix(definition).display());

        let unit = definition::load(definition, &self.load_options()).await?;
        let value = unit.resolve()?;

        if self.cfg.print {
            let pretty = serde_json::to_string_pretty(&value)
                .context("error formatting the validated value")?;
            println!("# {}\n{pretty}", strip_prefix(definition).display());
        }

        let writer = self.writer(definition);
        if let Some(tx) = self.ignore_chan.as_ref() {
            for (path, _) in writer.targets(&value)? {
                let _ = tx.send(path).await;
            }
        }

        Ok(writer.persist(&value).await?)
    }

    async fn clean_one(&self, definition: &Path) -> Result<Vec<PathBuf>, GenerateError> {
        let unit = definition::load(definition, &self.load_options()).await?;
        let value = unit.resolve()?;
        Ok(self.writer(definition).remove(&value).await?)
    }

    fn writer(&self, definition: &Path) -> Writer {
        Writer::new(self.cfg.out_dir_for(definition), self.cfg.dry_run)
    }

    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            strict_overrides: self.cfg.strict_overrides,
        }
    }
}

fn report(definition: &Path, err: &GenerateError) {
    tracing::error!(
        "{}{} in {}: {:#}",
        ERROR,
        err.class(),
        strip_prefix(definition).display(),
        err
    );
}
