use crate::config::{Configuration, Generate};
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};

/// Runtime config for the generate system.
#[derive(Clone, Debug)]
pub struct RtcGenerate {
    /// The directory relative paths of the configuration are resolved against.
    pub working_directory: PathBuf,
    /// The canonical directory scanned for definition files.
    pub root: PathBuf,
    /// Definition files to include.
    pub include: GlobSet,
    /// Files to skip.
    pub exclude: GlobSet,
    /// The directory output paths are resolved against, if not the definition's directory.
    pub out_dir: Option<PathBuf>,
    /// Print the validated value of each definition.
    pub print: bool,
    /// Don't write any files.
    pub dry_run: bool,
    /// Check overrides against the partial schema.
    pub strict_overrides: bool,
}

impl RtcGenerate {
    /// Construct a new instance.
    pub fn new(config: Configuration, working_directory: PathBuf) -> Result<Self> {
        let Generate {
            root,
            include,
            exclude,
            out_dir,
            print,
            dry_run,
            strict_overrides,
        } = config.generate;

        let root = working_directory.join(root);
        let root = root.canonicalize().with_context(|| {
            format!(
                "error taking the canonical path to the generate root: {:?}",
                root
            )
        })?;

        let include = glob_set(&include).context("invalid include pattern")?;
        let exclude = glob_set(&exclude).context("invalid exclude pattern")?;

        let out_dir = out_dir.map(|out_dir| working_directory.join(out_dir));

        Ok(Self {
            working_directory,
            root,
            include,
            exclude,
            out_dir,
            print,
            dry_run,
            strict_overrides,
        })
    }

    /// The directory the outputs of a definition are written to.
    pub fn out_dir_for(&self, definition: &Path) -> PathBuf {
        match &self.out_dir {
            Some(out_dir) => out_dir.clone(),
            None => definition
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.root.clone()),
        }
    }
}

fn glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("error parsing '{pattern}'"))?);
    }
    Ok(builder.build()?)
}
