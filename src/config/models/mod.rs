//! The configuration model
//!
//! This is what the user provides, and which gets converted into the runtime model. The CLI will
//! override certain aspects of it when running commands.

pub mod source;

mod generate;
mod run;
mod watch;

pub use generate::*;
pub use run::*;
pub use watch::*;


use anyhow::{Context, Result, bail};
use schemars::JsonSchema;
use serde::Deserialize;
use source::Source;
use std::path::PathBuf;

/// The persisted confgen configuration model
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, JsonSchema)]
pub struct Configuration {
    #[serde(default)]
    pub generate: Generate,

    #[serde(default)]
    pub watch: Watch,

    #[serde(default)]
    pub run: Run,
}

/// Locate and load the configuration, given an optional file or directory. Falling back to the
/// current directory.
///
/// Returns the configuration and the directory relative paths of the configuration are resolved
/// against. If no configuration file can be found, the default configuration is used.
pub async fn load(path: Option<PathBuf>) -> Result<(Configuration, PathBuf)> {
    match path {
        // if we have a file, load it
        Some(path) if path.is_file() => {
            // Canonicalize the path to the configuration, so that we get a proper parent.
            // Otherwise, we might end up with a parent of '', which won't work later on.
            let path = path.canonicalize().with_context(|| {
                format!(
                    "unable to canonicalize path to configuration: '{}'",
                    path.display()
                )
            })?;
            let Some(cwd) = path.parent() else {
                bail!("unable to get parent directory of '{}'", path.display());
            };
            let cwd = cwd.to_path_buf();

            Ok((Source::File(path).load().await?, cwd))
        }
        // if we have a directory, try finding a file and load it
        Some(path) if path.is_dir() => Ok((Source::find(&path).load().await?, path)),
        // if we have something else, we can't deal with it
        Some(path) => bail!("{} is neither a file nor a directory", path.display()),
        // if we have nothing, try to find a file in the current directory and load it
        None => {
            let cwd = std::env::current_dir().context("unable to get current directory")?;
            Ok((Source::find(&cwd).load().await?, cwd))
        }
    }
}
