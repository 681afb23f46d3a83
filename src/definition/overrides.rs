use super::{Format, LoadOptions};
use crate::error::GenerateError;
use anyhow::{Context, bail, ensure};
use confgen_unit::{ConfigUnit, Map, Value, deep_merge};
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

/// An override layer of a definition.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "from", rename_all = "snake_case")]
pub enum Override {
    /// An inline partial value.
    Data { value: Value },
    /// Environment variables starting with `prefix`.
    ///
    /// The rest of the variable name is split on `separator` into a lowercase field path, so with
    /// a prefix of `APP_`, the variable `APP_DB__PORT` overrides `db.port`. Values are parsed as
    /// JSON, falling back to a plain string.
    Env {
        prefix: String,
        #[serde(default = "default::separator")]
        separator: String,
    },
    /// A JSON, YAML or TOML document, relative to the definition file.
    File {
        path: PathBuf,
        /// Skip the layer if the file doesn't exist.
        #[serde(default)]
        optional: bool,
    },
    /// The JSON printed to stdout by a command.
    ///
    /// The command runs in the directory of the definition file, with the current data provided
    /// as JSON in `CONFGEN_DATA`.
    Command {
        command: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

mod default {
    pub fn separator() -> String {
        "__".to_string()
    }
}

impl Override {
    /// Apply the layer to a unit, producing a new one.
    #[tracing::instrument(level = "trace", skip(self, unit, options))]
    pub async fn apply(
        &self,
        unit: ConfigUnit,
        base_dir: &Path,
        options: &LoadOptions,
    ) -> Result<ConfigUnit, GenerateError> {
        let source = match self {
            Self::Data { value } => {
                return match options.strict_overrides {
                    true => Ok(unit.override_checked(value.clone())?),
                    false => Ok(unit.override_with(value.clone())),
                };
            }
            Self::Env { prefix, separator } => Source::Env { prefix, separator },
            Self::File { path, optional } => Source::File {
                path: base_dir.join(path),
                optional: *optional,
            },
            Self::Command { command, args } => Source::Command {
                command,
                args,
                base_dir,
            },
        };

        let partial_schema = options.strict_overrides.then(|| unit.schema().partial());
        unit.override_async(|current| async move {
            let partial = source.fetch(current).await?;
            if let Some(schema) = partial_schema {
                schema.validate(Some(&partial))?;
            }
            Ok::<_, GenerateError>(partial)
        })
        .await
    }
}

/// Where a loaded override layer comes from.
enum Source<'a> {
    Env {
        prefix: &'a str,
        separator: &'a str,
    },
    File {
        path: PathBuf,
        optional: bool,
    },
    Command {
        command: &'a str,
        args: &'a [String],
        base_dir: &'a Path,
    },
}

impl Source<'_> {
    async fn fetch(&self, current: Arc<Value>) -> anyhow::Result<Value> {
        match self {
            Self::Env { prefix, separator } => Ok(env_partial(
                unicode_vars(std::env::vars_os()),
                prefix,
                separator,
            )),
            Self::File { path, optional } => read_file(path, *optional).await,
            Self::Command {
                command,
                args,
                base_dir,
            } => run_command(command, args, base_dir, &current).await,
        }
    }
}

/// Keep the environment variables whose name and value are valid unicode.
fn unicode_vars(
    vars: impl IntoIterator<Item = (OsString, OsString)>,
) -> impl Iterator<Item = (String, String)> {
    vars.into_iter()
        .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
            (Ok(key), Ok(value)) => Some((key, value)),
            (Ok(key), Err(_)) => {
                tracing::debug!("skipping environment variable {key}, its value isn't unicode");
                None
            }
            (Err(key), _) => {
                tracing::debug!("skipping non-unicode environment variable {key:?}");
                None
            }
        })
}

/// Build a partial value from environment variables.
pub fn env_partial(
    vars: impl IntoIterator<Item = (String, String)>,
    prefix: &str,
    separator: &str,
) -> Value {
    let mut vars = vars
        .into_iter()
        .filter_map(|(key, value)| {
            let path = key
                .strip_prefix(prefix)?
                .split(separator)
                .map(str::to_lowercase)
                .collect::<Vec<_>>();
            match path.iter().any(String::is_empty) {
                true => None,
                false => Some((key, path, value)),
            }
        })
        .collect::<Vec<_>>();
    vars.sort_by(|a, b| a.0.cmp(&b.0));

    vars.into_iter()
        .fold(Value::Object(Map::new()), |result, (_, path, value)| {
            let value = serde_json::from_str(&value).unwrap_or(Value::String(value));
            let nested = path.into_iter().rev().fold(value, |nested, key| {
                Value::Object(Map::from_iter([(key, nested)]))
            });
            deep_merge(&result, &nested)
        })
}

async fn read_file(path: &Path, optional: bool) -> anyhow::Result<Value> {
    if optional && !crate::common::path_exists(path).await? {
        tracing::debug!("skipping missing override file {}", path.display());
        return Ok(Value::Object(Map::new()));
    }

    let Some(format) = Format::from_path(path) else {
        bail!("unsupported override file format: '{}'", path.display());
    };
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("error reading override file '{}'", path.display()))?;

    format
        .parse(&content)
        .with_context(|| format!("error parsing override file '{}'", path.display()))
}

async fn run_command(
    command: &str,
    args: &[String],
    base_dir: &Path,
    current: &Value,
) -> anyhow::Result<Value> {
    tracing::debug!(?args, "running override command {command}");

    let output = Command::new(command)
        .current_dir(base_dir)
        .args(args)
        .env("CONFGEN_DATA", current.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .with_context(|| format!("error running override command '{command}'"))?;

    ensure!(
        output.status.success(),
        "override command '{command}' returned a bad status ({}): {}",
        output.status,
        String::from_utf8_lossy(&output.stderr).trim()
    );

    serde_json::from_slice(&output.stdout)
        .with_context(|| format!("output of override command '{command}' is not valid JSON"))
}
