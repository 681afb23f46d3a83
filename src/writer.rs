//! Persisting validated values.
//!
//! A validated value is a mapping of output paths to documents. The extension of each path selects
//! how its document is rendered.

use crate::common::{path_exists, strip_prefix, target_path};
use anyhow::{Context, Result, bail, ensure};
use confgen_unit::{Map, Value};
use std::path::{Path, PathBuf};

/// The format of an output file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty printed, with a trailing newline.
    Json,
    Yaml,
    Toml,
    /// `KEY=value` lines of a flat mapping.
    Env,
    /// A string document, written as is.
    Text,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::Json,
            Some("yaml" | "yml") => Self::Yaml,
            Some("toml") => Self::Toml,
            Some("env") => Self::Env,
            _ if path.file_name().and_then(|name| name.to_str()) == Some(".env") => Self::Env,
            _ => Self::Text,
        }
    }
}

/// Writes the outputs of a validated value.
#[derive(Clone, Debug)]
pub struct Writer {
    out_dir: PathBuf,
    dry_run: bool,
}

impl Writer {
    /// Create a new writer, resolving output paths against `out_dir`.
    pub fn new(out_dir: PathBuf, dry_run: bool) -> Self {
        Self { out_dir, dry_run }
    }

    /// Resolve the outputs of a validated value.
    pub fn targets<'v>(&self, value: &'v Value) -> Result<Vec<(PathBuf, &'v Value)>> {
        let Some(outputs) = value.as_object() else {
            bail!("the validated value must be a mapping of output paths to documents");
        };

        outputs
            .iter()
            .map(|(path, document)| Ok((target_path(&self.out_dir, Path::new(path))?, document)))
            .collect()
    }

    /// Render and write all outputs of a validated value.
    ///
    /// Returns the paths of all outputs. Files which already have the rendered content are left
    /// untouched. Nothing is written in dry-run mode.
    #[tracing::instrument(level = "trace", skip(self, value))]
    pub async fn persist(&self, value: &Value) -> Result<Vec<PathBuf>> {
        // render everything first, so that a broken document doesn't leave half the outputs written
        let rendered = self
            .targets(value)?
            .into_iter()
            .map(|(path, document)| {
                let content = render(&path, document)
                    .with_context(|| format!("error rendering '{}'", strip_prefix(&path).display()))?;
                Ok((path, content))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut paths = Vec::with_capacity(rendered.len());
        for (path, content) in rendered {
            if self.dry_run {
                tracing::info!("would write {}", strip_prefix(&path).display());
            } else {
                write_if_changed(&path, &content).await?;
            }
            paths.push(path);
        }

        Ok(paths)
    }

    /// Remove all outputs of a validated value, returning the paths which were removed.
    #[tracing::instrument(level = "trace", skip(self, value))]
    pub async fn remove(&self, value: &Value) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        for (path, _) in self.targets(value)? {
            if !path_exists(&path).await? {
                continue;
            }
            if self.dry_run {
                tracing::info!("would remove {}", strip_prefix(&path).display());
            } else {
                tokio::fs::remove_file(&path)
                    .await
                    .with_context(|| format!("error removing '{}'", path.display()))?;
            }
            removed.push(path);
        }
        Ok(removed)
    }
}

async fn write_if_changed(path: &Path, content: &str) -> Result<()> {
    if let Ok(existing) = tokio::fs::read_to_string(path).await
        && existing == content
    {
        tracing::debug!("{} is up to date", strip_prefix(path).display());
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("error creating directory '{}'", parent.display()))?;
    }
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("error writing '{}'", path.display()))?;

    tracing::debug!("wrote {}", strip_prefix(path).display());
    Ok(())
}

/// Render a document in the format selected by its path.
pub fn render(path: &Path, document: &Value) -> Result<String> {
    Ok(match OutputFormat::from_path(path) {
        OutputFormat::Json => {
            let mut content = serde_json::to_string_pretty(document)?;
            content.push('\n');
            content
        }
        OutputFormat::Yaml => serde_yaml::to_string(document)?,
        OutputFormat::Toml => {
            ensure!(document.is_object(), "a TOML document must be a mapping");
            toml::to_string_pretty(document)?
        }
        OutputFormat::Env => match document {
            Value::Object(vars) => render_env(vars)?,
            _ => bail!("an env document must be a mapping"),
        },
        OutputFormat::Text => match document {
            Value::String(text) => text.clone(),
            _ => bail!("a document without a structured format must be a string"),
        },
    })
}

fn render_env(vars: &Map<String, Value>) -> Result<String> {
    let mut content = String::new();
    for (key, value) in vars {
        let value = match value {
            Value::Null => String::new(),
            Value::Bool(value) => value.to_string(),
            Value::Number(value) => value.to_string(),
            Value::String(value) if needs_quotes(value) => Value::String(value.clone()).to_string(),
            Value::String(value) => value.clone(),
            Value::Array(_) | Value::Object(_) => bail!("env variable '{key}' must be a scalar"),
        };
        content.push_str(&format!("{key}={value}\n"));
    }
    Ok(content)
}

fn needs_quotes(value: &str) -> bool {
    value
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '#' | '$' | '\\' | '='))
}
