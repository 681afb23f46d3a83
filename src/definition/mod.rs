//! Definition files
//!
//! A definition file describes a single [`ConfigUnit`]: its schema, its data, the definitions it
//! extends and the override layers applied on top. Loading a definition is the factory producing
//! the unit of a generation run.

mod overrides;

#[cfg(test)]
mod test;

pub use overrides::*;

use crate::error::GenerateError;
use anyhow::Context;
use confgen_unit::{ConfigUnit, Schema, SchemaConflict, Value};
use futures_util::future::BoxFuture;
use serde::{Deserialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};

/// The content of a definition file.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Definition {
    /// Definitions merged before this one, relative to this file.
    #[serde(default)]
    pub extends: Vec<PathBuf>,
    #[serde(default)]
    pub schema: Schema,
    #[serde(default)]
    pub data: Option<Value>,
    /// Override layers, applied in order.
    #[serde(default, rename = "override")]
    pub overrides: Vec<Override>,
}

impl Definition {
    /// Read and parse a definition file, the format is taken from its extension.
    pub async fn read(path: &Path) -> Result<Self, GenerateError> {
        let format = Format::from_path(path)
            .ok_or_else(|| DefinitionError::UnsupportedFormat(path.to_path_buf()))?;
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("error reading definition '{}'", path.display()))?;

        format.parse(&content).map_err(|source| {
            DefinitionError::Parse {
                path: path.to_path_buf(),
                source,
            }
            .into()
        })
    }
}

/// Options for loading definitions.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoadOptions {
    /// Check every override layer against the partial schema.
    pub strict_overrides: bool,
}

/// Load the unit of a definition file.
///
/// Extended definitions are loaded (recursively) and merged in order, the definition's own
/// schema and data last. The override layers are applied to the merged unit afterwards.
#[tracing::instrument(level = "trace", skip(options))]
pub async fn load(path: &Path, options: &LoadOptions) -> Result<ConfigUnit, GenerateError> {
    let path = tokio::fs::canonicalize(path)
        .await
        .with_context(|| format!("error taking the canonical path to '{}'", path.display()))?;
    load_recursive(path, options, Vec::new()).await
}

fn load_recursive<'a>(
    path: PathBuf,
    options: &'a LoadOptions,
    mut chain: Vec<PathBuf>,
) -> BoxFuture<'a, Result<ConfigUnit, GenerateError>> {
    Box::pin(async move {
        tracing::trace!("loading definition {}", path.display());
        chain.push(path.clone());

        let definition = Definition::read(&path).await?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut unit: Option<ConfigUnit> = None;
        for target in &definition.extends {
            let target = base_dir.join(target);
            let Ok(target) = tokio::fs::canonicalize(&target).await else {
                return Err(DefinitionError::MissingExtends {
                    from: path.clone(),
                    target,
                }
                .into());
            };

            if chain.contains(&target) {
                let mut chain = chain.clone();
                chain.push(target);
                return Err(DefinitionError::ExtendsCycle { chain }.into());
            }

            let base = load_recursive(target, options, chain.clone()).await?;
            unit = Some(match unit {
                Some(unit) => merge(&unit, &base, &path)?,
                None => base,
            });
        }

        let own = ConfigUnit::new(definition.schema, definition.data);
        let mut unit = match unit {
            Some(unit) => merge(&unit, &own, &path)?,
            None => own,
        };

        for layer in &definition.overrides {
            unit = layer.apply(unit, &base_dir, options).await?;
        }

        Ok(unit)
    })
}

fn merge(left: &ConfigUnit, right: &ConfigUnit, path: &Path) -> Result<ConfigUnit, DefinitionError> {
    left.merge(right)
        .map_err(|source| DefinitionError::SchemaConflict {
            path: path.to_path_buf(),
            source,
        })
}

/// A structured document format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Toml,
    Yaml,
    Json,
}

impl Format {
    /// Detect the format from the extension of a path.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn parse<T: DeserializeOwned>(self, content: &str) -> Result<T, ParseError> {
        Ok(match self {
            Self::Toml => toml::from_str(content)?,
            Self::Yaml => serde_yaml::from_str(content)?,
            Self::Json => serde_json::from_str(content)?,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Mistakes in authoring definition files.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("unsupported definition format: '{}'", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("error parsing '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
    #[error("'{}' extends '{}', which does not exist", from.display(), target.display())]
    MissingExtends { from: PathBuf, target: PathBuf },
    #[error("definitions extend each other in a cycle: {}", display_chain(chain))]
    ExtendsCycle { chain: Vec<PathBuf> },
    #[error("error merging '{}': {source}", path.display())]
    SchemaConflict {
        path: PathBuf,
        #[source]
        source: SchemaConflict,
    },
}

fn display_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|path| crate::common::strip_prefix(path).display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
