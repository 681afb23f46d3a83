use crate::config::Configuration;
use anyhow::{Context, bail};
use std::path::{Path, PathBuf};

/// A configuration source
#[derive(Debug)]
pub enum Source {
    /// A configuration file (maybe TOML, YAML or JSON)
    File(PathBuf),
    /// No configuration file, use the defaults
    Defaults,
}

const CANDIDATES: &[&str] = &[
    "Confgen.toml",
    ".confgen.toml",
    "Confgen.yaml",
    ".confgen.yaml",
    "Confgen.json",
    ".confgen.json",
];

impl Source {
    /// Find a first config source candidate in a directory
    pub fn find(path: &Path) -> Source {
        for name in CANDIDATES {
            if let Some(file) = check_path(path, name) {
                return Source::File(file);
            }
        }

        tracing::debug!("no configuration file found in {}", path.display());
        Source::Defaults
    }

    /// Load the configuration from the source.
    pub async fn load(self) -> anyhow::Result<Configuration> {
        match self {
            Self::File(file) => load_from(&file)
                .await
                .with_context(|| format!("error loading configuration '{}'", file.display())),
            Self::Defaults => Ok(Configuration::default()),
        }
    }
}

/// Load configuration from a file
///
/// Currently supported formats are:
///
/// * TOML
/// * YAML
/// * JSON
async fn load_from(file: &Path) -> anyhow::Result<Configuration> {
    let content = tokio::fs::read_to_string(file).await?;
    match file.extension().map(|s| s.to_string_lossy()).as_deref() {
        Some("toml") => Ok(toml::from_str(&content)?),
        Some("yaml") => Ok(serde_yaml::from_str(&content)?),
        Some("json") => Ok(serde_json::from_str(&content)?),

        Some(n) => {
            bail!("Unsupported configuration file type: {n}");
        }
        None => {
            bail!("Missing configuration file extension");
        }
    }
}

/// Check if a file can be found in a directory.
fn check_path(path: &Path, name: &str) -> Option<PathBuf> {
    let path = path.join(name);
    if path.is_file() { Some(path) } else { None }
}
