use schemars::JsonSchema;
use serde::Deserialize;
use std::path::PathBuf;

/// Config options for the generate system.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, JsonSchema)]
pub struct Generate {
    /// The directory scanned for definition files [default: "."]
    #[serde(default = "default::root")]
    pub root: PathBuf,
    /// Glob patterns selecting definition files, relative to the root
    /// [default: ["**/*.confgen.{toml,yaml,yml,json}"]]
    #[serde(default = "default::include")]
    pub include: Vec<String>,
    /// Glob patterns of files to skip while scanning, relative to the root
    #[serde(default = "default::exclude")]
    pub exclude: Vec<String>,
    /// The directory output paths are resolved against [default: the directory of each definition]
    #[serde(default)]
    pub out_dir: Option<PathBuf>,
    /// Print the validated value of each definition [default: false]
    #[serde(default)]
    pub print: bool,
    /// Resolve and validate, but don't write any files [default: false]
    #[serde(default)]
    pub dry_run: bool,
    /// Reject inline and loaded overrides which don't match the partial schema [default: false]
    #[serde(default)]
    pub strict_overrides: bool,
}

impl Default for Generate {
    fn default() -> Self {
        Self {
            root: default::root(),
            include: default::include(),
            exclude: default::exclude(),
            out_dir: None,
            print: false,
            dry_run: false,
            strict_overrides: false,
        }
    }
}

mod default {
    use std::path::PathBuf;

    pub fn root() -> PathBuf {
        PathBuf::from(".")
    }

    pub fn include() -> Vec<String> {
        vec!["**/*.confgen.{toml,yaml,yml,json}".to_string()]
    }

    pub fn exclude() -> Vec<String> {
        [
            "**/.git/**",
            "**/node_modules/**",
            "**/target/**",
            // hidden project configuration files
            "**/.confgen.{toml,yaml,json}",
        ]
        .map(|s| s.to_string())
        .into()
    }
}
