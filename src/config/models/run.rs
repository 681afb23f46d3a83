use crate::config::types::{ConfigDuration, StopSignal};
use schemars::JsonSchema;
use serde::Deserialize;
use std::time::Duration;

/// Config options for the process which is (re-)started after each successful generation.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, JsonSchema)]
pub struct Run {
    /// The command to run, nothing is run if unset [default: None]
    #[serde(default)]
    pub command: Option<String>,
    /// Any arguments to pass to the command.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// The signal used to stop the process [default: SIGTERM]
    #[serde(default)]
    #[schemars(with = "String")]
    pub signal: StopSignal,
    /// Time to wait for the process to exit, before killing it [default: 5s]
    #[serde(default = "default::grace")]
    #[schemars(with = "String")]
    pub grace: ConfigDuration,
}

impl Default for Run {
    fn default() -> Self {
        Self {
            command: None,
            args: vec![],
            signal: StopSignal::default(),
            grace: default::grace(),
        }
    }
}

mod default {
    use super::*;

    pub const fn grace() -> ConfigDuration {
        ConfigDuration(Duration::from_secs(5))
    }
}
