use crate::config::{Run, types::StopSignal};
use std::path::PathBuf;
use std::time::Duration;

/// Runtime config for the dependent process.
#[derive(Clone, Debug)]
pub struct RtcRun {
    /// The command to run.
    pub command: String,
    /// Arguments passed to the command.
    pub args: Vec<String>,
    /// The signal sent to stop the process.
    pub signal: StopSignal,
    /// Time to wait for the process to exit after signalling it.
    pub grace: Duration,
    /// The directory the process is started in.
    pub working_directory: PathBuf,
}

impl RtcRun {
    /// Construct a new instance, if a command is configured.
    pub fn new(run: Run, working_directory: PathBuf) -> Option<Self> {
        let Run {
            command,
            args,
            signal,
            grace,
        } = run;

        command.map(|command| Self {
            command,
            args,
            signal,
            grace: grace.0,
            working_directory,
        })
    }
}
