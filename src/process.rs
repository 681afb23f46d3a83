//! Running the dependent process.

use crate::config::{rt::RtcRun, types::StopSignal};
use anyhow::{Context, Result};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};

/// Spawns the configured command.
#[derive(Clone, Debug)]
pub struct ProcessRunner {
    cfg: Arc<RtcRun>,
}

impl ProcessRunner {
    pub fn new(cfg: Arc<RtcRun>) -> Self {
        Self { cfg }
    }

    /// Start the command, `generation` counts the successful generation runs so far.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn spawn(&self, generation: usize) -> Result<ProcessHandle> {
        let child = Command::new(&self.cfg.command)
            .current_dir(&self.cfg.working_directory)
            .args(&self.cfg.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .env("CONFGEN_GENERATION", generation.to_string())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("error spawning '{}'", self.cfg.command))?;

        tracing::info!(args = ?self.cfg.args, pid = ?child.id(), "spawned {}", self.cfg.command);

        Ok(ProcessHandle {
            child,
            command: self.cfg.command.clone(),
            signal: self.cfg.signal.clone(),
            grace: self.cfg.grace,
        })
    }
}

/// A running process, killed when dropped.
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
    command: String,
    signal: StopSignal,
    grace: Duration,
}

impl ProcessHandle {
    /// Stop the process.
    ///
    /// Sends the stop signal and waits for the process to exit. If it is still running after the
    /// grace period, it gets killed. On platforms without signals, it is killed right away.
    #[tracing::instrument(level = "trace", skip(self), fields(command = %self.command))]
    pub async fn terminate(mut self) -> Result<ExitStatus> {
        if let Some(status) = self.child.try_wait()? {
            tracing::debug!("{} already exited: {status}", self.command);
            return Ok(status);
        }

        #[cfg(unix)]
        if let Some(pid) = self.child.id() {
            use nix::sys::signal;
            use nix::unistd::Pid;

            let pid = Pid::from_raw(i32::try_from(pid).context("invalid process id")?);
            tracing::debug!("sending {} to {}", self.signal, self.command);
            if let Err(err) = signal::kill(pid, self.signal.as_nix()) {
                tracing::debug!("error signalling {}: {err}", self.command);
            }
        }
        #[cfg(not(unix))]
        {
            tracing::debug!("killing {}, {} is not supported", self.command, self.signal);
            self.child.start_kill()?;
        }

        match tokio::time::timeout(self.grace, self.child.wait()).await {
            Ok(status) => Ok(status?),
            Err(_) => {
                tracing::warn!(
                    "{} did not stop within {}, killing it",
                    self.command,
                    humantime::format_duration(self.grace)
                );
                self.child.kill().await?;
                Ok(self.child.wait().await?)
            }
        }
    }
}
