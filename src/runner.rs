use std::fmt;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::time;
use tracing::{debug, info};

/// A single external command line, optionally run through the elevation
/// mechanism and optionally bounded by a timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub privileged: bool,
    pub timeout: Option<Duration>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            privileged: false,
            timeout: None,
        }
    }

    pub fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to start {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("{command} did not finish within {after:?}")]
    Timeout { command: String, after: Duration },
    #[error("failed to wait for {command}: {source}")]
    Wait {
        command: String,
        source: std::io::Error,
    },
}

/// A started command whose exit has not been collected yet.
#[allow(async_fn_in_trait)]
pub trait Spawned {
    async fn wait(self) -> Result<CommandOutput, RunError>;
}

#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    type Handle: Spawned;

    /// Runs the command to completion and captures its output.
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, RunError>;

    /// Starts the command and returns without waiting for it. The caller
    /// keeps the handle: `pkexec` refuses to act for an orphaned child.
    fn spawn(&self, invocation: &Invocation) -> Result<Self::Handle, RunError>;
}

#[derive(Debug)]
pub struct SystemChild {
    command: String,
    child: Child,
}

impl Spawned for SystemChild {
    async fn wait(self) -> Result<CommandOutput, RunError> {
        let output = self
            .child
            .wait_with_output()
            .await
            .map_err(|source| RunError::Wait {
                command: self.command.clone(),
                source,
            })?;
        debug!(command = %self.command, status = %output.status, "spawned command exited");
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Runs commands on the host, prefixing privileged ones with the elevation
/// program (e.g. `pkexec`).
#[derive(Debug, Clone)]
pub struct SystemRunner {
    elevate: String,
}

impl SystemRunner {
    pub fn new(elevate: impl Into<String>) -> Self {
        Self {
            elevate: elevate.into(),
        }
    }

    fn build(&self, invocation: &Invocation) -> Command {
        let mut cmd = if invocation.privileged {
            let mut cmd = Command::new(&self.elevate);
            cmd.arg(&invocation.program);
            cmd
        } else {
            Command::new(&invocation.program)
        };
        cmd.args(&invocation.args);
        cmd
    }
}

impl CommandRunner for SystemRunner {
    type Handle = SystemChild;

    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, RunError> {
        let mut cmd = self.build(invocation);
        cmd.stdin(Stdio::null()).kill_on_drop(true);
        if invocation.privileged {
            info!(command = %invocation, elevate = %self.elevate, "running privileged command");
        } else {
            debug!(command = %invocation, "running command");
        }

        let fut = cmd.output();
        let output = match invocation.timeout {
            Some(limit) => match time::timeout(limit, fut).await {
                Ok(res) => res,
                Err(_elapsed) => {
                    return Err(RunError::Timeout {
                        command: invocation.to_string(),
                        after: limit,
                    })
                }
            },
            None => fut.await,
        }
        .map_err(|source| RunError::Spawn {
            command: invocation.to_string(),
            source,
        })?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn spawn(&self, invocation: &Invocation) -> Result<SystemChild, RunError> {
        info!(command = %invocation, privileged = invocation.privileged, "starting command");
        let child = self
            .build(invocation)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RunError::Spawn {
                command: invocation.to_string(),
                source,
            })?;
        Ok(SystemChild {
            command: invocation.to_string(),
            child,
        })
    }
}
