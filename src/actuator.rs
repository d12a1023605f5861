use crate::collectors::Inspector;
use crate::config::Config;
use crate::confirm::{Confirm, Prompt};
use crate::runner::{CommandOutput, CommandRunner, Invocation, RunError, Spawned};
use crate::script::{self, Step, StepScript};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("{command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },
    #[error("step '{step}' failed: {stderr}")]
    StepFailed { step: Step, stderr: String },
    #[error(
        "{command} did not finish within {after:?}; it may still be running with elevated privileges"
    )]
    Timeout { command: String, after: Duration },
    #[error(
        "not enough space: need {required_gb} GB free on {mount}, but only {available_gb} GB available"
    )]
    InsufficientSpace {
        mount: String,
        required_gb: u64,
        available_gb: u64,
    },
    #[error("{path} is already an active swap area; deactivate it or choose another swap_file")]
    SwapFileActive { path: String },
    #[error("failed to start {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("lost track of {command}: {source}")]
    Wait {
        command: String,
        source: std::io::Error,
    },
    #[error("kernel arguments removed, but failed to remove the swap file: {source}")]
    SwapFileRemoval { source: Box<ActionError> },
}

impl From<RunError> for ActionError {
    fn from(err: RunError) -> Self {
        match err {
            RunError::Spawn { command, source } => ActionError::Spawn { command, source },
            RunError::Timeout { command, after } => ActionError::Timeout { command, after },
            RunError::Wait { command, source } => ActionError::Wait { command, source },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnableOutcome {
    AlreadyConfigured {
        device: String,
    },
    ResumeConfigured {
        uuid: String,
    },
    SwapFileCreated {
        path: PathBuf,
        size_gb: u64,
        uuid: Option<String>,
        offset: Option<String>,
    },
    Declined,
}

impl fmt::Display for EnableOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnableOutcome::AlreadyConfigured { device } => {
                write!(f, "Hibernation is already configured (resume={device}).")
            }
            EnableOutcome::ResumeConfigured { uuid } => write!(
                f,
                "Hibernation enabled with resume=UUID={uuid}. Please reboot to apply changes."
            ),
            EnableOutcome::SwapFileCreated { path, size_gb, .. } => write!(
                f,
                "{size_gb} GB swap file created at {} and hibernation enabled. Please reboot to apply changes.",
                path.display()
            ),
            EnableOutcome::Declined => f.write_str("Cancelled; nothing was changed."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapFileDisposition {
    Absent,
    Kept,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisableOutcome {
    Disabled { swap_file: SwapFileDisposition },
    Declined,
}

impl fmt::Display for DisableOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisableOutcome::Disabled {
                swap_file: SwapFileDisposition::Removed,
            } => f.write_str(
                "Hibernation disabled and swap file removed. Please reboot to complete the change.",
            ),
            DisableOutcome::Disabled { .. } => {
                f.write_str("Hibernation disabled. Please reboot to complete the change.")
            }
            DisableOutcome::Declined => f.write_str("Cancelled; nothing was changed."),
        }
    }
}

/// `Started` carries the handle of the elevated hibernate request. The
/// caller must stay alive and wait on it.
#[derive(Debug)]
pub enum TestOutcome<H> {
    Started(H),
    Declined,
}

impl<H> fmt::Display for TestOutcome<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestOutcome::Started(_) => f.write_str("Hibernation requested."),
            TestOutcome::Declined => f.write_str("Cancelled; nothing was changed."),
        }
    }
}

/// Waits for the hibernate request started by `Actuator::test` to exit.
/// It returns once the system has resumed, or at once if the request was
/// refused.
pub async fn wait_for_hibernate<H: Spawned>(handle: H) -> Result<(), ActionError> {
    let out = handle.wait().await?;
    if !out.success {
        warn!(stderr = %out.stderr.trim(), "hibernate request failed");
        return Err(ActionError::CommandFailed {
            command: "hibernate".to_string(),
            stderr: out.stderr.trim().to_string(),
        });
    }
    Ok(())
}

/// Applies hibernation changes. Every privileged or destructive step is
/// preceded by a confirmation; a multi-step change is a single elevated
/// invocation.
pub struct Actuator<'a, R> {
    cfg: &'a Config,
    runner: &'a R,
    inspector: Inspector<'a, R>,
}

impl<'a, R: CommandRunner> Actuator<'a, R> {
    pub fn new(cfg: &'a Config, runner: &'a R) -> Self {
        Self::with_inspector(cfg, runner, Inspector::new(cfg, runner))
    }

    pub fn with_inspector(cfg: &'a Config, runner: &'a R, inspector: Inspector<'a, R>) -> Self {
        Self {
            cfg,
            runner,
            inspector,
        }
    }

    pub async fn enable(&self, confirm: &dyn Confirm) -> Result<EnableOutcome, ActionError> {
        if let Some(device) = self.inspector.resume_config().device {
            info!(resume = %device, "resume already configured");
            return Ok(EnableOutcome::AlreadyConfigured { device });
        }

        let swaps = self.inspector.swap_entries().await;
        if let Some(uuid) = self.inspector.partition_uuid(&swaps).await {
            return self.configure_resume(uuid, confirm).await;
        }

        let ram_gb = match self.inspector.ram_gb() {
            Some(gb) => gb,
            None => {
                warn!(fallback_gb = self.cfg.fallback_ram_gb, "RAM size unknown, using fallback");
                self.cfg.fallback_ram_gb
            }
        };
        let required_gb = ram_gb + self.cfg.headroom_gb;

        // A file left behind by an earlier failed run is replaced; an active
        // swap area at the same path is not touched.
        let leftover = self.inspector.swap_file_exists();
        if leftover && swaps.iter().any(|s| Path::new(&s.name) == self.cfg.swap_file) {
            return Err(ActionError::SwapFileActive {
                path: self.cfg.swap_file.display().to_string(),
            });
        }

        let mut free_gb = self.inspector.free_space_gb().unwrap_or(0);
        if leftover {
            free_gb += self.inspector.swap_file_size_gb().unwrap_or(0);
        }
        if free_gb < required_gb {
            warn!(required_gb, free_gb, "not enough free space for a swap file");
            return Err(ActionError::InsufficientSpace {
                mount: self.cfg.root_mount.display().to_string(),
                required_gb,
                available_gb: free_gb,
            });
        }
        if leftover {
            let prompt = Prompt::RemoveSwapFile {
                path: self.cfg.swap_file.clone(),
            };
            if !confirm.confirm(&prompt) {
                return Ok(EnableOutcome::Declined);
            }
        }

        let prompt = Prompt::CreateSwapFile {
            path: self.cfg.swap_file.clone(),
            size_gb: ram_gb,
            free_gb,
        };
        if !confirm.confirm(&prompt) {
            return Ok(EnableOutcome::Declined);
        }

        let creation = script::swap_file_creation(self.cfg, ram_gb);
        let script = if leftover {
            info!(path = %self.cfg.swap_file.display(), "replacing inactive swap file");
            script::swap_file_removal(self.cfg).then(creation)
        } else {
            creation
        };
        let out = self
            .run_script(&script, self.cfg.swap_file_timeout)
            .await?;
        let mut values = script::reported_values(&out.stdout);
        info!(path = %self.cfg.swap_file.display(), size_gb = ram_gb, "swap file created");
        Ok(EnableOutcome::SwapFileCreated {
            path: self.cfg.swap_file.clone(),
            size_gb: ram_gb,
            uuid: values.remove("uuid"),
            offset: values.remove("offset"),
        })
    }

    async fn configure_resume(
        &self,
        uuid: String,
        confirm: &dyn Confirm,
    ) -> Result<EnableOutcome, ActionError> {
        if !confirm.confirm(&Prompt::ConfigureResume { uuid: uuid.clone() }) {
            return Ok(EnableOutcome::Declined);
        }
        let inv = Invocation::new(
            &self.cfg.commands.bootloader,
            [
                "--update-kernel=ALL".to_string(),
                format!("--args=resume=UUID={uuid}"),
            ],
        )
        .privileged();
        self.run_checked(&inv).await?;
        info!(uuid = %uuid, "resume parameter set");
        Ok(EnableOutcome::ResumeConfigured { uuid })
    }

    pub async fn disable(&self, confirm: &dyn Confirm) -> Result<DisableOutcome, ActionError> {
        if !confirm.confirm(&Prompt::DisableHibernation) {
            return Ok(DisableOutcome::Declined);
        }

        let inv = Invocation::new(
            &self.cfg.commands.bootloader,
            ["--update-kernel=ALL", "--remove-args=resume,resume_offset"],
        )
        .privileged();
        self.run_checked(&inv).await?;
        info!("resume parameters removed");

        if !self.inspector.swap_file_exists() {
            return Ok(DisableOutcome::Disabled {
                swap_file: SwapFileDisposition::Absent,
            });
        }

        let prompt = Prompt::RemoveSwapFile {
            path: self.cfg.swap_file.clone(),
        };
        if !confirm.confirm(&prompt) {
            return Ok(DisableOutcome::Disabled {
                swap_file: SwapFileDisposition::Kept,
            });
        }

        let script = script::swap_file_removal(self.cfg);
        self.run_script(&script, self.cfg.swap_file_timeout)
            .await
            .map_err(|err| ActionError::SwapFileRemoval {
                source: Box::new(err),
            })?;
        info!(path = %self.cfg.swap_file.display(), "swap file removed");
        Ok(DisableOutcome::Disabled {
            swap_file: SwapFileDisposition::Removed,
        })
    }

    /// Requests hibernation and returns at once with the request's handle;
    /// the caller is suspended along with everything else and resumes
    /// transparently.
    pub fn test(&self, confirm: &dyn Confirm) -> Result<TestOutcome<R::Handle>, ActionError> {
        if !confirm.confirm(&Prompt::TestHibernate) {
            return Ok(TestOutcome::Declined);
        }
        let (program, args) = self
            .cfg
            .commands
            .hibernate
            .split_first()
            .ok_or_else(|| ActionError::CommandFailed {
                command: "hibernate".to_string(),
                stderr: "no hibernate command configured".to_string(),
            })?;
        let inv = Invocation::new(program, args.iter().cloned()).privileged();
        let handle = self.runner.spawn(&inv)?;
        Ok(TestOutcome::Started(handle))
    }

    async fn run_checked(&self, inv: &Invocation) -> Result<CommandOutput, ActionError> {
        let out = self.runner.run(inv).await?;
        if !out.success {
            warn!(command = %inv, stderr = %out.stderr.trim(), "privileged command failed");
            return Err(ActionError::CommandFailed {
                command: inv.program.clone(),
                stderr: out.stderr.trim().to_string(),
            });
        }
        Ok(out)
    }

    async fn run_script(
        &self,
        script: &StepScript,
        timeout: Duration,
    ) -> Result<CommandOutput, ActionError> {
        let inv = script.invocation().with_timeout(timeout);
        let steps: Vec<&str> = script.steps().map(Step::name).collect();
        info!(steps = %steps.join(","), timeout = ?timeout, "running privileged script");
        let out = self.runner.run(&inv).await.map_err(|err| match err {
            RunError::Timeout { after, .. } => ActionError::Timeout {
                command: "privileged script".to_string(),
                after,
            },
            other => other.into(),
        })?;
        if out.success {
            return Ok(out);
        }

        let stderr = out.stderr.trim().to_string();
        match script::last_step(&out.stdout) {
            Some(step) => {
                warn!(step = %step, stderr = %stderr, "privileged script step failed");
                Err(ActionError::StepFailed { step, stderr })
            }
            None => {
                warn!(stderr = %stderr, "privileged script did not start");
                Err(ActionError::CommandFailed {
                    command: self.cfg.commands.elevate.clone(),
                    stderr,
                })
            }
        }
    }
}
