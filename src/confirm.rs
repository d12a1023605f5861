use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::warn;

/// A question the actuator asks before a privileged or destructive step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    TestHibernate,
    ConfigureResume { uuid: String },
    CreateSwapFile {
        path: PathBuf,
        size_gb: u64,
        free_gb: u64,
    },
    DisableHibernation,
    RemoveSwapFile { path: PathBuf },
}

impl Prompt {
    pub fn title(&self) -> &'static str {
        match self {
            Prompt::TestHibernate => "Confirm hibernation test",
            Prompt::ConfigureResume { .. } => "Enable hibernation?",
            Prompt::CreateSwapFile { .. } => "Create swap file?",
            Prompt::DisableHibernation => "Disable hibernation?",
            Prompt::RemoveSwapFile { .. } => "Remove swap file?",
        }
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prompt::TestHibernate => f.write_str(
                "This will hibernate the system immediately. Save all your work first!\n\
                 The screen will turn off and the session should come back on resume.",
            ),
            Prompt::ConfigureResume { uuid } => {
                write!(f, "Configure the kernel to resume from UUID={uuid}.")
            }
            Prompt::CreateSwapFile {
                path,
                size_gb,
                free_gb,
            } => write!(
                f,
                "No swap partition found. Create a {size_gb} GB swap file to enable hibernation?\n\
                 - File: {}\n\
                 - Requires {size_gb} GB of free space (you have {free_gb} GB)\n\
                 - Your password will be required.",
                path.display()
            ),
            Prompt::DisableHibernation => f.write_str(
                "This will remove 'resume=' and 'resume_offset=' from the kernel boot \
                 parameters and offer to remove the swap file if one exists.",
            ),
            Prompt::RemoveSwapFile { path } => write!(
                f,
                "A swap file ({}) exists. Remove it to free up disk space?\n\
                 Swapping to it stops immediately.",
                path.display()
            ),
        }
    }
}

/// Synchronous confirmation hook. Returning `false` aborts the step.
pub trait Confirm {
    fn confirm(&self, prompt: &Prompt) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&Prompt) -> bool,
{
    fn confirm(&self, prompt: &Prompt) -> bool {
        self(prompt)
    }
}

/// Answers every prompt the same way without asking.
#[derive(Debug, Clone, Copy)]
pub struct Always(pub bool);

impl Confirm for Always {
    fn confirm(&self, _prompt: &Prompt) -> bool {
        self.0
    }
}

/// Asks on the controlling terminal; anything but `y`/`yes` is a no.
#[derive(Debug, Default)]
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, prompt: &Prompt) -> bool {
        let mut stderr = io::stderr().lock();
        let asked = writeln!(stderr, "\n{}\n{prompt}", prompt.title())
            .and_then(|_| write!(stderr, "Continue? [y/N] "))
            .and_then(|_| stderr.flush());
        if let Err(err) = asked {
            warn!(error = %err, "failed to write confirmation prompt");
            return false;
        }

        let mut answer = String::new();
        if let Err(err) = io::stdin().lock().read_line(&mut answer) {
            warn!(error = %err, "failed to read confirmation answer");
            return false;
        }
        is_affirmative(&answer)
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
