use crate::runner::{CommandOutput, CommandRunner, Invocation, RunError, Spawned};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone)]
enum Scripted {
    Output(CommandOutput),
    Timeout,
}

/// Records every invocation and answers from a script keyed by the full
/// command line, falling back to the program name. Unscripted commands
/// succeed with empty output.
#[derive(Debug, Default)]
pub struct FakeRunner {
    script: HashMap<String, Scripted>,
    calls: RefCell<Vec<Invocation>>,
    spawned: RefCell<Vec<Invocation>>,
    awaited: Rc<Cell<bool>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, key: &str, stdout: &str) -> Self {
        self.script.insert(
            key.to_string(),
            Scripted::Output(CommandOutput {
                success: true,
                stdout: stdout.to_string(),
                stderr: String::new(),
            }),
        );
        self
    }

    pub fn fail(self, key: &str, stderr: &str) -> Self {
        self.fail_with_stdout(key, "", stderr)
    }

    pub fn fail_with_stdout(mut self, key: &str, stdout: &str, stderr: &str) -> Self {
        self.script.insert(
            key.to_string(),
            Scripted::Output(CommandOutput {
                success: false,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            }),
        );
        self
    }

    pub fn time_out(mut self, key: &str) -> Self {
        self.script.insert(key.to_string(), Scripted::Timeout);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().iter().map(ToString::to_string).collect()
    }

    pub fn privileged_calls(&self) -> Vec<Invocation> {
        self.calls
            .borrow()
            .iter()
            .filter(|inv| inv.privileged)
            .cloned()
            .collect()
    }

    pub fn spawned(&self) -> Vec<Invocation> {
        self.spawned.borrow().clone()
    }

    /// Whether a handle returned by `spawn` has been waited on.
    pub fn spawn_awaited(&self) -> bool {
        self.awaited.get()
    }

    fn answer(&self, invocation: &Invocation) -> Result<CommandOutput, RunError> {
        let scripted = self
            .script
            .get(&invocation.to_string())
            .or_else(|| self.script.get(&invocation.program));
        match scripted {
            Some(Scripted::Output(out)) => Ok(out.clone()),
            Some(Scripted::Timeout) => Err(RunError::Timeout {
                command: invocation.to_string(),
                after: invocation.timeout.unwrap_or_default(),
            }),
            None => Ok(CommandOutput {
                success: true,
                ..CommandOutput::default()
            }),
        }
    }
}

/// Handle for a fake spawned command; flags the runner once waited on.
#[derive(Debug)]
pub struct FakeChild {
    result: Result<CommandOutput, RunError>,
    awaited: Rc<Cell<bool>>,
}

impl Spawned for FakeChild {
    async fn wait(self) -> Result<CommandOutput, RunError> {
        self.awaited.set(true);
        self.result
    }
}

impl CommandRunner for FakeRunner {
    type Handle = FakeChild;

    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, RunError> {
        self.calls.borrow_mut().push(invocation.clone());
        self.answer(invocation)
    }

    fn spawn(&self, invocation: &Invocation) -> Result<FakeChild, RunError> {
        self.spawned.borrow_mut().push(invocation.clone());
        Ok(FakeChild {
            result: self.answer(invocation),
            awaited: Rc::clone(&self.awaited),
        })
    }
}
