use crate::config::Config;
use crate::runner::Invocation;
use std::collections::HashMap;
use std::fmt;

const STEP_MARKER: &str = "::step::";
const VALUE_MARKER: &str = "::value::";

/// Named stages of the privileged swap-file sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Allocate,
    Restrict,
    Format,
    Activate,
    Persist,
    ResolveUuid,
    ResolveOffset,
    SetResume,
    Deactivate,
    Delete,
    Unpersist,
}

impl Step {
    const ALL: [Step; 11] = [
        Step::Allocate,
        Step::Restrict,
        Step::Format,
        Step::Activate,
        Step::Persist,
        Step::ResolveUuid,
        Step::ResolveOffset,
        Step::SetResume,
        Step::Deactivate,
        Step::Delete,
        Step::Unpersist,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Step::Allocate => "allocate",
            Step::Restrict => "restrict",
            Step::Format => "format",
            Step::Activate => "activate",
            Step::Persist => "persist",
            Step::ResolveUuid => "resolve-uuid",
            Step::ResolveOffset => "resolve-offset",
            Step::SetResume => "set-resume",
            Step::Deactivate => "deactivate",
            Step::Delete => "delete",
            Step::Unpersist => "unpersist",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fail-fast shell script that announces each step on stdout before
/// running it, so one elevation prompt still yields per-step failures.
#[derive(Debug, Clone, Default)]
pub struct StepScript {
    steps: Vec<(Step, Vec<String>)>,
}

impl StepScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step<I, S>(mut self, step: Step, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps
            .push((step, lines.into_iter().map(Into::into).collect()));
        self
    }

    pub fn then(mut self, next: StepScript) -> Self {
        self.steps.extend(next.steps);
        self
    }

    pub fn steps(&self) -> impl Iterator<Item = Step> + '_ {
        self.steps.iter().map(|(step, _)| *step)
    }

    pub fn render(&self) -> String {
        let mut out = String::from("set -e\n");
        for (step, lines) in &self.steps {
            out.push_str(&format!("echo '{STEP_MARKER}{step}'\n"));
            for line in lines {
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }

    pub fn invocation(&self) -> Invocation {
        Invocation::new("sh", ["-c".to_string(), self.render()]).privileged()
    }
}

/// The step that was running when the script stopped: the last one
/// announced.
pub fn last_step(stdout: &str) -> Option<Step> {
    stdout
        .lines()
        .filter_map(|l| l.trim().strip_prefix(STEP_MARKER))
        .last()
        .and_then(Step::from_name)
}

pub fn reported_values(stdout: &str) -> HashMap<String, String> {
    stdout
        .lines()
        .filter_map(|l| l.trim().strip_prefix(VALUE_MARKER))
        .filter_map(|kv| kv.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn sh_quote(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', r"'\''"))
}

pub fn swap_file_creation(cfg: &Config, size_gb: u64) -> StepScript {
    let path = sh_quote(&cfg.swap_file.to_string_lossy());
    let fstab = sh_quote(&cfg.fstab.to_string_lossy());
    let bootloader = sh_quote(&cfg.commands.bootloader);
    let swapon = sh_quote(&cfg.commands.swapon);
    let count_mb = size_gb * 1024;

    StepScript::new()
        .step(
            Step::Allocate,
            [format!("dd if=/dev/zero of={path} bs=1M count={count_mb} status=none")],
        )
        .step(Step::Restrict, [format!("chmod 600 {path}")])
        .step(Step::Format, [format!("mkswap {path}")])
        .step(Step::Activate, [format!("{swapon} {path}")])
        .step(
            Step::Persist,
            [format!("printf '%s none swap defaults 0 0\\n' {path} >> {fstab}")],
        )
        .step(
            Step::ResolveUuid,
            [
                format!("uuid=$(findmnt -no UUID -T {path})"),
                "[ -n \"$uuid\" ]".to_string(),
                format!("echo \"{VALUE_MARKER}uuid=$uuid\""),
            ],
        )
        .step(
            Step::ResolveOffset,
            [
                format!(
                    "offset=$(filefrag -v {path} | awk '$1==\"0:\" {{print substr($4, 1, length($4)-2)}}')"
                ),
                "[ -n \"$offset\" ]".to_string(),
                format!("echo \"{VALUE_MARKER}offset=$offset\""),
            ],
        )
        .step(
            Step::SetResume,
            [format!(
                "{bootloader} --update-kernel=ALL --args=\"resume=UUID=$uuid resume_offset=$offset\""
            )],
        )
}

pub fn swap_file_removal(cfg: &Config) -> StepScript {
    let path = sh_quote(&cfg.swap_file.to_string_lossy());
    let fstab = sh_quote(&cfg.fstab.to_string_lossy());
    let tmp = sh_quote(&format!("{}.hibernation-helper.tmp", cfg.fstab.to_string_lossy()));
    let swapon = sh_quote(&cfg.commands.swapon);

    StepScript::new()
        .step(
            Step::Deactivate,
            [format!(
                "if {swapon} --show=NAME --noheadings | grep -qxF {path}; then swapoff {path}; fi"
            )],
        )
        .step(Step::Delete, [format!("rm -f {path}")])
        .step(
            Step::Unpersist,
            [
                format!("awk -v p={path} '$1 != p' {fstab} > {tmp}"),
                format!("cat {tmp} > {fstab}"),
                format!("rm -f {tmp}"),
            ],
        )
}
