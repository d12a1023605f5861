use serde::Serialize;
use std::fmt;

const ZRAM_PREFIX: &str = "/dev/zram";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapKind {
    Partition,
    File,
    Zram,
}

impl SwapKind {
    pub fn classify(name: &str, swap_type: &str) -> Self {
        if name.starts_with(ZRAM_PREFIX) {
            SwapKind::Zram
        } else if swap_type == "file" {
            SwapKind::File
        } else {
            SwapKind::Partition
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SwapKind::Partition => "partition",
            SwapKind::File => "file",
            SwapKind::Zram => "zram",
        }
    }
}

impl fmt::Display for SwapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapEntry {
    pub name: String,
    pub size_gb: u64,
    pub kind: SwapKind,
}

impl SwapEntry {
    /// Compressed RAM swap is volatile and can never hold a hibernation image.
    pub fn is_hibernation_eligible(&self) -> bool {
        self.kind != SwapKind::Zram
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResumeConfig {
    pub device: Option<String>,
    pub offset: Option<String>,
}

impl ResumeConfig {
    pub fn is_configured(&self) -> bool {
        self.device.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reason {
    Ready,
    RamUnknown,
    NoSwap,
    InsufficientSwap {
        required_gb: u64,
        available_gb: u64,
        shortfall_gb: u64,
    },
    ResumeNotConfigured,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Ready => f.write_str("Hibernation is fully configured and ready."),
            Reason::RamUnknown => f.write_str("Failed to read total RAM; readiness unknown."),
            Reason::NoSwap => f.write_str("Hibernation not possible: no swap configured."),
            Reason::InsufficientSwap {
                required_gb,
                available_gb,
                shortfall_gb,
            } => write!(
                f,
                "Not enough disk-based swap. Need {required_gb} GB, have {available_gb} GB. Short by {shortfall_gb} GB."
            ),
            Reason::ResumeNotConfigured => f.write_str(
                "Kernel resume is not configured. Run 'enable' to set it up.",
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadinessVerdict {
    pub ready: bool,
    pub reason: Reason,
}

/// One inspection cycle: everything read from the system plus the verdict
/// derived from it. Held by the caller until the next action.
#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    pub ram_gb: Option<u64>,
    pub swaps: Vec<SwapEntry>,
    pub resume: ResumeConfig,
    pub verdict: ReadinessVerdict,
}

impl Inspection {
    pub fn total_swap_gb(&self) -> u64 {
        self.swaps.iter().map(|s| s.size_gb).sum()
    }

    pub fn eligible_swaps(&self) -> impl Iterator<Item = &SwapEntry> {
        self.swaps.iter().filter(|s| s.is_hibernation_eligible())
    }

    pub fn eligible_swap_gb(&self) -> u64 {
        self.eligible_swaps().map(|s| s.size_gb).sum()
    }
}
