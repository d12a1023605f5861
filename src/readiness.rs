use crate::state::{ReadinessVerdict, Reason, ResumeConfig, SwapEntry};

/// Ready means the disk-backed swap can hold all of RAM and the kernel knows
/// where to resume from. A swap shortfall is reported ahead of a missing
/// resume parameter: setting the parameter alone cannot fix it.
pub fn evaluate(ram_gb: Option<u64>, swaps: &[SwapEntry], resume: &ResumeConfig) -> ReadinessVerdict {
    let Some(ram_gb) = ram_gb else {
        return ReadinessVerdict {
            ready: false,
            reason: Reason::RamUnknown,
        };
    };

    let eligible_gb: u64 = swaps
        .iter()
        .filter(|s| s.is_hibernation_eligible())
        .map(|s| s.size_gb)
        .sum();
    let swap_ok = eligible_gb >= ram_gb;
    let resume_ok = resume.is_configured();

    let reason = if swap_ok && resume_ok {
        Reason::Ready
    } else if !swap_ok && swaps.is_empty() {
        Reason::NoSwap
    } else if !swap_ok {
        Reason::InsufficientSwap {
            required_gb: ram_gb,
            available_gb: eligible_gb,
            shortfall_gb: ram_gb - eligible_gb,
        }
    } else {
        Reason::ResumeNotConfigured
    };

    ReadinessVerdict {
        ready: swap_ok && resume_ok,
        reason,
    }
}
