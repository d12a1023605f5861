use crate::state::Inspection;

pub fn format_status(inspection: &Inspection) -> String {
    let mut lines = Vec::new();

    lines.push(match inspection.ram_gb {
        Some(gb) => format!("Total RAM: {gb} GB"),
        None => "Total RAM: failed to read".to_string(),
    });

    if inspection.swaps.is_empty() {
        lines.push("Swap: no swap active".to_string());
    } else {
        let details = inspection
            .swaps
            .iter()
            .map(|s| format!("{} ({} GB, {})", s.name, s.size_gb, s.kind))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!(
            "Swap (total): {} GB ({details})",
            inspection.total_swap_gb()
        ));

        let eligible = inspection
            .eligible_swaps()
            .map(|s| format!("{} ({} GB)", s.name, s.size_gb))
            .collect::<Vec<_>>();
        if eligible.is_empty() {
            lines.push("Swap (hibernation): none (zram does not support hibernation)".to_string());
        } else {
            lines.push(format!(
                "Swap (hibernation): {} GB ({})",
                inspection.eligible_swap_gb(),
                eligible.join(", ")
            ));
        }
    }

    lines.push(match (&inspection.resume.device, &inspection.resume.offset) {
        (Some(device), Some(offset)) => format!("Kernel resume: {device} (offset: {offset})"),
        (Some(device), None) => format!("Kernel resume: {device}"),
        (None, _) => "Kernel resume: not set, hibernation may fail".to_string(),
    });

    let mark = if inspection.verdict.ready { "OK" } else { "!!" };
    lines.push(String::new());
    lines.push(format!("[{mark}] {}", inspection.verdict.reason));

    lines.join("\n")
}
