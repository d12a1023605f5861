use crate::state::ResumeConfig;
use std::fs;
use std::path::Path;
use tracing::warn;

pub fn collect_resume_config(cmdline: &Path) -> ResumeConfig {
    match fs::read_to_string(cmdline) {
        Ok(text) => parse_cmdline(&text),
        Err(err) => {
            warn!(path = %cmdline.display(), error = %err, "failed to read kernel cmdline");
            ResumeConfig::default()
        }
    }
}

/// Picks `resume=` and `resume_offset=` out of the boot parameters. A
/// repeated key keeps the last value, as the kernel does.
pub fn parse_cmdline(text: &str) -> ResumeConfig {
    let mut cfg = ResumeConfig::default();
    for token in text.split_whitespace() {
        if let Some(value) = token.strip_prefix("resume=") {
            cfg.device = Some(value.to_string());
        } else if let Some(value) = token.strip_prefix("resume_offset=") {
            cfg.offset = Some(value.to_string());
        }
    }
    cfg
}
