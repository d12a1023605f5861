use std::fs;
use std::path::Path;
use tracing::warn;

const KB_PER_GB: u64 = 1024 * 1024;

/// Total RAM in whole gigabytes, rounded up. `None` when the file is
/// missing or has no usable `MemTotal:` line.
pub fn collect_ram_gb(meminfo: &Path) -> Option<u64> {
    match fs::read_to_string(meminfo) {
        Ok(text) => {
            let ram = parse_meminfo(&text);
            if ram.is_none() {
                warn!(path = %meminfo.display(), "MemTotal not found in meminfo");
            }
            ram
        }
        Err(err) => {
            warn!(path = %meminfo.display(), error = %err, "failed to read meminfo");
            None
        }
    }
}

pub fn parse_meminfo(text: &str) -> Option<u64> {
    let line = text.lines().find(|l| l.starts_with("MemTotal:"))?;
    let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb_to_gb_ceil(kb))
}

pub fn kb_to_gb_ceil(kb: u64) -> u64 {
    kb.div_ceil(KB_PER_GB)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_up_to_whole_gigabytes() {
        assert_eq!(kb_to_gb_ceil(8_388_608), 8);
        assert_eq!(kb_to_gb_ceil(8_388_609), 9);
        assert_eq!(kb_to_gb_ceil(0), 0);
        assert_eq!(kb_to_gb_ceil(1), 1);
    }

    #[test]
    fn parses_memtotal_line() {
        let text = "MemTotal:       16303412 kB\nMemFree:         1234567 kB\n";
        assert_eq!(parse_meminfo(text), Some(16));
    }

    #[test]
    fn malformed_meminfo_is_absent() {
        assert_eq!(parse_meminfo("MemFree: 100 kB\n"), None);
        assert_eq!(parse_meminfo("MemTotal: lots kB\n"), None);
        assert_eq!(parse_meminfo("MemTotal:\n"), None);
    }

    #[test]
    fn missing_file_is_absent() {
        assert_eq!(collect_ram_gb(Path::new("/nonexistent/meminfo")), None);
    }

    #[test]
    fn reads_file_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("meminfo");
        fs::write(&path, "MemTotal:        8388609 kB\n").expect("write meminfo");
        assert_eq!(collect_ram_gb(&path), Some(9));
    }
}
