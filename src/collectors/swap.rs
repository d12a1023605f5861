use crate::runner::{CommandRunner, Invocation};
use crate::state::{SwapEntry, SwapKind};
use tracing::{debug, warn};

pub async fn collect_swap_entries<R: CommandRunner>(runner: &R, swapon: &str) -> Vec<SwapEntry> {
    let inv = Invocation::new(swapon, ["--show=NAME,SIZE,TYPE"]);
    match runner.run(&inv).await {
        Ok(out) if out.success => parse_swapon(&out.stdout),
        Ok(out) => {
            warn!(command = %inv, stderr = %out.stderr.trim(), "swap listing failed");
            Vec::new()
        }
        Err(err) => {
            warn!(command = %inv, error = %err, "swap listing failed");
            Vec::new()
        }
    }
}

/// Parses `swapon --show=NAME,SIZE,TYPE`: a header line, then one row per
/// active device. Rows with fewer than three columns are skipped.
pub fn parse_swapon(text: &str) -> Vec<SwapEntry> {
    text.trim()
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let name = cols.next()?;
            let size = cols.next()?;
            let swap_type = cols.next()?;
            Some(SwapEntry {
                name: name.to_string(),
                size_gb: parse_size_gb(size),
                kind: SwapKind::classify(name, swap_type),
            })
        })
        .collect()
}

/// Converts a human-readable size to whole gigabytes. Gigabyte values are
/// truncated; megabyte and kilobyte values round half up. Anything
/// unparsable counts as zero.
pub fn parse_size_gb(raw: &str) -> u64 {
    let (number, divisor) = if let Some(n) = raw.strip_suffix('G') {
        (n, None)
    } else if let Some(n) = raw.strip_suffix('M') {
        (n, Some(1024.0))
    } else if let Some(n) = raw.strip_suffix('K') {
        (n, Some(1024.0 * 1024.0))
    } else {
        debug!(size = raw, "unrecognized swap size suffix");
        return 0;
    };

    let value = match number.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => v,
        _ => {
            debug!(size = raw, "unparsable swap size");
            return 0;
        }
    };

    match divisor {
        None => value.trunc() as u64,
        Some(d) => (value / d + 0.5).trunc() as u64,
    }
}

/// UUID of the first non-compressed swap partition that `blkid` can
/// identify.
pub async fn find_partition_uuid<R: CommandRunner>(
    runner: &R,
    blkid: &str,
    swaps: &[SwapEntry],
) -> Option<String> {
    for swap in swaps.iter().filter(|s| s.kind == SwapKind::Partition) {
        if let Some(uuid) = resolve_uuid(runner, blkid, &swap.name).await {
            return Some(uuid);
        }
    }
    None
}

pub async fn resolve_uuid<R: CommandRunner>(runner: &R, blkid: &str, device: &str) -> Option<String> {
    let inv = Invocation::new(blkid, ["-s", "UUID", "-o", "value", device]);
    match runner.run(&inv).await {
        Ok(out) if out.success => {
            let uuid = out.stdout.trim();
            if uuid.is_empty() {
                debug!(device, "blkid returned no UUID");
                None
            } else {
                Some(uuid.to_string())
            }
        }
        Ok(out) => {
            warn!(device, stderr = %out.stderr.trim(), "blkid failed");
            None
        }
        Err(err) => {
            warn!(device, error = %err, "blkid failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRunner;

    #[test]
    fn size_suffixes() {
        assert_eq!(parse_size_gb("8G"), 8);
        assert_eq!(parse_size_gb("16.0G"), 16);
        assert_eq!(parse_size_gb("7.8G"), 7);
        assert_eq!(parse_size_gb("512M"), 1);
        assert_eq!(parse_size_gb("511M"), 0);
        assert_eq!(parse_size_gb("1536M"), 2);
        assert_eq!(parse_size_gb("100K"), 0);
        assert_eq!(parse_size_gb("4T"), 0);
        assert_eq!(parse_size_gb("abcG"), 0);
    }

    #[test]
    fn parses_swapon_table() {
        let text = "NAME       SIZE TYPE\n/dev/zram0   8G partition\n/dev/sda3  16G partition\n/swapfile  512M file\n";
        let swaps = parse_swapon(text);
        assert_eq!(
            swaps,
            vec![
                SwapEntry {
                    name: "/dev/zram0".to_string(),
                    size_gb: 8,
                    kind: SwapKind::Zram,
                },
                SwapEntry {
                    name: "/dev/sda3".to_string(),
                    size_gb: 16,
                    kind: SwapKind::Partition,
                },
                SwapEntry {
                    name: "/swapfile".to_string(),
                    size_gb: 1,
                    kind: SwapKind::File,
                },
            ]
        );
    }

    #[test]
    fn header_only_and_short_rows_yield_nothing() {
        assert!(parse_swapon("NAME SIZE TYPE\n").is_empty());
        assert!(parse_swapon("").is_empty());
        assert!(parse_swapon("NAME SIZE TYPE\n/dev/sda3 16G\n").is_empty());
    }

    #[tokio::test]
    async fn failed_listing_is_empty() {
        let runner = FakeRunner::new().fail("swapon", "swapon: permission denied");
        assert!(collect_swap_entries(&runner, "swapon").await.is_empty());
    }

    #[tokio::test]
    async fn partition_uuid_skips_zram_and_files() {
        let runner = FakeRunner::new()
            .respond("blkid -s UUID -o value /dev/zram0", "zram-uuid\n")
            .respond("blkid -s UUID -o value /dev/sda3", "1234-abcd\n");
        let swaps = parse_swapon(
            "NAME SIZE TYPE\n/dev/zram0 8G partition\n/swapfile 4G file\n/dev/sda3 16G partition\n",
        );
        let uuid = find_partition_uuid(&runner, "blkid", &swaps).await;
        assert_eq!(uuid.as_deref(), Some("1234-abcd"));
        assert_eq!(runner.calls(), vec!["blkid -s UUID -o value /dev/sda3".to_string()]);
    }

    #[tokio::test]
    async fn empty_blkid_output_falls_through() {
        let runner = FakeRunner::new()
            .respond("blkid -s UUID -o value /dev/sda2", "\n")
            .respond("blkid -s UUID -o value /dev/sdb1", "beef\n");
        let swaps = parse_swapon("NAME SIZE TYPE\n/dev/sda2 8G partition\n/dev/sdb1 8G partition\n");
        let uuid = find_partition_uuid(&runner, "blkid", &swaps).await;
        assert_eq!(uuid.as_deref(), Some("beef"));
    }
}
