use std::path::Path;
use sysinfo::{DiskExt, System, SystemExt};
use tracing::{debug, warn};

const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

/// Free space available to unprivileged writers on the filesystem that
/// holds `path`, in whole gigabytes rounded down.
pub fn collect_free_space_gb(path: &Path) -> Option<u64> {
    let mut system = System::new();
    system.refresh_disks_list();
    system.refresh_disks();

    let mounts: Vec<(&Path, u64)> = system
        .disks()
        .iter()
        .map(|d| (d.mount_point(), d.available_space()))
        .collect();
    let free = free_space_for(path, &mounts);
    match free {
        Some(gb) => debug!(path = %path.display(), free_gb = gb, "free space"),
        None => warn!(path = %path.display(), disks = mounts.len(), "no mounted filesystem covers path"),
    }
    free
}

/// Picks the deepest mount point containing `path`.
pub fn free_space_for(path: &Path, mounts: &[(&Path, u64)]) -> Option<u64> {
    mounts
        .iter()
        .filter(|(mount, _)| path.starts_with(mount))
        .max_by_key(|(mount, _)| mount.components().count())
        .map(|(_, available)| available / BYTES_PER_GB)
}
