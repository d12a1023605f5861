pub mod cmdline;
pub mod disk;
pub mod memory;
pub mod swap;

use crate::config::Config;
use crate::readiness::evaluate;
use crate::runner::CommandRunner;
use crate::state::{Inspection, ResumeConfig, SwapEntry};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

pub type FreeSpaceProbe = fn(&Path) -> Option<u64>;

/// Read-only view of the host's hibernation setup. Every query fails soft:
/// unreadable sources come back empty or `None`.
pub struct Inspector<'a, R> {
    cfg: &'a Config,
    runner: &'a R,
    free_space: FreeSpaceProbe,
}

impl<'a, R: CommandRunner> Inspector<'a, R> {
    pub fn new(cfg: &'a Config, runner: &'a R) -> Self {
        Self {
            cfg,
            runner,
            free_space: disk::collect_free_space_gb,
        }
    }

    #[cfg(test)]
    pub fn with_free_space_probe(mut self, probe: FreeSpaceProbe) -> Self {
        self.free_space = probe;
        self
    }

    pub fn ram_gb(&self) -> Option<u64> {
        memory::collect_ram_gb(&self.cfg.paths.meminfo)
    }

    pub async fn swap_entries(&self) -> Vec<SwapEntry> {
        swap::collect_swap_entries(self.runner, &self.cfg.commands.swapon).await
    }

    pub fn resume_config(&self) -> ResumeConfig {
        cmdline::collect_resume_config(&self.cfg.paths.cmdline)
    }

    pub async fn partition_uuid(&self, swaps: &[SwapEntry]) -> Option<String> {
        swap::find_partition_uuid(self.runner, &self.cfg.commands.blkid, swaps).await
    }

    pub fn free_space_gb(&self) -> Option<u64> {
        (self.free_space)(&self.cfg.root_mount)
    }

    pub fn swap_file_exists(&self) -> bool {
        self.cfg.swap_file.exists()
    }

    /// Size of the configured swap file in whole gigabytes, rounded down.
    pub fn swap_file_size_gb(&self) -> Option<u64> {
        match fs::metadata(&self.cfg.swap_file) {
            Ok(meta) => Some(meta.len() / BYTES_PER_GB),
            Err(err) => {
                debug!(path = %self.cfg.swap_file.display(), error = %err, "swap file not readable");
                None
            }
        }
    }

    pub async fn inspect(&self) -> Inspection {
        let ram_gb = self.ram_gb();
        let swaps = self.swap_entries().await;
        let resume = self.resume_config();
        let verdict = evaluate(ram_gb, &swaps, &resume);
        info!(
            ram_gb = ?ram_gb,
            swap_devices = swaps.len(),
            resume = ?resume.device,
            ready = verdict.ready,
            "inspection complete"
        );
        Inspection {
            ram_gb,
            swaps,
            resume,
            verdict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Reason;
    use crate::testing::FakeRunner;
    use std::fs;

    #[tokio::test]
    async fn inspect_combines_all_sources() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut cfg = Config::default();
        cfg.paths.meminfo = dir.path().join("meminfo");
        cfg.paths.cmdline = dir.path().join("cmdline");
        fs::write(&cfg.paths.meminfo, "MemTotal:       16777216 kB\n").expect("write meminfo");
        fs::write(&cfg.paths.cmdline, "root=/dev/sda2 ro quiet\n").expect("write cmdline");

        let runner = FakeRunner::new().respond(
            "swapon",
            "NAME SIZE TYPE\n/dev/zram0 16G partition\n/dev/sda3 16G partition\n",
        );
        let inspection = Inspector::new(&cfg, &runner).inspect().await;

        assert_eq!(inspection.ram_gb, Some(16));
        assert_eq!(inspection.total_swap_gb(), 32);
        assert_eq!(inspection.eligible_swap_gb(), 16);
        assert!(!inspection.verdict.ready);
        assert_eq!(inspection.verdict.reason, Reason::ResumeNotConfigured);
    }

    #[tokio::test]
    async fn unreadable_sources_are_reported_as_unknown() {
        let mut cfg = Config::default();
        cfg.paths.meminfo = "/nonexistent/meminfo".into();
        cfg.paths.cmdline = "/nonexistent/cmdline".into();
        let runner = FakeRunner::new().fail("swapon", "not found");

        let inspection = Inspector::new(&cfg, &runner).inspect().await;
        assert_eq!(inspection.ram_gb, None);
        assert!(inspection.swaps.is_empty());
        assert_eq!(inspection.verdict.reason, Reason::RamUnknown);
    }
}
