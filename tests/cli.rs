use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

struct TestEnv {
    _tmp: TempDir,
    config: String,
}

impl TestEnv {
    fn new(meminfo: &str, cmdline: &str) -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let dir = tmp.path();
        fs::write(dir.join("meminfo"), meminfo).expect("write meminfo");
        fs::write(dir.join("cmdline"), cmdline).expect("write cmdline");
        let config = dir.join("config.yaml");
        fs::write(&config, config_yaml(dir)).expect("write config");
        Self {
            config: config.to_string_lossy().into_owned(),
            _tmp: tmp,
        }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("hibernation-helper").expect("binary built");
        cmd.env("RUST_LOG", "off").arg("--config").arg(&self.config);
        cmd
    }
}

fn config_yaml(dir: &Path) -> String {
    format!(
        "swap_file: {swap}\npaths:\n  meminfo: {meminfo}\n  cmdline: {cmdline}\ncommands:\n  swapon: /nonexistent/swapon\n  blkid: /nonexistent/blkid\n  elevate: /nonexistent/pkexec\n",
        swap = dir.join("swapfile").display(),
        meminfo = dir.join("meminfo").display(),
        cmdline = dir.join("cmdline").display(),
    )
}

#[test]
fn prints_default_config() {
    let out = Command::cargo_bin("hibernation-helper")
        .expect("binary built")
        .arg("--print-default-config")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(out).expect("utf8");
    assert!(text.contains("swap_file: /swapfile"));
    assert!(text.contains("swap_file_timeout: 5m"));
}

#[test]
fn status_json_reports_missing_swap() {
    let env = TestEnv::new("MemTotal:        8388608 kB\n", "root=/dev/sda2 resume=UUID=abcd\n");
    let out = env
        .cmd()
        .args(["status", "--json"])
        .assert()
        .code(2)
        .get_output()
        .stdout
        .clone();
    let status: Value = serde_json::from_slice(&out).expect("valid json output");
    assert_eq!(status["ram_gb"], 8);
    assert_eq!(status["resume"]["device"], "UUID=abcd");
    assert_eq!(status["verdict"]["ready"], false);
    assert_eq!(status["verdict"]["reason"]["kind"], "no_swap");
    assert_eq!(status["swaps"].as_array().map(Vec::len), Some(0));
}

#[test]
fn status_text_is_default_command() {
    let env = TestEnv::new("MemTotal:        8388609 kB\n", "root=/dev/sda2\n");
    let out = env.cmd().assert().code(2).get_output().stdout.clone();
    let text = String::from_utf8(out).expect("utf8");
    assert!(text.contains("Total RAM: 9 GB"));
    assert!(text.contains("Swap: no swap active"));
    assert!(text.contains("Kernel resume: not set"));
}

#[test]
fn test_refuses_when_not_ready() {
    let env = TestEnv::new("MemTotal:        8388608 kB\n", "root=/dev/sda2\n");
    let out = env
        .cmd()
        .args(["test", "--yes"])
        .assert()
        .code(2)
        .get_output()
        .stderr
        .clone();
    let text = String::from_utf8(out).expect("utf8");
    assert!(text.contains("--force"));
}

#[test]
fn enable_is_noop_when_resume_configured() {
    let env = TestEnv::new("MemTotal:        8388608 kB\n", "resume=UUID=abcd\n");
    let out = env
        .cmd()
        .args(["enable", "--yes"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(out).expect("utf8");
    assert!(text.contains("already configured"));
}

#[test]
fn missing_config_file_fails() {
    Command::cargo_bin("hibernation-helper")
        .expect("binary built")
        .env("RUST_LOG", "off")
        .args(["--config", "/nonexistent/hibernation-helper.yaml", "status"])
        .assert()
        .code(1);
}
