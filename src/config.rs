use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_swap_file")]
    pub swap_file: PathBuf,
    #[serde(default = "default_headroom_gb")]
    pub headroom_gb: u64,
    #[serde(default = "default_fallback_ram_gb")]
    pub fallback_ram_gb: u64,
    #[serde(
        default = "default_swap_file_timeout",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub swap_file_timeout: Duration,
    #[serde(default = "default_root_mount")]
    pub root_mount: PathBuf,
    #[serde(default = "default_fstab")]
    pub fstab: PathBuf,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    #[serde(default = "default_meminfo")]
    pub meminfo: PathBuf,
    #[serde(default = "default_cmdline")]
    pub cmdline: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandsConfig {
    #[serde(default = "default_elevate")]
    pub elevate: String,
    #[serde(default = "default_swapon")]
    pub swapon: String,
    #[serde(default = "default_blkid")]
    pub blkid: String,
    #[serde(default = "default_bootloader")]
    pub bootloader: String,
    #[serde(default = "default_hibernate")]
    pub hibernate: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            swap_file: default_swap_file(),
            headroom_gb: default_headroom_gb(),
            fallback_ram_gb: default_fallback_ram_gb(),
            swap_file_timeout: default_swap_file_timeout(),
            root_mount: default_root_mount(),
            fstab: default_fstab(),
            paths: PathsConfig::default(),
            commands: CommandsConfig::default(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            meminfo: default_meminfo(),
            cmdline: default_cmdline(),
        }
    }
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            elevate: default_elevate(),
            swapon: default_swapon(),
            blkid: default_blkid(),
            bootloader: default_bootloader(),
            hibernate: default_hibernate(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse YAML in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        let cfg: Config = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.swap_file.is_absolute() {
            return Err(ConfigError::Validation(
                "swap_file must be an absolute path".to_string(),
            ));
        }
        if !self.root_mount.is_absolute() {
            return Err(ConfigError::Validation(
                "root_mount must be an absolute path".to_string(),
            ));
        }
        if self.fstab.as_os_str().is_empty() {
            return Err(ConfigError::Validation("fstab must not be empty".to_string()));
        }
        if self.fallback_ram_gb < 1 {
            return Err(ConfigError::Validation(
                "fallback_ram_gb must be >= 1".to_string(),
            ));
        }
        if self.swap_file_timeout < Duration::from_secs(1) {
            return Err(ConfigError::Validation(
                "swap_file_timeout must be at least 1s".to_string(),
            ));
        }

        validate_paths(&self.paths)?;
        validate_commands(&self.commands)?;

        Ok(())
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

fn validate_paths(paths: &PathsConfig) -> Result<(), ConfigError> {
    for (key, path) in [("paths.meminfo", &paths.meminfo), ("paths.cmdline", &paths.cmdline)] {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(format!("{key} must not be empty")));
        }
    }
    Ok(())
}

fn validate_commands(commands: &CommandsConfig) -> Result<(), ConfigError> {
    let named = [
        ("commands.elevate", &commands.elevate),
        ("commands.swapon", &commands.swapon),
        ("commands.blkid", &commands.blkid),
        ("commands.bootloader", &commands.bootloader),
    ];
    for (key, value) in named {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{key} must not be empty")));
        }
    }
    if commands.hibernate.is_empty() || commands.hibernate[0].trim().is_empty() {
        return Err(ConfigError::Validation(
            "commands.hibernate must name a program".to_string(),
        ));
    }
    Ok(())
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
}

fn serialize_duration<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

fn default_swap_file() -> PathBuf {
    PathBuf::from("/swapfile")
}

const fn default_headroom_gb() -> u64 {
    2
}

const fn default_fallback_ram_gb() -> u64 {
    8
}

const fn default_swap_file_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_root_mount() -> PathBuf {
    PathBuf::from("/")
}

fn default_fstab() -> PathBuf {
    PathBuf::from("/etc/fstab")
}

fn default_meminfo() -> PathBuf {
    PathBuf::from("/proc/meminfo")
}

fn default_cmdline() -> PathBuf {
    PathBuf::from("/proc/cmdline")
}

fn default_elevate() -> String {
    "pkexec".to_string()
}

fn default_swapon() -> String {
    "swapon".to_string()
}

fn default_blkid() -> String {
    "blkid".to_string()
}

fn default_bootloader() -> String {
    "grubby".to_string()
}

fn default_hibernate() -> Vec<String> {
    vec!["systemctl".to_string(), "hibernate".to_string()]
}
