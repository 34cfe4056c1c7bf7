//! Receiver configuration.
//!
//! Stored as TOML, by default at `~/.config/loranode/receiver.toml`. A path
//! given as the first command-line argument takes precedence.

use std::path::{Path, PathBuf};

use loranode_transfer::ReceiverConfig;
use serde::{Deserialize, Serialize};

/// Which object kind the paired host sends in this deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// JSON configuration files until `Finished`.
    Config,
    /// Labeled images, indefinitely.
    Images,
    /// Archive entries with per-fragment ACK/NACK until `Finished`.
    #[default]
    Archive,
}

/// Serial link settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Serial device (already configured for baud rate and framing), or
    /// `-` for stdin/stdout.
    #[serde(default = "default_device")]
    pub device: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
        }
    }
}

/// Where received objects are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_root")]
    pub root: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub mode: Mode,

    /// Base name of stored images (`<base>-<label>.<ext>`).
    #[serde(default = "default_image_base")]
    pub image_base: String,

    /// Heartbeat period in seconds.
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,

    #[serde(default)]
    pub link: LinkConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub receiver: ReceiverConfig,
}

fn default_device() -> String {
    "/dev/ttyUSB0".into()
}

fn default_root() -> String {
    "/sd".into()
}

fn default_image_base() -> String {
    "capture".into()
}

fn default_heartbeat_secs() -> u64 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            image_base: default_image_base(),
            heartbeat_secs: default_heartbeat_secs(),
            link: LinkConfig::default(),
            storage: StorageConfig::default(),
            receiver: ReceiverConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from `path` (or the default location), writing
    /// the defaults there first if the file does not exist.
    pub fn load(path: Option<PathBuf>) -> anyhow::Result<Self> {
        let path = match path {
            Some(path) => path,
            None => config_path(),
        };

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save(&path)?;
            Ok(config)
        }
    }

    /// Writes the configuration to `path` as TOML.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }
}

fn config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home)
        .join(".config")
        .join("loranode")
        .join("receiver.toml")
}
