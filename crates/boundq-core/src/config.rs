//! Configuration system for boundq.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $BOUNDQ_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/boundq/config.toml
//!   3. ~/.config/boundq/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundqConfig {
    pub namespace: NamespaceConfig,
    pub queue: QueueConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceConfig {
    /// Directory holding one backing file per queue.
    pub root: PathBuf,
    /// Permission bits for newly created queues.
    pub file_mode: u32,
}

/// Defaults used by the command-line tools when a flag is omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub name: String,
    pub capacity: usize,
    pub max_message_size: usize,
    pub priority: u32,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for BoundqConfig {
    fn default() -> Self {
        Self {
            namespace: NamespaceConfig::default(),
            queue: QueueConfig::default(),
        }
    }
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            file_mode: 0o644,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: "/jobs".to_string(),
            capacity: 10,
            max_message_size: 8192,
            priority: 1,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

/// Where queues live when nothing else is configured.
///
/// Prefers tmpfs so queues behave like kernel-resident objects: they survive
/// every process but not a reboot.
pub fn default_root() -> PathBuf {
    let shm = Path::new("/dev/shm");
    if shm.is_dir() {
        return shm.join("boundq");
    }
    std::env::var("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir())
        .join("boundq")
}

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("boundq")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl BoundqConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::file_path())
    }

    /// Load from an explicit file, falling back to defaults if it is absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))?
        } else {
            BoundqConfig::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("BOUNDQ_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        Self::write_default_to(&path)?;
        Ok(path)
    }

    fn write_default_to(path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))?;
        }
        let text = toml::to_string_pretty(&BoundqConfig::default())
            .map_err(ConfigError::SerializeFailed)?;
        std::fs::write(path, text).map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))
    }

    /// Apply BOUNDQ_* overrides. `lookup` is `std::env::var` outside tests.
    /// Unparseable numbers are ignored and the previous value kept.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("BOUNDQ_ROOT") {
            self.namespace.root = PathBuf::from(v);
        }
        if let Some(v) = lookup("BOUNDQ_QUEUE__NAME") {
            self.queue.name = v;
        }
        if let Some(n) = lookup("BOUNDQ_QUEUE__CAPACITY").and_then(|v| v.parse().ok()) {
            self.queue.capacity = n;
        }
        if let Some(n) = lookup("BOUNDQ_QUEUE__MAX_MESSAGE_SIZE").and_then(|v| v.parse().ok()) {
            self.queue.max_message_size = n;
        }
        if let Some(n) = lookup("BOUNDQ_QUEUE__PRIORITY").and_then(|v| v.parse().ok()) {
            self.queue.priority = n;
        }
    }
}
