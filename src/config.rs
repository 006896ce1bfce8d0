//! TOML configuration file support.
//!
//! Loads from (in order):
//! 1. Explicit path (if given)
//! 2. `provchain.toml` next to the executable
//! 3. Platform config directory (`~/.config/provchain/config.toml`)
//! 4. Built-in defaults
//!
//! CLI arguments always take precedence over config file values.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, ResultExt as _};
use crate::miner;

// ---------------------------------------------------------------------------
// Config structs (map 1-to-1 with the TOML sections)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProvConfig {
    pub paths: PathsConfig,
    pub mining: MiningConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Ledger snapshot the CLI loads at startup and writes after mutation.
    pub snapshot: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Leading zero-hex-character proof-of-work target.
    pub difficulty: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Path to a JSON-lines structured log file for SIEM integration.
    /// Empty string means no file logging.
    pub json_log_file: String,
    /// Whether to also output JSON to stdout (for container/SIEM pipelines).
    pub json_stdout: bool,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for ProvConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            mining: MiningConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            snapshot: PathBuf::from("provchain-ledger.json"),
        }
    }
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            difficulty: miner::DEFAULT_DIFFICULTY,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_log_file: String::new(),
            json_stdout: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl ProvConfig {
    /// Try to load from a specific path.  Returns `Ok(default)` if the file
    /// does not exist; returns `Err` if the file exists but is malformed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .ctx_config(&format!("read config file {}", path.display()))?;
        let cfg: ProvConfig = toml::from_str(&text).ctx_config("parse config TOML")?;
        Ok(cfg)
    }

    /// Load config using the standard search order.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(p) = explicit {
            return Self::load_from(p);
        }

        // Next to executable.
        if let Ok(exe) = std::env::current_exe() {
            let candidate = exe.with_file_name("provchain.toml");
            if candidate.exists() {
                return Self::load_from(&candidate);
            }
        }

        // Platform-standard config directory.
        #[cfg(windows)]
        {
            if let Ok(local) = std::env::var("LOCALAPPDATA") {
                let candidate = PathBuf::from(local).join("provchain").join("config.toml");
                if candidate.exists() {
                    return Self::load_from(&candidate);
                }
            }
        }

        #[cfg(not(windows))]
        {
            if let Some(home) = std::env::var_os("HOME") {
                let candidate = PathBuf::from(home)
                    .join(".config")
                    .join("provchain")
                    .join("config.toml");
                if candidate.exists() {
                    return Self::load_from(&candidate);
                }
            }
        }

        Ok(Self::default())
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(snapshot) = std::env::var("PROVCHAIN_SNAPSHOT") {
            self.paths.snapshot = PathBuf::from(snapshot);
        }
        if let Some(difficulty) = std::env::var("PROVCHAIN_DIFFICULTY")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.mining.difficulty = difficulty;
        }
        if let Ok(level) = std::env::var("PROVCHAIN_LOG_LEVEL") {
            self.logging.level = level;
        }
    }
}
