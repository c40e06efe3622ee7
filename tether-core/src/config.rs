//! Configuration - stored as config.json in TETHER_HOME

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::TransportChoice;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine home directory")]
    NoHome,
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config value: {0}")]
    Invalid(&'static str),
}

/// Tunables for scanning, history and command defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TetherConfig {
    /// Discovery auto-stops after this many seconds
    pub scan_ceiling_secs: u64,
    /// Elapsed-time display refresh
    pub scan_tick_millis: u64,
    pub history_capacity: usize,
    pub wifi_interface: u8,
    pub wifi_scan_secs: u32,
    /// Advertised-name prefix classified as `DeviceKind::KnownTypeA`
    pub known_type_a_prefix: String,
    /// Advertised-name prefix classified as `DeviceKind::KnownTypeB`
    pub known_type_b_prefix: String,
    pub default_transport: TransportChoice,
}

impl Default for TetherConfig {
    fn default() -> Self {
        Self {
            scan_ceiling_secs: 60,
            scan_tick_millis: 100,
            history_capacity: 50,
            wifi_interface: 0,
            wifi_scan_secs: 5,
            known_type_a_prefix: "Tether-A".to_string(),
            known_type_b_prefix: "Tether-B".to_string(),
            default_transport: TransportChoice::Auto,
        }
    }
}

impl TetherConfig {
    /// Load config from file, or defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let data = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid("history_capacity must be at least 1"));
        }
        if self.scan_tick_millis == 0 {
            return Err(ConfigError::Invalid("scan_tick_millis must be at least 1"));
        }
        if self.scan_ceiling_secs == 0 {
            return Err(ConfigError::Invalid("scan_ceiling_secs must be at least 1"));
        }
        Ok(())
    }

    pub fn scan_ceiling(&self) -> Duration {
        Duration::from_secs(self.scan_ceiling_secs)
    }

    pub fn scan_tick(&self) -> Duration {
        Duration::from_millis(self.scan_tick_millis)
    }
}

/// Get TETHER_HOME directory, creating it if needed
pub fn tether_home() -> Result<PathBuf, ConfigError> {
    let home = match std::env::var("TETHER_HOME") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => dirs::home_dir().ok_or(ConfigError::NoHome)?.join(".tether"),
    };

    if !home.exists() {
        fs::create_dir_all(&home)?;
    }

    Ok(home)
}

/// Path of config.json inside `home`
pub fn config_path(home: &Path) -> PathBuf {
    home.join("config.json")
}
