//! Configuration module for SA-Analyzer
//!
//! Settings are stored as TOML. Every section has defaults, so a partial file
//! (or none at all) is valid.
//!
//! # App Data Location
//!
//! - **Linux**: `~/.local/share/sa-analyzer/`
//! - **macOS**: `~/Library/Application Support/sa-analyzer/`
//! - **Windows**: `%APPDATA%\sa-analyzer\`
//!
//! # Example
//!
//! ```toml
//! [player]
//! name = "Marvin"
//! model = "standard"
//! height = 1.6
//!
//! [[sensors]]
//! sensor = 5
//! segment = "Spine"
//!
//! [playback]
//! tick_ms = 20
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SaError};
use crate::skeleton::{Player, SensorMap};

/// Application identifier for data directories
pub const APP_ID: &str = "sa-analyzer";

/// Config filename inside the app data directory
pub const CONFIG_FILE: &str = "config.toml";

/// Garment sensor assignment shipped with the jacket and leggings
pub const DEFAULT_SENSORS: &[(i64, &str)] = &[
    (3, "RightLowerarm"),
    (2, "RightUpperarm"),
    (4, "LeftLowerarm"),
    (5, "Spine"),
    (6, "LeftUpperarm"),
    (7, "RightHip"),
    (8, "RightKnee"),
    (9, "RightAnkle"),
    (10, "RightFoot"),
    (11, "LeftHip"),
    (12, "LeftKnee"),
    (13, "LeftAnkle"),
    (14, "LeftFoot"),
    (15, "RightHand"),
    (16, "LeftHand"),
];

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir()
        .ok_or_else(|| SaError::Config("Could not determine app data directory".to_string()))?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            SaError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the default config file
pub fn config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CONFIG_FILE))
}

// ==================== Sections ====================

/// Player wearing the garment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub name: String,
    /// `standard` or `extended`
    pub model: String,
    /// Height in metres
    pub height: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            name: "Marvin".to_string(),
            model: "standard".to_string(),
            height: 1.6,
        }
    }
}

impl PlayerConfig {
    pub fn build(&self) -> Player {
        Player::new(self.name.clone(), &self.model, self.height)
    }
}

/// One sensor-to-segment assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorAssignment {
    pub sensor: i64,
    pub segment: String,
}

fn default_sensors() -> Vec<SensorAssignment> {
    DEFAULT_SENSORS
        .iter()
        .map(|(sensor, segment)| SensorAssignment {
            sensor: *sensor,
            segment: segment.to_string(),
        })
        .collect()
}

/// Garment connection; used by the transport, not the core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub address: String,
    pub port: u16,
    pub buffer_size: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            address: "192.168.1.1".to_string(),
            port: 8080,
            buffer_size: 1024,
        }
    }
}

/// Playback pacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Tick period in milliseconds
    pub tick_ms: u64,
    /// Records returned per tick while paused
    pub window_depth: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_ms: 20,
            window_depth: 10,
        }
    }
}

/// Live view limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewsConfig {
    /// Seconds of history kept per plotted series
    pub plot_buffer_secs: f64,
    /// Maximum rows in the data table
    pub max_rows: usize,
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            plot_buffer_secs: 5.0,
            max_rows: 400,
        }
    }
}

/// Calibration timing, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub wait_secs: f64,
    pub capture_secs: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            wait_secs: 5.0,
            capture_secs: 5.0,
        }
    }
}

// ==================== App Config ====================

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub player: PlayerConfig,

    #[serde(default = "default_sensors")]
    pub sensors: Vec<SensorAssignment>,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub views: ViewsConfig,

    #[serde(default)]
    pub calibration: CalibrationConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            player: PlayerConfig::default(),
            sensors: default_sensors(),
            network: NetworkConfig::default(),
            playback: PlaybackConfig::default(),
            views: ViewsConfig::default(),
            calibration: CalibrationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load config from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SaError::Config(format!("Failed to read config {:?}: {}", path, e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse config from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| SaError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load config from the app data directory
    pub fn load_default_location() -> Result<Self> {
        let path = config_path()
            .ok_or_else(|| SaError::Config("Could not determine config path".to_string()))?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Load config, returning defaults on any error
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let loaded = match path {
            Some(path) => Self::load(path),
            None => Self::load_default_location(),
        };
        loaded.unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save config as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SaError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| SaError::Serialization(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SaError::Config(format!("Failed to write config {:?}: {}", path, e)))
    }

    /// Sensor assignments as a lookup map; later entries win
    pub fn sensor_map(&self) -> SensorMap {
        self.sensors
            .iter()
            .map(|a| (a.sensor, a.segment.clone()))
            .collect()
    }
}
