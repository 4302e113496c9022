//! Configuration and settings management for xyplot
//!
//! Provides configuration file handling and validation. Supports JSON and
//! TOML file formats stored in the platform-specific config directory.
//!
//! Configuration is organized into logical sections:
//! - Machine settings (stepper geometry)
//! - Connection settings (port, line parameters, timeouts)
//! - Session settings (handshake and ellipse pivot behaviour)
//!
//! Every field has a default, so a file only needs the values it changes.

use crate::error::{ConfigError, SettingsError, SettingsResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use xyplot_communication::serial::{DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT_MS};
use xyplot_communication::{ConnectionParams, SerialParity, StreamerConfig};
use xyplot_core::units::{DEFAULT_PULLEY_DIAMETER_MM, DEFAULT_STEP_ANGLE_DEG};
use xyplot_core::{PivotMode, ReadyPolicy, StepConverter};

/// Port value meaning "pick one automatically"
pub const AUTO_PORT: &str = "Auto";

/// Config file name inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Stepper and pulley geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineSettings {
    /// Full-step angle of the stepper motors in degrees
    pub step_angle_deg: f64,
    /// Diameter of the belt pulley in mm
    pub pulley_diameter_mm: f64,
}

impl Default for MachineSettings {
    fn default() -> Self {
        Self {
            step_angle_deg: DEFAULT_STEP_ANGLE_DEG,
            pulley_diameter_mm: DEFAULT_PULLEY_DIAMETER_MM,
        }
    }
}

/// Connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Serial port, or "Auto" to detect one
    pub port: String,
    /// Baud rate for serial connections
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: SerialParity,
    pub flow_control: bool,
    /// Single read timeout in milliseconds
    pub read_timeout_ms: u64,
    /// Abort when the device is silent this long; 0 waits forever
    pub idle_timeout_ms: u64,
    /// Longest unterminated line accepted from the device
    pub max_line_length: usize,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            port: AUTO_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: 8,
            stop_bits: 1,
            parity: SerialParity::None,
            flow_control: false,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            idle_timeout_ms: 60_000,
            max_line_length: 1024,
        }
    }
}

impl ConnectionSettings {
    /// Explicit port, or `None` when auto-detection is requested
    pub fn explicit_port(&self) -> Option<&str> {
        let port = self.port.trim();
        if port.is_empty() || port.eq_ignore_ascii_case(AUTO_PORT) {
            None
        } else {
            Some(port)
        }
    }

    /// Serial parameters for `port`
    pub fn connection_params(&self, port: impl Into<String>) -> ConnectionParams {
        ConnectionParams {
            port: port.into(),
            baud_rate: self.baud_rate,
            data_bits: self.data_bits,
            stop_bits: self.stop_bits,
            parity: self.parity,
            flow_control: self.flow_control,
            read_timeout_ms: self.read_timeout_ms,
        }
    }

    pub fn streamer_config(&self) -> StreamerConfig {
        StreamerConfig {
            idle_timeout: None,
            max_line_len: self.max_line_length,
        }
        .with_idle_timeout_ms(self.idle_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.streamer_config().idle_timeout
    }
}

/// Delivery and compilation behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// What a repeated `;Ready;` does mid-delivery
    pub ready_policy: ReadyPolicy,
    /// Which point rotated ellipses pivot around
    pub pivot_mode: PivotMode,
}

/// Complete application configuration
///
/// Aggregates all settings sections and provides file I/O operations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub machine: MachineSettings,
    pub connection: ConnectionSettings,
    pub session: SessionSettings,
}

enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> SettingsResult<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        other => Err(ConfigError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )
        .into()),
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Default location of the config file
    pub fn default_path() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("xyplot").join(CONFIG_FILE_NAME))
            .ok_or_else(|| {
                SettingsError::ConfigDirectory("platform has no config directory".to_string())
            })
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = format_of(path)?;
        let content = std::fs::read_to_string(path)?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load an explicit file, else the default file if present, else defaults
    pub fn load_or_default(path: Option<&Path>) -> SettingsResult<Self> {
        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.display().to_string()).into());
            }
            return Self::load_from_file(path);
        }

        match Self::default_path() {
            Ok(default) if default.exists() => Self::load_from_file(&default),
            Ok(_) => Ok(Self::default()),
            Err(e) => {
                tracing::debug!("Using default config: {}", e);
                Ok(Self::default())
            }
        }
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match format_of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        let positive = |key: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(SettingsError::invalid(key, format!("must be > 0, got {}", value)))
            }
        };
        positive("machine.step_angle_deg", self.machine.step_angle_deg)?;
        positive("machine.pulley_diameter_mm", self.machine.pulley_diameter_mm)?;

        let conn = &self.connection;
        if conn.baud_rate == 0 {
            return Err(SettingsError::invalid("connection.baud_rate", "must be > 0"));
        }
        if !(5..=8).contains(&conn.data_bits) {
            return Err(SettingsError::invalid(
                "connection.data_bits",
                format!("must be 5-8, got {}", conn.data_bits),
            ));
        }
        if !matches!(conn.stop_bits, 1 | 2) {
            return Err(SettingsError::invalid(
                "connection.stop_bits",
                format!("must be 1 or 2, got {}", conn.stop_bits),
            ));
        }
        if conn.read_timeout_ms == 0 {
            return Err(SettingsError::invalid("connection.read_timeout_ms", "must be > 0"));
        }
        if conn.max_line_length == 0 {
            return Err(SettingsError::invalid("connection.max_line_length", "must be > 0"));
        }

        Ok(())
    }

    /// Step converter for the configured machine geometry
    pub fn step_converter(&self) -> SettingsResult<StepConverter> {
        StepConverter::new(self.machine.step_angle_deg, self.machine.pulley_diameter_mm)
            .map_err(|e| SettingsError::invalid("machine", e.to_string()))
    }
}
