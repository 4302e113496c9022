//! xyplot Settings Crate
//!
//! Handles application configuration: machine geometry, serial connection
//! parameters and delivery behaviour.

pub mod config;
pub mod error;

pub use config::{Config, ConnectionSettings, MachineSettings, SessionSettings, AUTO_PORT};
pub use error::{ConfigError, SettingsError, SettingsResult};
