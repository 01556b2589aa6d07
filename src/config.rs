//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, RovLinkError};
use crate::protocol::types::{AxisEncoding, CameraAxes, ControlSchema};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// UDP endpoint configuration
#[derive(Debug, Deserialize, Clone)]
pub struct NetworkConfig {
    #[serde(default = "default_remote_host")]
    pub remote_host: String,

    #[serde(default = "default_remote_port")]
    pub remote_port: u16,

    #[serde(default = "default_local_host")]
    pub local_host: String,

    #[serde(default = "default_local_port")]
    pub local_port: u16,

    #[serde(default = "default_receive_timeout_ms")]
    pub receive_timeout_ms: u64,
}

/// Wire schema configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ProtocolConfig {
    #[serde(default = "default_protocol_version")]
    pub version: i8,

    #[serde(default)]
    pub axis_encoding: AxisEncoding,

    #[serde(default = "default_camera_axes")]
    pub camera_axes: u8,
}

/// Control loop configuration and fixed vehicle setpoints
#[derive(Debug, Deserialize, Clone)]
pub struct ControlConfig {
    #[serde(default = "default_tick_rate_hz")]
    pub tick_rate_hz: u32,

    #[serde(default = "default_link_timeout_ms")]
    pub link_timeout_ms: u64,

    #[serde(default = "default_hello_on_start")]
    pub hello_on_start: bool,

    #[serde(default)]
    pub debug_flag: bool,

    #[serde(default)]
    pub regulators: u8,

    #[serde(default)]
    pub desired_depth: f32,

    #[serde(default)]
    pub desired_yaw: f32,

    #[serde(default)]
    pub camera_index: u8,
}

/// Controller configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ControllerConfig {
    /// Empty means auto-detect
    #[serde(default)]
    pub device_path: String,

    #[serde(default = "default_mapping_file")]
    pub mapping_file: String,

    #[serde(default = "default_deadzone")]
    pub deadzone: f32,

    #[serde(default)]
    pub expo: f32,

    /// Logical axes whose direction is flipped (`axis_x`, `axis_y`, `axis_z`, `axis_w`)
    #[serde(default = "default_invert_axes")]
    pub invert_axes: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Empty disables the rolling log file
    #[serde(default)]
    pub log_dir: String,
}

// Default value functions
fn default_remote_host() -> String { "192.168.1.5".to_string() }
fn default_remote_port() -> u16 { 3020 }
fn default_local_host() -> String { "0.0.0.0".to_string() }
fn default_local_port() -> u16 { 3010 }
fn default_receive_timeout_ms() -> u64 { 50 }

fn default_protocol_version() -> i8 { crate::protocol::types::PROTOCOL_VERSION }
fn default_camera_axes() -> u8 { 2 }

fn default_tick_rate_hz() -> u32 { 10 }
fn default_link_timeout_ms() -> u64 { 1000 }
fn default_hello_on_start() -> bool { true }

fn default_mapping_file() -> String { "Joystick.settings".to_string() }
fn default_deadzone() -> f32 { 0.05 }
fn default_invert_axes() -> Vec<String> { vec!["axis_x".to_string(), "axis_w".to_string()] }

fn default_log_level() -> String { "info".to_string() }

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            remote_host: default_remote_host(),
            remote_port: default_remote_port(),
            local_host: default_local_host(),
            local_port: default_local_port(),
            receive_timeout_ms: default_receive_timeout_ms(),
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            version: default_protocol_version(),
            axis_encoding: AxisEncoding::default(),
            camera_axes: default_camera_axes(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: default_tick_rate_hz(),
            link_timeout_ms: default_link_timeout_ms(),
            hello_on_start: default_hello_on_start(),
            debug_flag: false,
            regulators: 0,
            desired_depth: 0.0,
            desired_yaw: 0.0,
            camera_index: 0,
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            device_path: String::new(),
            mapping_file: default_mapping_file(),
            deadzone: default_deadzone(),
            expo: 0.0,
            invert_axes: default_invert_axes(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: String::new(),
        }
    }
}

/// Logical axis names accepted by `invert_axes`
const AXIS_NAMES: [&str; 4] = ["axis_x", "axis_y", "axis_z", "axis_w"];

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rov_link::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Remote vehicle address
    pub fn remote_addr(&self) -> Result<SocketAddr> {
        parse_addr(&self.network.remote_host, self.network.remote_port)
    }

    /// Local bind address
    pub fn local_addr(&self) -> Result<SocketAddr> {
        parse_addr(&self.network.local_host, self.network.local_port)
    }

    /// Bounded wait for one receive attempt
    #[must_use]
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.network.receive_timeout_ms)
    }

    /// Period of one control tick
    #[must_use]
    pub fn tick_period(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.control.tick_rate_hz.max(1) as u64)
    }

    /// Time without fresh telemetry before the link is reported lost
    #[must_use]
    pub fn link_timeout(&self) -> Duration {
        Duration::from_millis(self.control.link_timeout_ms)
    }

    /// Control schema for the session's encoder
    #[must_use]
    pub fn control_schema(&self) -> ControlSchema {
        ControlSchema {
            version: self.protocol.version,
            axis_encoding: self.protocol.axis_encoding,
            camera_axes: CameraAxes::from_count(self.protocol.camera_axes).unwrap_or_default(),
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        self.remote_addr()?;
        self.local_addr()?;

        if self.network.remote_port == 0 {
            return Err(invalid("remote_port cannot be 0"));
        }

        if self.network.receive_timeout_ms == 0 || self.network.receive_timeout_ms > 10000 {
            return Err(invalid("receive_timeout_ms must be between 1 and 10000"));
        }

        if self.protocol.version < 1 {
            return Err(invalid("protocol version must be positive"));
        }

        if CameraAxes::from_count(self.protocol.camera_axes).is_none() {
            return Err(invalid("camera_axes must be 2 or 3"));
        }

        if self.control.tick_rate_hz == 0 || self.control.tick_rate_hz > 100 {
            return Err(invalid("tick_rate_hz must be between 1 and 100"));
        }

        // A receive that outlasts the tick would stretch the fixed rate
        if self.receive_timeout() >= self.tick_period() {
            return Err(invalid("receive_timeout_ms must be shorter than one tick period"));
        }

        if self.control.link_timeout_ms == 0 || self.control.link_timeout_ms > 60000 {
            return Err(invalid("link_timeout_ms must be between 1 and 60000"));
        }

        if self.control.camera_index > 1 {
            return Err(invalid("camera_index must be 0 or 1"));
        }

        if !self.control.desired_depth.is_finite() || !self.control.desired_yaw.is_finite() {
            return Err(invalid("desired_depth and desired_yaw must be finite"));
        }

        if self.controller.mapping_file.is_empty() {
            return Err(invalid("mapping_file cannot be empty"));
        }

        if self.controller.deadzone < 0.0 || self.controller.deadzone > 0.25 {
            return Err(invalid("deadzone must be between 0.0 and 0.25"));
        }

        if self.controller.expo < 0.0 || self.controller.expo > 1.0 {
            return Err(invalid("expo must be between 0.0 and 1.0"));
        }

        for name in &self.controller.invert_axes {
            if !AXIS_NAMES.contains(&name.as_str()) {
                return Err(invalid(format!(
                    "invert_axes entry '{}' is not one of: {}",
                    name,
                    AXIS_NAMES.join(", ")
                )));
            }
        }

        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(invalid("log level must be one of: trace, debug, info, warn, error"));
        }

        Ok(())
    }
}

fn parse_addr(host: &str, port: u16) -> Result<SocketAddr> {
    let ip: IpAddr = host
        .parse()
        .map_err(|_| invalid(format!("'{}' is not an IP address", host)))?;
    Ok(SocketAddr::new(ip, port))
}

fn invalid(msg: impl Into<String>) -> RovLinkError {
    RovLinkError::ConfigValidation(msg.into())
}
