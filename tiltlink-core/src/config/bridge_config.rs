//! Bridge configuration loaded once at startup
//!
//! Every section falls back to its defaults when omitted, so a config file
//! only needs to list the values it changes.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, TiltLinkError};

/// Serial port selection and link timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Fixed port override. Empty means automatic discovery.
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Ports tried before the OS enumeration, in order
    pub candidate_ports: Vec<String>,
    /// Read timeout in milliseconds (bounds each line read)
    pub read_timeout_ms: u64,
    /// Write timeout in milliseconds
    pub write_timeout_ms: u64,
    /// How long a candidate may stay silent before it is rejected
    pub probe_window_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: 115_200,
            candidate_ports: ["COM15", "COM16", "COM11", "COM10", "COM5", "COM4"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
            read_timeout_ms: 100,
            write_timeout_ms: 1000,
            probe_window_ms: 2000,
        }
    }
}

impl SerialConfig {
    /// Port override, if one is configured
    pub fn port_override(&self) -> Option<&str> {
        let port = self.port.trim();
        (!port.is_empty()).then_some(port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn probe_window(&self) -> Duration {
        Duration::from_millis(self.probe_window_ms)
    }
}

/// Automatic reconnection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Re-probe automatically after a read fault or a failed discovery
    pub enabled: bool,
    /// Delay before the re-probe runs, in milliseconds
    pub delay_ms: u64,
    /// How long shutdown waits for the reader task, in milliseconds
    pub shutdown_grace_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_ms: 1500,
            shutdown_grace_ms: 300,
        }
    }
}

impl ReconnectConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Tilt angle to steer mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringConfig {
    /// Angle mapped to steer -1
    pub input_min_deg: f32,
    /// Angle mapped to steer +1
    pub input_max_deg: f32,
    /// Angles with a smaller magnitude collapse to 0
    pub dead_zone_deg: f32,
    /// 0 = instant, 1 = frozen
    pub smoothing: f32,
    pub sensitivity: f32,
    pub invert: bool,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            input_min_deg: -30.0,
            input_max_deg: 30.0,
            dead_zone_deg: 1.0,
            smoothing: 0.15,
            sensitivity: 1.0,
            invert: false,
        }
    }
}

/// Per-line debug logging toggles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Log every line sent to the device
    pub outbound: bool,
    /// Log every line received from the device
    pub inbound: bool,
    /// Log port discovery and probing
    pub probe: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            outbound: false,
            inbound: false,
            probe: true,
        }
    }
}

/// Outbound speed publisher settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedConfig {
    /// Minimum interval between two sends, in milliseconds
    pub send_interval_ms: u64,
    /// Skip sends whose value equals the last one sent
    pub only_when_changed: bool,
    /// Round to the nearest km/h instead of truncating
    pub round_to_nearest: bool,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            send_interval_ms: 100,
            only_when_changed: true,
            round_to_nearest: true,
        }
    }
}

impl SpeedConfig {
    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms)
    }
}

/// Host tick loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Ticks per second
    pub tick_hz: u32,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self { tick_hz: 60 }
    }
}

impl HostConfig {
    /// Duration of one tick. Only meaningful once the config has been validated.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.tick_hz.max(1)))
    }
}

/// Configuration for the TiltLink bridge.
///
/// Located at `~/.config/tiltlink/config.toml` by default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub serial: SerialConfig,
    pub reconnect: ReconnectConfig,
    pub steering: SteeringConfig,
    pub debug: DebugConfig,
    pub speed: SpeedConfig,
    pub host: HostConfig,
}

impl BridgeConfig {
    /// Parse BridgeConfig from TOML string.
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize BridgeConfig to TOML string.
    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Reject values the steering math or the link cannot work with.
    pub fn validate(&self) -> Result<()> {
        let s = &self.steering;

        let ordered = s.input_max_deg > s.input_min_deg;
        if !ordered {
            return Err(TiltLinkError::Config(format!(
                "steering.input_max_deg ({}) must be greater than steering.input_min_deg ({})",
                s.input_max_deg, s.input_min_deg
            )));
        }
        if !(0.0..=1.0).contains(&s.smoothing) {
            return Err(TiltLinkError::Config(format!(
                "steering.smoothing must be within [0, 1], got {}",
                s.smoothing
            )));
        }
        if s.dead_zone_deg.is_nan() || s.dead_zone_deg < 0.0 {
            return Err(TiltLinkError::Config(format!(
                "steering.dead_zone_deg must not be negative, got {}",
                s.dead_zone_deg
            )));
        }
        if !s.sensitivity.is_finite() {
            return Err(TiltLinkError::Config(
                "steering.sensitivity must be a finite number".to_string(),
            ));
        }
        if self.serial.baud_rate == 0 {
            return Err(TiltLinkError::Config(
                "serial.baud_rate must be greater than 0".to_string(),
            ));
        }
        if self.serial.read_timeout_ms == 0 {
            return Err(TiltLinkError::Config(
                "serial.read_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.host.tick_hz == 0 {
            return Err(TiltLinkError::Config(
                "host.tick_hz must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bridge_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.serial.port_override(), None);
        assert_eq!(config.serial.candidate_ports[0], "COM15");
        assert!(config.reconnect.enabled);
        assert_eq!(config.reconnect.delay(), Duration::from_millis(1500));
        assert_eq!(config.serial.probe_window(), Duration::from_millis(2000));
        assert!(config.debug.probe);
        assert!(!config.debug.inbound);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bridge_config_serialization() {
        let toml_str = BridgeConfig::default().to_toml().unwrap();

        assert!(toml_str.contains("[serial]"));
        assert!(toml_str.contains("[reconnect]"));
        assert!(toml_str.contains("[steering]"));
        assert!(toml_str.contains("baud_rate = 115200"));
    }

    #[test]
    fn test_bridge_config_partial_file_uses_defaults() {
        let toml_str = r#"
            [serial]
            port = "/dev/rfcomm0"
            baud_rate = 9600

            [steering]
            invert = true
        "#;

        let config = BridgeConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.serial.port_override(), Some("/dev/rfcomm0"));
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.serial.read_timeout_ms, 100);
        assert!(config.steering.invert);
        assert_eq!(config.steering.input_max_deg, 30.0);
        assert_eq!(config.reconnect, ReconnectConfig::default());
    }

    #[test]
    fn test_whitespace_port_is_not_an_override() {
        let config = SerialConfig {
            port: "   ".to_string(),
            ..Default::default()
        };
        assert_eq!(config.port_override(), None);
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let mut config = BridgeConfig::default();
        config.steering.input_min_deg = 10.0;
        config.steering.input_max_deg = 10.0;

        assert!(matches!(config.validate(), Err(TiltLinkError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_smoothing_out_of_range() {
        let mut config = BridgeConfig::default();
        config.steering.smoothing = 1.5;
        assert!(config.validate().is_err());

        config.steering.smoothing = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_tick_rate() {
        let mut config = BridgeConfig::default();
        config.host.tick_hz = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tick_interval() {
        let host = HostConfig { tick_hz: 50 };
        assert_eq!(host.tick_interval(), Duration::from_millis(20));
    }
}
