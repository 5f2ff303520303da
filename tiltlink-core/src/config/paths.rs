//! Default path resolution for configuration files

use std::path::PathBuf;

/// Returns the default path for the bridge configuration file.
///
/// Uses XDG config directory if available:
/// - Linux/macOS: `~/.config/tiltlink/config.toml`
/// - Fallback: `/etc/tiltlink/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/etc"))
        .join("tiltlink")
        .join("config.toml")
}
