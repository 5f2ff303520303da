//! Daemon configuration loading

use std::path::{Path, PathBuf};
use tiltlink_core::{default_config_path, BridgeConfig, Result, TiltLinkError};
use tokio::fs;
use tracing::info;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "TILTLINK_CONFIG";
/// Environment variable naming a fixed serial port
pub const PORT_ENV: &str = "TILTLINK_PORT";

/// Config path: CLI flag > environment > default location
pub fn resolve_config_path(cli: Option<PathBuf>, env: Option<String>) -> PathBuf {
    cli.or_else(|| env.filter(|v| !v.is_empty()).map(PathBuf::from))
        .unwrap_or_else(default_config_path)
}

/// Port override: CLI flag > environment; blank values are ignored.
pub fn resolve_port_override(cli: Option<String>, env: Option<String>) -> Option<String> {
    cli.into_iter()
        .chain(env)
        .map(|p| p.trim().to_string())
        .find(|p| !p.is_empty())
}

/// Load and validate the config at `path`, creating it with defaults when
/// it does not exist yet.
pub async fn load_config(path: &Path) -> Result<BridgeConfig> {
    if !path.exists() {
        info!(
            "Config not found at {}. Creating with defaults.",
            path.display()
        );

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                TiltLinkError::Config(format!(
                    "Failed to create config directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let config = BridgeConfig::default();
        let toml_str = config
            .to_toml()
            .map_err(|e| TiltLinkError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, &toml_str)
            .await
            .map_err(|e| TiltLinkError::Config(format!("Failed to write config file: {}", e)))?;

        return Ok(config);
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| TiltLinkError::Config(format!("Failed to read config file: {}", e)))?;

    let config = BridgeConfig::from_toml(&content)
        .map_err(|e| TiltLinkError::Config(format!("Failed to parse config file: {}", e)))?;
    config.validate()?;
    Ok(config)
}
