//! Server configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub timing: TimingConfig,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("config.toml"))
    }

    /// Load configuration from `path`, writing a default file if it is missing.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            info!("No {} found, creating default config", path.display());
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            Ok(default_config)
        }
    }
}

/// Server networking and admission settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Connections per IP limit.
    #[serde(default = "default_ip_limit")]
    pub ip_limit: usize,
    /// Seconds a connection may stay open without sending its join packet.
    #[serde(default = "default_join_timeout")]
    pub join_timeout_secs: u64,
    /// Maximum concurrent rooms.
    #[serde(default = "default_max_rooms")]
    pub max_rooms: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            max_connections: default_max_connections(),
            ip_limit: default_ip_limit(),
            join_timeout_secs: default_join_timeout(),
            max_rooms: default_max_rooms(),
        }
    }
}

impl ServerConfig {
    pub fn join_timeout(&self) -> Duration {
        Duration::from_secs(self.join_timeout_secs)
    }
}

fn default_port() -> u16 {
    2567
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_max_connections() -> usize {
    100
}
fn default_ip_limit() -> usize {
    10
}
fn default_join_timeout() -> u64 {
    30
}
fn default_max_rooms() -> usize {
    100
}

/// Match timing. The defaults are what clients expect; the countdown UI
/// is built around `start_delay_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct TimingConfig {
    /// Simulation tick period in milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Delay between the second join and the first tick.
    #[serde(default = "default_start_delay")]
    pub start_delay_ms: u64,
    /// Delay between the outcome and room disposal.
    #[serde(default = "default_dispose_delay")]
    pub dispose_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            start_delay_ms: default_start_delay(),
            dispose_delay_ms: default_dispose_delay(),
        }
    }
}

impl TimingConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    pub fn dispose_delay(&self) -> Duration {
        Duration::from_millis(self.dispose_delay_ms)
    }
}

fn default_tick_interval() -> u64 {
    60
}
fn default_start_delay() -> u64 {
    3000
}
fn default_dispose_delay() -> u64 {
    5000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 2567);
        assert_eq!(config.timing.tick_interval_ms, 60);
        assert_eq!(config.timing.start_delay_ms, 3000);
        assert_eq!(config.timing.dispose_delay_ms, 5000);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9000

            [timing]
            tick_interval_ms = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.timing.tick_interval_ms, 30);
        assert_eq!(config.timing.start_delay_ms, 3000);
    }

    #[test]
    fn test_load_writes_default_file() {
        let path = std::env::temp_dir().join(format!("light-duel-config-{}.toml", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.timing, TimingConfig::default());

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.server.port, config.server.port);
        std::fs::remove_file(&path).unwrap();
    }
}
