//! Configuration management for the Tic-Tac-Toe server.
//!
//! This module handles loading, validation, and conversion of server configuration
//! from TOML files and command-line arguments.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use tracing::info;
use ttt_server::{SecurityConfig, ServerConfig, TransportConfig, DEFAULT_PORT};

/// Largest message payload accepted for `transport.max_packet_size`.
/// renet slices bigger messages across datagrams.
pub const MAX_PACKET_SIZE_LIMIT: usize = 16 * 1024;

/// Client slot ceiling of the netcode server.
pub const MAX_CLIENTS_LIMIT: usize = 1_024;

fn default_poll_interval() -> u64 {
    15
}

fn default_resend_interval() -> u64 {
    100
}

fn default_latency_interval() -> u64 {
    1_000
}

fn default_max_clients() -> usize {
    64
}

fn default_max_packet_size() -> usize {
    1_200
}

/// Application configuration loaded from TOML file.
///
/// This is the main configuration structure that encompasses all server settings
/// including networking, transport tuning and logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration settings
    pub server: ServerSettings,
    /// Transport tuning
    #[serde(default)]
    pub transport: TransportSettings,
    /// Logging configuration settings
    pub logging: LoggingSettings,
}

/// Server-specific configuration settings.
///
/// Controls the listening socket, poll cadence and admission limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Interface to bind to (e.g., "0.0.0.0")
    pub bind_address: String,
    /// UDP port to listen on
    pub port: u16,
    /// Interval between transport polls in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Maximum number of concurrent connections (unlimited when absent)
    #[serde(default)]
    pub max_connections: Option<usize>,
    /// Addresses whose connection requests are rejected
    #[serde(default)]
    pub banned_ips: Vec<String>,
}

/// Channel timings and client slots for the UDP transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportSettings {
    #[serde(default = "default_resend_interval")]
    pub resend_interval_ms: u64,
    #[serde(default = "default_latency_interval")]
    pub latency_interval_ms: u64,
    #[serde(default = "default_max_packet_size")]
    pub max_packet_size: usize,
    /// Netcode client slots
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,
    /// Addresses clients dial (e.g. "203.0.113.7:8070"); the bound address when empty
    #[serde(default)]
    pub public_addresses: Vec<String>,
}

/// Logging configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                bind_address: "0.0.0.0".to_string(),
                port: DEFAULT_PORT,
                poll_interval_ms: default_poll_interval(),
                max_connections: None,
                banned_ips: Vec::new(),
            },
            transport: TransportSettings::default(),
            logging: LoggingSettings {
                level: "info".to_string(),
                json_format: false,
            },
        }
    }
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            resend_interval_ms: default_resend_interval(),
            latency_interval_ms: default_latency_interval(),
            max_packet_size: default_max_packet_size(),
            max_clients: default_max_clients(),
            public_addresses: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The loaded configuration, or an error if the file could not be read,
    /// parsed, or created.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Converts the application configuration to a network server configuration.
    ///
    /// # Returns
    ///
    /// A `ServerConfig` instance ready for use with the network server, or an
    /// error if an address does not parse.
    pub fn to_server_config(&self) -> Result<ServerConfig, Box<dyn std::error::Error>> {
        let banned_ips = self
            .server
            .banned_ips
            .iter()
            .map(|ip| ip.parse::<IpAddr>())
            .collect::<Result<Vec<_>, _>>()?;
        let public_addresses = self
            .transport
            .public_addresses
            .iter()
            .map(|addr| addr.parse::<SocketAddr>())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ServerConfig {
            bind_address: self.server.bind_address.parse()?,
            port: self.server.port,
            poll_interval_ms: self.server.poll_interval_ms,
            transport: TransportConfig {
                resend_interval_ms: self.transport.resend_interval_ms,
                latency_interval_ms: self.transport.latency_interval_ms,
                max_packet_size: self.transport.max_packet_size,
                max_clients: self.transport.max_clients,
                public_addresses,
            },
            security: SecurityConfig {
                max_connections: self.server.max_connections,
                banned_ips,
            },
        })
    }

    /// Validates the configuration for correctness.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error message describing
    /// the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind_address.parse::<IpAddr>().is_err() {
            return Err(format!(
                "Invalid bind address: {}",
                &self.server.bind_address
            ));
        }

        for ip in &self.server.banned_ips {
            if ip.parse::<IpAddr>().is_err() {
                return Err(format!("Invalid banned ip: {ip}"));
            }
        }

        if self.server.poll_interval_ms == 0 {
            return Err("server.poll_interval_ms must be greater than 0".to_string());
        }

        if self.server.max_connections == Some(0) {
            return Err("server.max_connections must be greater than 0 when set".to_string());
        }

        for addr in &self.transport.public_addresses {
            if addr.parse::<SocketAddr>().is_err() {
                return Err(format!("Invalid public address: {addr}"));
            }
        }

        if self.transport.resend_interval_ms == 0 {
            return Err("transport.resend_interval_ms must be greater than 0".to_string());
        }

        if !(1..=MAX_PACKET_SIZE_LIMIT).contains(&self.transport.max_packet_size) {
            return Err(format!(
                "transport.max_packet_size must be between 1 and {MAX_PACKET_SIZE_LIMIT}"
            ));
        }

        if !(1..=MAX_CLIENTS_LIMIT).contains(&self.transport.max_clients) {
            return Err(format!(
                "transport.max_clients must be between 1 and {MAX_CLIENTS_LIMIT}"
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;
    use tokio::fs;

    #[test]
    fn test_default_config_converts() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());

        let server_config = config.to_server_config().unwrap();
        assert_eq!(server_config.port, 8070);
        assert_eq!(server_config.transport.resend_interval_ms, 100);
        assert_eq!(server_config.transport.max_clients, 64);
        assert!(server_config.transport.public_addresses.is_empty());
        assert!(server_config.security.max_connections.is_none());
        assert!(server_config.security.banned_ips.is_empty());
    }

    #[tokio::test]
    async fn test_load_creates_default_file_when_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let temp_path = temp_dir.path().join("config.toml");

        let config = AppConfig::load_from_file(&temp_path).await.unwrap();
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert!(temp_path.exists());

        let written = fs::read_to_string(&temp_path).await.unwrap();
        assert!(written.contains("[server]"));
        assert!(written.contains("[logging]"));
    }

    #[tokio::test]
    async fn test_load_from_existing_file() {
        let temp_file = NamedTempFile::new().unwrap();
        let toml_content = r#"
[server]
bind_address = "127.0.0.1"
port = 9100
max_connections = 64
banned_ips = ["10.0.0.66"]

[transport]
resend_interval_ms = 50
public_addresses = ["203.0.113.7:9100"]

[logging]
level = "debug"
json_format = true
"#;
        fs::write(temp_file.path(), toml_content).await.unwrap();

        let config = AppConfig::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.poll_interval_ms, 15);
        assert_eq!(config.transport.resend_interval_ms, 50);
        assert_eq!(config.transport.latency_interval_ms, 1_000);
        assert!(config.logging.json_format);

        let server_config = config.to_server_config().unwrap();
        assert_eq!(server_config.socket_addr().to_string(), "127.0.0.1:9100");
        assert_eq!(server_config.security.max_connections, Some(64));
        assert_eq!(
            server_config.transport.public_addresses,
            vec!["203.0.113.7:9100".parse::<SocketAddr>().unwrap()]
        );
        assert_eq!(
            server_config.security.banned_ips,
            vec!["10.0.0.66".parse::<IpAddr>().unwrap()]
        );
    }

    #[tokio::test]
    async fn test_load_rejects_malformed_toml() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), "[server\nport = ").await.unwrap();
        assert!(AppConfig::load_from_file(temp_file.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_load_from_unwritable_location_fails() {
        let path = PathBuf::from("/nonexistent-dir/ttt/config.toml");
        assert!(AppConfig::load_from_file(&path).await.is_err());
    }

    #[test]
    fn test_validation_invalid_bind_address() {
        let mut config = AppConfig::default();
        config.server.bind_address = "invalid_address".to_string();

        let result = config.validate();
        assert!(result.unwrap_err().contains("Invalid bind address"));
    }

    #[test]
    fn test_validation_invalid_banned_ip() {
        let mut config = AppConfig::default();
        config.server.banned_ips = vec!["not-an-ip".to_string()];
        assert!(config.validate().unwrap_err().contains("Invalid banned ip"));
    }

    #[test]
    fn test_validation_limits() {
        let mut config = AppConfig::default();
        config.server.max_connections = Some(0);
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.server.poll_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.transport.max_packet_size = MAX_PACKET_SIZE_LIMIT + 1;
        assert!(config.validate().unwrap_err().contains("max_packet_size"));

        let mut config = AppConfig::default();
        config.transport.max_clients = MAX_CLIENTS_LIMIT + 1;
        assert!(config.validate().unwrap_err().contains("max_clients"));

        let mut config = AppConfig::default();
        config.transport.public_addresses = vec!["203.0.113.7".to_string()];
        assert!(config.validate().unwrap_err().contains("Invalid public address"));
    }

    #[test]
    fn test_validation_log_levels() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            let mut config = AppConfig::default();
            config.logging.level = level.to_string();
            assert!(config.validate().is_ok(), "Level '{}' should be valid", level);
        }

        let mut config = AppConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().unwrap_err().contains("Invalid log level"));
    }
}
