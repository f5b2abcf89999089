//! Utility functions for creating server instances.
//!
//! This module provides convenient factory functions for binding a server
//! with default or custom configuration.

use crate::{config::ServerConfig, error::ServerError, server::NetworkServer};

/// Creates a UDP network server with default configuration.
///
/// The server listens on `0.0.0.0:8070` with the standard registries and
/// accepts every connection request.
///
/// # Returns
///
/// A bound `NetworkServer`, or a `ServerError` if the port is unavailable.
pub fn create_server() -> Result<NetworkServer, ServerError> {
    NetworkServer::start(ServerConfig::default())
}

/// Creates a UDP network server with custom configuration.
///
/// # Arguments
///
/// * `config` - A `ServerConfig` instance with desired settings
///
/// # Example
///
/// ```rust
/// use ttt_server::{create_server_with_config, ServerConfig};
///
/// let config = ServerConfig {
///     bind_address: "127.0.0.1".parse().unwrap(),
///     port: 0,
///     ..Default::default()
/// };
///
/// let server = create_server_with_config(config).unwrap();
/// assert!(server.local_addr().is_some());
/// ```
pub fn create_server_with_config(config: ServerConfig) -> Result<NetworkServer, ServerError> {
    NetworkServer::start(config)
}
