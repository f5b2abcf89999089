//! Server configuration types and defaults.
//!
//! This module contains the server configuration structure and default values
//! used to initialize the network server and its transport.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Well-known port the server listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 8070;

/// Configuration structure for the network server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind the UDP socket to
    pub bind_address: IpAddr,

    /// UDP port to listen on
    pub port: u16,

    /// How often the host process drains transport events, in milliseconds
    pub poll_interval_ms: u64,

    /// Transport tuning
    pub transport: TransportConfig,

    /// Admission control settings
    pub security: SecurityConfig,
}

/// Channel timings and size limits for the UDP transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Delay before an unacknowledged reliable message is resent, in milliseconds
    pub resend_interval_ms: u64,

    /// Interval between round-trip reports for each peer, in milliseconds
    pub latency_interval_ms: u64,

    /// Largest message payload accepted for sending, in bytes
    pub max_packet_size: usize,

    /// Client slots the netcode server keeps open
    pub max_clients: usize,

    /// Addresses clients connect to; the bound address when empty
    pub public_addresses: Vec<SocketAddr>,
}

/// Admission control applied to incoming connection requests.
///
/// The default configuration accepts everyone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Maximum number of concurrent connections (unlimited when absent)
    pub max_connections: Option<usize>,

    /// Addresses whose connection requests are always rejected
    pub banned_ips: Vec<IpAddr>,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl TransportConfig {
    pub fn resend_interval(&self) -> Duration {
        Duration::from_millis(self.resend_interval_ms)
    }

    pub fn latency_interval(&self) -> Duration {
        Duration::from_millis(self.latency_interval_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            poll_interval_ms: 15,
            transport: TransportConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            resend_interval_ms: 100,
            latency_interval_ms: 1_000,
            max_packet_size: 1_200,
            max_clients: 64,
            public_addresses: Vec::new(),
        }
    }
}
