//! Policies deciding whether a connection request is accepted.

use crate::config::SecurityConfig;
use std::collections::HashSet;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accept,
    Reject(RejectReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The address is on the ban list
    Banned,
    /// The server already holds its maximum number of connections
    ServerFull,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Banned => f.write_str("banned address"),
            RejectReason::ServerFull => f.write_str("server full"),
        }
    }
}

/// Consulted once per connection request.
pub trait AdmissionPolicy: Send + Sync + fmt::Debug {
    /// Decides on a request from `remote` while `active_connections` peers
    /// are registered.
    fn admit(&self, remote: SocketAddr, active_connections: usize) -> Admission;
}

/// Accepts every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl AdmissionPolicy for AcceptAll {
    fn admit(&self, _remote: SocketAddr, _active_connections: usize) -> Admission {
        Admission::Accept
    }
}

/// Rejects banned addresses and requests beyond a connection cap.
#[derive(Debug, Clone, Default)]
pub struct ConnectionLimits {
    max_connections: Option<usize>,
    banned_ips: HashSet<IpAddr>,
}

impl ConnectionLimits {
    pub fn new(config: &SecurityConfig) -> Self {
        Self {
            max_connections: config.max_connections,
            banned_ips: config.banned_ips.iter().copied().collect(),
        }
    }
}

impl AdmissionPolicy for ConnectionLimits {
    fn admit(&self, remote: SocketAddr, active_connections: usize) -> Admission {
        if self.banned_ips.contains(&remote.ip()) {
            return Admission::Reject(RejectReason::Banned);
        }
        match self.max_connections {
            Some(max) if active_connections >= max => Admission::Reject(RejectReason::ServerFull),
            _ => Admission::Accept,
        }
    }
}

/// Policy matching `config`: [`AcceptAll`] unless a limit or ban is set.
pub fn policy_from_config(config: &SecurityConfig) -> Box<dyn AdmissionPolicy> {
    if config.max_connections.is_none() && config.banned_ips.is_empty() {
        Box::new(AcceptAll)
    } else {
        Box::new(ConnectionLimits::new(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(ip: [u8; 4]) -> SocketAddr {
        SocketAddr::from((ip, 5000))
    }

    #[test]
    fn test_accept_all() {
        assert_eq!(AcceptAll.admit(remote([1, 2, 3, 4]), usize::MAX), Admission::Accept);
    }

    #[test]
    fn test_banned_ip_is_rejected_regardless_of_port() {
        let config = SecurityConfig {
            max_connections: None,
            banned_ips: vec![IpAddr::from([10, 0, 0, 66])],
        };
        let policy = policy_from_config(&config);

        assert_eq!(
            policy.admit(SocketAddr::from(([10, 0, 0, 66], 1)), 0),
            Admission::Reject(RejectReason::Banned)
        );
        assert_eq!(policy.admit(remote([10, 0, 0, 67]), 0), Admission::Accept);
    }

    #[test]
    fn test_connection_cap() {
        let config = SecurityConfig {
            max_connections: Some(2),
            banned_ips: Vec::new(),
        };
        let policy = ConnectionLimits::new(&config);

        assert_eq!(policy.admit(remote([1, 1, 1, 1]), 1), Admission::Accept);
        assert_eq!(
            policy.admit(remote([1, 1, 1, 1]), 2),
            Admission::Reject(RejectReason::ServerFull)
        );
    }
}
