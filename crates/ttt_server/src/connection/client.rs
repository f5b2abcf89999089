//! Connection and user records held by the session registry.

use std::net::SocketAddr;
use std::time::SystemTime;
use uuid::Uuid;

use super::ConnectionId;

/// Represents an individual peer connected through the transport.
///
/// A connection starts without a user; handlers attach one once the peer
/// joins.
///
/// # Fields
///
/// * `id` - Transport-assigned connection id
/// * `remote_addr` - The network address of the peer
/// * `connected_at` - Timestamp when the connection was established
/// * `user` - The logical user, once joined
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub remote_addr: SocketAddr,
    pub connected_at: SystemTime,
    pub user: Option<User>,
}

impl Connection {
    /// Creates a connection record with no user attached.
    pub fn new(id: ConnectionId, remote_addr: SocketAddr) -> Self {
        Self {
            id,
            remote_addr,
            connected_at: SystemTime::now(),
            user: None,
        }
    }

    pub fn user_name(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.name.as_str())
    }
}

/// Logical identity a connection joins as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub joined_at: SystemTime,
}

impl User {
    /// Creates a user with a freshly generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            joined_at: SystemTime::now(),
        }
    }
}
