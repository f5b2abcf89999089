//! Session registry for tracking connections and sending to them.
//!
//! The registry is the single source of truth for which connections exist:
//! inbound messages are only dispatched for ids it holds, and outbound sends
//! fail before touching the transport when the id is absent.

use super::{Connection, ConnectionId, User};
use crate::error::SessionError;
use crate::transport::Transport;
use bytes::BytesMut;
use std::collections::HashMap;
use std::net::SocketAddr;
use tracing::{debug, error, info, trace};
use ttt_shared::{encode, DeliveryMode, NetPacket};

/// Central registry of live connections and their users.
///
/// The registry owns the transport's send path and a single scratch buffer
/// that every outbound message is encoded into. All mutating operations take
/// `&mut self`, so only one encode can ever be in flight and the registry is
/// confined to the task that drives the dispatch loop.
///
/// # Architecture
///
/// * Plain `HashMap` keyed by transport-assigned connection id
/// * Users are stored inside their connection record, so disconnecting a
///   connection also forgets its user
/// * One reusable `BytesMut` for outbound encoding
#[derive(Debug)]
pub struct SessionRegistry {
    connections: HashMap<ConnectionId, Connection>,
    transport: Box<dyn Transport>,
    scratch: BytesMut,
}

impl SessionRegistry {
    /// Creates an empty registry sending through `transport`.
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            connections: HashMap::new(),
            transport,
            scratch: BytesMut::with_capacity(1_024),
        }
    }

    /// Registers a newly connected peer with no user attached.
    ///
    /// # Arguments
    ///
    /// * `connection_id` - The id the transport assigned to the peer
    /// * `remote_addr` - The peer's network address
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::DuplicateConnection`] if the id is already
    /// registered. The existing entry is left untouched.
    pub fn add_connection(
        &mut self,
        connection_id: ConnectionId,
        remote_addr: SocketAddr,
    ) -> Result<(), SessionError> {
        if let Some(existing) = self.connections.get(&connection_id) {
            error!(
                "🚨 Connection {} from {} is already registered (existing peer {})",
                connection_id, remote_addr, existing.remote_addr
            );
            return Err(SessionError::DuplicateConnection(connection_id));
        }

        self.connections
            .insert(connection_id, Connection::new(connection_id, remote_addr));
        info!("🔗 Connection {} from {}", connection_id, remote_addr);
        Ok(())
    }

    /// Looks up a connection.
    pub fn get_connection(&self, connection_id: ConnectionId) -> Result<&Connection, SessionError> {
        self.connections
            .get(&connection_id)
            .ok_or(SessionError::UnknownConnection(connection_id))
    }

    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.connections.contains_key(&connection_id)
    }

    /// Removes a connection and its user association.
    ///
    /// Unknown ids are a no-op. Returns the removed record, if any.
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Option<Connection> {
        let connection = self.connections.remove(&connection_id)?;
        match connection.user_name() {
            Some(name) => info!(
                "❌ Connection {} from {} ({}) disconnected",
                connection_id, connection.remote_addr, name
            ),
            None => info!(
                "❌ Connection {} from {} disconnected",
                connection_id, connection.remote_addr
            ),
        }
        Some(connection)
    }

    /// Drops the peer at the transport and removes its connection.
    ///
    /// Unknown ids are a no-op.
    pub fn kick(&mut self, connection_id: ConnectionId) -> Option<Connection> {
        if !self.contains(connection_id) {
            return None;
        }
        self.transport.disconnect(connection_id);
        self.disconnect(connection_id)
    }

    /// Associates a user with a connection, replacing any previous one.
    ///
    /// # Arguments
    ///
    /// * `connection_id` - The connection to update
    /// * `user` - The user the connection joined as
    pub fn set_user(
        &mut self,
        connection_id: ConnectionId,
        user: User,
    ) -> Result<(), SessionError> {
        let connection = self
            .connections
            .get_mut(&connection_id)
            .ok_or(SessionError::UnknownConnection(connection_id))?;
        debug!("👤 Connection {} joined as {} ({})", connection_id, user.name, user.id);
        connection.user = Some(user);
        Ok(())
    }

    /// Finds the connection whose user has `name`, ignoring ASCII case.
    pub fn connection_id_by_user_name(&self, name: &str) -> Option<ConnectionId> {
        self.connections
            .values()
            .find(|c| c.user_name().is_some_and(|n| n.eq_ignore_ascii_case(name)))
            .map(|c| c.id)
    }

    /// Iterates over every joined user.
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.connections.values().filter_map(|c| c.user.as_ref())
    }

    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.connections.keys().copied().collect()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Encodes `packet` and hands it to the transport.
    ///
    /// # Errors
    ///
    /// * [`SessionError::UnknownConnection`] if the id is not registered; no
    ///   transport I/O happens in that case
    /// * [`SessionError::Encode`] if a field exceeds its wire limit
    /// * [`SessionError::Transport`] if the transport refuses the datagram
    pub fn send<P: NetPacket>(
        &mut self,
        connection_id: ConnectionId,
        packet: &P,
        mode: DeliveryMode,
    ) -> Result<(), SessionError> {
        if !self.connections.contains_key(&connection_id) {
            return Err(SessionError::UnknownConnection(connection_id));
        }

        self.scratch.clear();
        encode(packet, &mut self.scratch)?;
        self.transport.send(connection_id, &self.scratch, mode)?;
        trace!(
            "📤 Sent {} ({} bytes, {}) to connection {}",
            P::TYPE.name(),
            self.scratch.len(),
            mode,
            connection_id
        );
        Ok(())
    }

    /// Sends `packet` to every registered connection.
    ///
    /// The packet is encoded once. Per-connection transport failures are
    /// logged and skipped.
    ///
    /// # Returns
    ///
    /// The number of connections the message was handed to the transport for.
    pub fn broadcast<P: NetPacket>(
        &mut self,
        packet: &P,
        mode: DeliveryMode,
    ) -> Result<usize, SessionError> {
        self.scratch.clear();
        encode(packet, &mut self.scratch)?;

        let mut delivered = 0;
        for &connection_id in self.connections.keys() {
            match self.transport.send(connection_id, &self.scratch, mode) {
                Ok(()) => delivered += 1,
                Err(e) => error!(
                    "Failed to broadcast {} to connection {}: {}",
                    P::TYPE.name(),
                    connection_id,
                    e
                ),
            }
        }

        debug!("📡 Broadcasted {} to {} connections", P::TYPE.name(), delivered);
        Ok(delivered)
    }

    pub(crate) fn transport_mut(&mut self) -> &mut dyn Transport {
        self.transport.as_mut()
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MemoryTransport, MemoryTransportHandle};
    use ttt_shared::{JoinFailReason, OnJoinFailed, Pong};

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn registry() -> (SessionRegistry, MemoryTransportHandle) {
        let (transport, handle) = MemoryTransport::new();
        (SessionRegistry::new(Box::new(transport)), handle)
    }

    #[test]
    fn test_add_then_get_connection() {
        let (mut sessions, _) = registry();
        sessions.add_connection(3, addr(5000)).unwrap();

        let connection = sessions.get_connection(3).unwrap();
        assert_eq!(connection.id, 3);
        assert_eq!(connection.remote_addr, addr(5000));
        assert!(connection.user.is_none());
    }

    #[test]
    fn test_duplicate_connection_is_rejected_and_original_kept() {
        let (mut sessions, _) = registry();
        sessions.add_connection(3, addr(5000)).unwrap();

        assert!(matches!(
            sessions.add_connection(3, addr(6000)),
            Err(SessionError::DuplicateConnection(3))
        ));
        assert_eq!(sessions.get_connection(3).unwrap().remote_addr, addr(5000));
        assert_eq!(sessions.connection_count(), 1);
    }

    #[test]
    fn test_get_unknown_connection() {
        let (sessions, _) = registry();
        assert!(matches!(
            sessions.get_connection(42),
            Err(SessionError::UnknownConnection(42))
        ));
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let (mut sessions, _) = registry();
        sessions.add_connection(1, addr(5000)).unwrap();

        assert!(sessions.disconnect(1).is_some());
        assert!(sessions.disconnect(1).is_none());
        assert!(sessions.disconnect(99).is_none());
        assert!(matches!(
            sessions.get_connection(1),
            Err(SessionError::UnknownConnection(1))
        ));
    }

    #[test]
    fn test_disconnect_forgets_user() {
        let (mut sessions, _) = registry();
        sessions.add_connection(1, addr(5000)).unwrap();
        sessions.set_user(1, User::new("alice")).unwrap();
        assert_eq!(sessions.connection_id_by_user_name("ALICE"), Some(1));

        sessions.disconnect(1);
        assert_eq!(sessions.connection_id_by_user_name("alice"), None);
        assert_eq!(sessions.users().count(), 0);
    }

    #[test]
    fn test_send_to_unknown_connection_performs_no_io() {
        let (mut sessions, handle) = registry();
        handle.connect(5, addr(5000));

        let result = sessions.send(5, &Pong { nonce: 1, sent_at_ms: 2 }, DeliveryMode::Unreliable);
        assert!(matches!(result, Err(SessionError::UnknownConnection(5))));
        assert!(handle.take_sent().is_empty());
    }

    #[test]
    fn test_send_encodes_tag_and_payload() {
        let (mut sessions, handle) = registry();
        handle.connect(5, addr(5000));
        sessions.add_connection(5, addr(5000)).unwrap();

        sessions
            .send(
                5,
                &OnJoinFailed { reason: JoinFailReason::NameTaken },
                DeliveryMode::ReliableOrdered,
            )
            .unwrap();

        let sent = handle.take_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].connection_id, 5);
        assert_eq!(sent[0].payload.as_ref(), [0x03, 0x02]);
        assert_eq!(sent[0].mode, DeliveryMode::ReliableOrdered);
    }

    #[test]
    fn test_kick_drops_peer_at_transport() {
        let (mut sessions, handle) = registry();
        handle.connect(2, addr(5000));
        sessions.add_connection(2, addr(5000)).unwrap();

        assert!(sessions.kick(2).is_some());
        assert!(!handle.is_peer_connected(2));
        assert!(!sessions.contains(2));
        assert!(sessions.kick(2).is_none());
    }

    #[test]
    fn test_broadcast_reaches_every_connection() {
        let (mut sessions, handle) = registry();
        for id in 1..=3 {
            handle.connect(id, addr(5000 + id as u16));
            sessions.add_connection(id, addr(5000 + id as u16)).unwrap();
        }

        let delivered = sessions
            .broadcast(&Pong { nonce: 9, sent_at_ms: 0 }, DeliveryMode::Unreliable)
            .unwrap();
        assert_eq!(delivered, 3);

        let mut ids: Vec<_> = handle.take_sent().iter().map(|d| d.connection_id).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
