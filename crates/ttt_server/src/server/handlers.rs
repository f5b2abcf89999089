//! Per-event handling for the dispatch loop.
//!
//! Each transport event maps to one `on_*` method. None of them return
//! errors: failures are logged and counted, and the loop moves on.

use super::core::NetworkServer;
use crate::connection::ConnectionId;
use crate::messaging::route_packet;
use crate::security::Admission;
use crate::transport::{DisconnectReason, TransportEvent};
use bytes::Bytes;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, info, trace, warn};
use ttt_shared::DeliveryMode;

impl NetworkServer {
    pub(super) fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::ConnectionRequest { remote } => self.on_connection_request(remote),
            TransportEvent::Connected {
                connection_id,
                remote,
            } => self.on_peer_connected(connection_id, remote),
            TransportEvent::Disconnected {
                connection_id,
                remote,
                reason,
            } => self.on_peer_disconnected(connection_id, remote, reason),
            TransportEvent::Received {
                connection_id,
                payload,
                mode,
            } => self.on_network_receive(connection_id, payload, mode),
            TransportEvent::ReceivedUnconnected { remote, payload } => {
                self.on_receive_unconnected(remote, payload)
            }
            TransportEvent::NetworkError { remote, error } => self.on_network_error(remote, error),
            TransportEvent::LatencyUpdate {
                connection_id,
                latency,
            } => self.on_latency_update(connection_id, latency),
        }
    }

    fn on_connection_request(&mut self, remote: SocketAddr) {
        // Accepted peers count against capacity before their Connected arrives
        let active = self.sessions.connection_count() + self.pending_accepts.len();
        match self.admission.admit(remote, active) {
            Admission::Accept => match self.sessions.transport_mut().accept(remote) {
                Ok(connection_id) => {
                    self.pending_accepts.insert(connection_id);
                    self.stats.connections_accepted += 1;
                    debug!("✅ Accepted {} as connection {}", remote, connection_id);
                }
                Err(e) => warn!("Could not accept connection from {}: {}", remote, e),
            },
            Admission::Reject(reason) => {
                self.sessions.transport_mut().reject(remote);
                self.stats.connections_rejected += 1;
                info!("🚫 Rejected connection from {}: {}", remote, reason);
            }
        }
    }

    fn on_peer_connected(&mut self, connection_id: ConnectionId, remote: SocketAddr) {
        self.pending_accepts.remove(&connection_id);
        // A duplicate is logged by the registry; the original entry stays
        let _ = self.sessions.add_connection(connection_id, remote);
    }

    fn on_peer_disconnected(
        &mut self,
        connection_id: ConnectionId,
        remote: SocketAddr,
        reason: DisconnectReason,
    ) {
        self.pending_accepts.remove(&connection_id);
        match self.sessions.get_connection(connection_id) {
            Ok(connection) => debug!(
                "Connection {} ({}, user {:?}) lost: {}",
                connection_id,
                remote,
                connection.user_name(),
                reason
            ),
            Err(_) => debug!("Untracked peer {} ({}) lost: {}", connection_id, remote, reason),
        }

        self.sessions.transport_mut().disconnect(connection_id);
        if self.sessions.disconnect(connection_id).is_some() {
            self.stats.disconnects += 1;
        }
    }

    fn on_network_receive(
        &mut self,
        connection_id: ConnectionId,
        payload: Bytes,
        mode: DeliveryMode,
    ) {
        match route_packet(
            &payload,
            connection_id,
            &self.packets,
            &self.handlers,
            &mut self.sessions,
        ) {
            Ok(tag) => {
                self.stats.messages_handled += 1;
                trace!(
                    "Handled 0x{:02X} ({} bytes, {}) from connection {}",
                    tag,
                    payload.len(),
                    mode,
                    connection_id
                );
            }
            Err(e) => {
                self.stats.messages_dropped += 1;
                match payload.first() {
                    Some(tag) => warn!(
                        "⚠️ Dropped message 0x{:02X} from connection {}: {}",
                        tag, connection_id, e
                    ),
                    None => warn!(
                        "⚠️ Dropped empty message from connection {}: {}",
                        connection_id, e
                    ),
                }
            }
        }
    }

    fn on_receive_unconnected(&mut self, remote: SocketAddr, payload: Bytes) {
        debug!("Ignoring {} byte datagram from unconnected {}", payload.len(), remote);
    }

    fn on_network_error(&mut self, remote: Option<SocketAddr>, error: io::Error) {
        self.stats.network_errors += 1;
        match remote {
            Some(remote) => warn!("🌐 Network error with {}: {}", remote, error),
            None => warn!("🌐 Network error: {}", error),
        }
    }

    fn on_latency_update(&mut self, connection_id: ConnectionId, latency: Duration) {
        trace!("📶 Connection {} latency {:?}", connection_id, latency);
    }
}
