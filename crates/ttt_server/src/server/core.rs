//! Core network server implementation.
//!
//! This module contains the main `NetworkServer` struct: the registries built
//! at startup, the session registry that owns the transport, and the
//! admission policy consulted for new peers.

use crate::config::ServerConfig;
use crate::connection::{ConnectionId, SessionRegistry};
use crate::error::{ServerError, SessionError};
use crate::messaging::HandlerRegistry;
use crate::security::{policy_from_config, AdmissionPolicy};
use crate::server::DispatchStats;
use crate::transport::{Transport, UdpTransport};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info};
use ttt_shared::{DeliveryMode, NetPacket, PacketRegistry};

/// The dispatch loop.
///
/// `NetworkServer` is driven by the host process calling
/// [`poll_events`](Self::poll_events) on a fixed interval. Every event is
/// handled to completion on the calling task before the next one is looked
/// at, so handlers never run concurrently and the session registry needs no
/// locking.
///
/// # Architecture
///
/// * **Type registry**: tag to decoder, shared and immutable
/// * **Handler registry**: tag to handler singleton, shared and immutable
/// * **Session registry**: live connections, users and the outbound path
/// * **Admission policy**: accept or reject each connection request
///
/// # Failure Boundary
///
/// A message that cannot be decoded, has no handler, or whose handler fails
/// or panics is logged and dropped. The connection stays up and the loop
/// carries on with the next event.
#[derive(Debug)]
pub struct NetworkServer {
    /// Server configuration settings
    pub(super) config: ServerConfig,

    pub(super) packets: Arc<PacketRegistry>,
    pub(super) handlers: Arc<HandlerRegistry>,

    /// Live connections and the transport they are reached through
    pub(super) sessions: SessionRegistry,

    pub(super) admission: Box<dyn AdmissionPolicy>,
    /// Accepted peers whose `Connected` event has not arrived yet
    pub(super) pending_accepts: HashSet<ConnectionId>,
    pub(super) stats: DispatchStats,
}

impl NetworkServer {
    /// Creates a server over `transport` with the standard registries.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Registry`] if a registration table claims a tag
    /// twice.
    pub fn new(config: ServerConfig, transport: Box<dyn Transport>) -> Result<Self, ServerError> {
        let packets = Arc::new(PacketRegistry::standard()?);
        let handlers = Arc::new(HandlerRegistry::standard()?);
        Ok(Self::with_registries(config, transport, packets, handlers))
    }

    /// Creates a server with caller-supplied registries.
    pub fn with_registries(
        config: ServerConfig,
        transport: Box<dyn Transport>,
        packets: Arc<PacketRegistry>,
        handlers: Arc<HandlerRegistry>,
    ) -> Self {
        info!(
            "🧭 Dispatch ready: {} packet kinds, {} handlers",
            packets.len(),
            handlers.len()
        );
        let admission = policy_from_config(&config.security);
        Self {
            config,
            packets,
            handlers,
            sessions: SessionRegistry::new(transport),
            admission,
            pending_accepts: HashSet::new(),
            stats: DispatchStats::default(),
        }
    }

    /// Binds a [`UdpTransport`] on the configured address and builds the server.
    ///
    /// # Returns
    ///
    /// A server ready to be polled, or a `ServerError` if the socket could not
    /// be bound or the registries are misconfigured.
    pub fn start(config: ServerConfig) -> Result<Self, ServerError> {
        let addr = config.socket_addr();
        let transport = UdpTransport::bind(addr, config.transport.clone())
            .map_err(|e| ServerError::Network(format!("Failed to bind {addr}: {e}")))?;
        info!("🚀 Network server listening on {}", addr);
        Self::new(config, Box::new(transport))
    }

    /// Replaces the admission policy derived from the configuration.
    pub fn set_admission_policy(&mut self, policy: Box<dyn AdmissionPolicy>) {
        debug!("Admission policy set to {:?}", policy);
        self.admission = policy;
    }

    /// Drains the transport and handles every queued event.
    ///
    /// # Returns
    ///
    /// The number of events processed.
    pub fn poll_events(&mut self) -> usize {
        let events = self.sessions.transport_mut().poll();
        let count = events.len();
        for event in events {
            self.handle_event(event);
        }
        self.sessions.transport_mut().flush();
        count
    }

    /// Sends a packet to one client through the session registry.
    pub fn send_client<P: NetPacket>(
        &mut self,
        connection_id: ConnectionId,
        packet: &P,
        mode: DeliveryMode,
    ) -> Result<(), SessionError> {
        self.sessions.send(connection_id, packet, mode)
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn sessions_mut(&mut self) -> &mut SessionRegistry {
        &mut self.sessions
    }

    pub fn packet_registry(&self) -> &Arc<PacketRegistry> {
        &self.packets
    }

    pub fn handler_registry(&self) -> &Arc<HandlerRegistry> {
        &self.handlers
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Address the transport is bound to, if it has one.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.sessions.transport().local_addr()
    }

    /// Disconnects every connection, pending or registered, and clears the
    /// session registry.
    ///
    /// # Returns
    ///
    /// The number of connections dropped.
    pub fn shutdown(&mut self) -> usize {
        for connection_id in self.pending_accepts.drain() {
            self.sessions.transport_mut().disconnect(connection_id);
        }

        let ids = self.sessions.connection_ids();
        let mut dropped = 0;
        for connection_id in ids {
            if self.sessions.kick(connection_id).is_some() {
                dropped += 1;
            }
        }
        self.stats.disconnects += dropped as u64;
        info!("🛑 Network server shut down, {} connections dropped ({})", dropped, self.stats);
        dropped
    }
}
