//! Connectionless transport consumed by the dispatch loop.
//!
//! A transport surfaces queued [`TransportEvent`]s from [`Transport::poll`] and
//! offers per-peer sends with a selectable [`DeliveryMode`]. The host process
//! must call `poll` periodically; nothing is delivered in between.
//!
//! Two implementations ship with the server:
//!
//! * [`UdpTransport`] - the production transport, renet channels over netcode
//! * [`MemoryTransport`] - an in-process transport driven through a handle

use crate::connection::ConnectionId;
use bytes::Bytes;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use ttt_shared::DeliveryMode;

pub mod memory;
pub mod udp;

pub use memory::{MemoryTransport, MemoryTransportHandle, SentDatagram};
pub use udp::{UdpTransport, PROTOCOL_ID};

/// Why a peer went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The peer announced it is leaving
    RemoteDisconnect,
    /// The peer stopped answering
    Timeout,
    /// This side asked the transport to drop the peer
    LocalDisconnect,
    /// The peer broke the channel protocol
    ProtocolError,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::RemoteDisconnect => f.write_str("remote disconnect"),
            DisconnectReason::Timeout => f.write_str("timeout"),
            DisconnectReason::LocalDisconnect => f.write_str("local disconnect"),
            DisconnectReason::ProtocolError => f.write_str("protocol error"),
        }
    }
}

/// Discrete event surfaced by [`Transport::poll`].
#[derive(Debug)]
pub enum TransportEvent {
    /// A peer asks to connect; answer with `accept` or `reject`
    ConnectionRequest { remote: SocketAddr },
    /// A peer completed the handshake
    Connected {
        connection_id: ConnectionId,
        remote: SocketAddr,
    },
    /// A peer is gone
    Disconnected {
        connection_id: ConnectionId,
        remote: SocketAddr,
        reason: DisconnectReason,
    },
    /// One message from a connected peer
    Received {
        connection_id: ConnectionId,
        payload: Bytes,
        mode: DeliveryMode,
    },
    /// A datagram from an address with no connection
    ReceivedUnconnected { remote: SocketAddr, payload: Bytes },
    /// Socket-level failure
    NetworkError {
        remote: Option<SocketAddr>,
        error: io::Error,
    },
    /// Fresh round-trip measurement for a peer
    LatencyUpdate {
        connection_id: ConnectionId,
        latency: Duration,
    },
}

/// Errors returned by transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Unknown peer {0}")]
    UnknownPeer(ConnectionId),

    #[error("No pending connection request from {0}")]
    NoPendingRequest(SocketAddr),

    #[error("Payload of {len} bytes exceeds the maximum of {max}")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("Send channel is full for peer {0}")]
    ChannelFull(ConnectionId),
}

/// Peer-addressed, connectionless transport.
pub trait Transport: Send + fmt::Debug {
    /// Drains every event queued since the previous call.
    fn poll(&mut self) -> Vec<TransportEvent>;

    /// Accepts a pending connection request and assigns the connection id.
    ///
    /// The matching [`TransportEvent::Connected`] is surfaced by a later `poll`.
    fn accept(&mut self, remote: SocketAddr) -> Result<ConnectionId, TransportError>;

    /// Refuses a pending connection request. Unknown addresses are ignored.
    fn reject(&mut self, remote: SocketAddr);

    /// Sends one message to a connected peer.
    fn send(
        &mut self,
        connection_id: ConnectionId,
        payload: &[u8],
        mode: DeliveryMode,
    ) -> Result<(), TransportError>;

    /// Pushes queued outbound traffic onto the wire. Called once per dispatch pass.
    fn flush(&mut self) {}

    /// Drops a peer. Unknown ids are ignored.
    fn disconnect(&mut self, connection_id: ConnectionId);

    /// Address the transport is bound to, if it has one.
    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }
}
