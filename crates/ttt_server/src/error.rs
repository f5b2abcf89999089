//! Error types and handling for the game server.
//!
//! Errors are split by the layer that produces them so the dispatch loop can
//! tell a malformed message apart from a failing handler when it logs a drop.
//! None of the per-message errors ever escape the dispatch loop.

use crate::connection::ConnectionId;
use crate::transport::TransportError;
use ttt_shared::{DecodeError, EncodeError, PacketType, RegistryError};

/// Enumeration of possible server errors.
///
/// These are startup failures: binding the socket, or a registry table that
/// claims the same tag twice.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Network-related errors such as binding failures
    #[error("Network error: {0}")]
    Network(String),

    /// A registry could not be built from its static table
    #[error("Registry configuration error: {0}")]
    Registry(#[from] RegistryError),
}

/// Failures reported by the session registry to its callers.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The connection id is not registered (never connected, or already gone)
    #[error("Unknown connection {0}")]
    UnknownConnection(ConnectionId),

    /// The connection id is already registered
    #[error("Connection {0} is already registered")]
    DuplicateConnection(ConnectionId),

    /// The outbound packet could not be encoded
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    /// The transport refused the outbound datagram
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Failures raised while a handler processes a packet.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The handler was registered for a different packet kind
    #[error("Handler expected {expected:?} but received {actual:?}")]
    UnexpectedPacket {
        expected: PacketType,
        actual: PacketType,
    },

    /// A session registry operation failed
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The handler panicked; the panic was contained at the dispatch boundary
    #[error("Handler panicked: {0}")]
    Panicked(String),

    /// Any other handler-specific failure
    #[error("Handler failed: {0}")]
    Failed(String),
}

/// Why a single inbound message was dropped.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The message arrived for a connection that is not registered
    #[error("Message from unknown connection {0}")]
    UnknownConnection(ConnectionId),

    /// No decoder or no handler exists for the tag
    #[error(transparent)]
    Unregistered(#[from] RegistryError),

    /// The payload did not match its declared kind
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The handler failed
    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),
}
