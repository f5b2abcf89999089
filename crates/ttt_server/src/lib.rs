//! # TTT Server - Networking Core
//!
//! The transport-facing core of the Tic-Tac-Toe game server. It accepts UDP
//! peers, decodes tagged binary messages, routes each one to its handler and
//! tracks which live connection belongs to which user.
//!
//! ## Architecture Overview
//!
//! ### Core Components
//!
//! * **Type Registry** ([`PacketRegistry`]) - tag byte to packet decoder
//! * **Handler Registry** ([`HandlerRegistry`]) - tag byte to handler singleton
//! * **Session Registry** ([`SessionRegistry`]) - connection id to connection,
//!   user and the outbound send path
//! * **Dispatch Loop** ([`NetworkServer`]) - drains the transport and drives
//!   the other three
//!
//! ### Message Flow
//!
//! 1. The transport surfaces a `Received` event for a connection
//! 2. The first byte is read as the packet tag and its decoder resolved
//! 3. The rest of the payload is decoded and must be consumed exactly
//! 4. The handler for the tag is resolved and invoked with the packet, the
//!    connection id and the session registry
//! 5. Replies go out through [`SessionRegistry::send`]
//!
//! Any failure along the way, including a handler panic, drops that one
//! message with a warning. The connection stays up.
//!
//! ## Threading
//!
//! The dispatch loop runs on a single task. Handlers execute synchronously
//! inside [`NetworkServer::poll_events`] and must not block. The registries are
//! immutable once built; the session registry is only reachable through
//! `&mut`, which confines outbound encoding to the dispatch task.
//!
//! ## Example
//!
//! ```rust
//! use ttt_server::{MemoryTransport, NetworkServer, ServerConfig};
//!
//! let (transport, handle) = MemoryTransport::new();
//! let mut server = NetworkServer::new(ServerConfig::default(), Box::new(transport)).unwrap();
//!
//! handle.request_connection("127.0.0.1:5000".parse().unwrap());
//! server.poll_events(); // accepts the request
//! server.poll_events(); // registers the connection
//! assert_eq!(server.sessions().connection_count(), 1);
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod handlers;
pub mod messaging;
pub mod security;
pub mod server;
pub mod transport;
pub mod utils;


pub use config::{SecurityConfig, ServerConfig, TransportConfig, DEFAULT_PORT};
pub use connection::{Connection, ConnectionId, SessionRegistry, User};
pub use error::{DispatchError, HandlerError, ServerError, SessionError};
pub use messaging::{HandlerRegistry, PacketHandler, TypedPacketHandler};
pub use security::{AcceptAll, Admission, AdmissionPolicy, ConnectionLimits, RejectReason};
pub use server::{DispatchStats, NetworkServer};
pub use transport::{
    DisconnectReason, MemoryTransport, MemoryTransportHandle, SentDatagram, Transport,
    TransportError, TransportEvent, UdpTransport, PROTOCOL_ID,
};
pub use ttt_shared::{DeliveryMode, PacketRegistry};
pub use utils::{create_server, create_server_with_config};
