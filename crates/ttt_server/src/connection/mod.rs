//! Connection management for client connections.
//!
//! This module tracks the lifecycle of transport peers, the logical user each
//! one joins as, and the outbound send path back to them.

pub mod client;
pub mod manager;

pub use client::{Connection, User};
pub use manager::SessionRegistry;

/// Type alias for connection identifiers.
///
/// Connection IDs are assigned by the transport and stay stable for the
/// lifetime of a connection.
pub type ConnectionId = usize;
