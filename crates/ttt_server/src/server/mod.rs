//! Dispatch loop driving the transport.
//!
//! This module contains the [`NetworkServer`], which drains transport events,
//! applies admission control, keeps the session registry in step with the
//! transport and routes every inbound message to its handler.

pub mod core;
mod handlers;
pub mod stats;

pub use self::core::NetworkServer;
pub use stats::DispatchStats;
