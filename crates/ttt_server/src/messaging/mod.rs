//! Message handling and routing for inbound packets.
//!
//! This module provides the handler registry and the per-message pipeline
//! that takes a raw payload from the transport to the handler for its tag.

pub mod registry;
pub mod router;

pub use registry::{
    HandlerRegistry, HandlerRegistryBuilder, PacketHandler, Typed, TypedPacketHandler,
};
pub use router::route_packet;
