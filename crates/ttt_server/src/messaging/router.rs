//! Message routing logic for dispatching inbound packets to handlers.
//!
//! This module takes one raw message from the transport through tag lookup,
//! decoding and handler resolution, and runs the handler inside a panic
//! boundary so a single bad message can never take the dispatch loop down.

use super::HandlerRegistry;
use crate::connection::{ConnectionId, SessionRegistry};
use crate::error::{DispatchError, HandlerError};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::trace;
use ttt_shared::{DecodeError, PacketReader, PacketRegistry};

/// Routes one raw message to the handler registered for its tag.
///
/// # Arguments
///
/// * `payload` - The raw message: one tag byte followed by the packet payload
/// * `connection_id` - The connection the message arrived on
/// * `packets` - Type registry used to decode the payload
/// * `handlers` - Handler registry used to resolve the handler
/// * `sessions` - Session registry handed to the handler
///
/// # Returns
///
/// The tag of the handled message, or the reason the message was dropped.
///
/// # Message Flow
///
/// 1. Reject messages for connections the session registry does not hold
/// 2. Read the tag byte and resolve its decoder
/// 3. Decode the payload, which must be consumed exactly
/// 4. Resolve the handler for the tag
/// 5. Invoke the handler, converting a panic into [`HandlerError::Panicked`]
pub fn route_packet(
    payload: &[u8],
    connection_id: ConnectionId,
    packets: &PacketRegistry,
    handlers: &HandlerRegistry,
    sessions: &mut SessionRegistry,
) -> Result<u8, DispatchError> {
    if !sessions.contains(connection_id) {
        return Err(DispatchError::UnknownConnection(connection_id));
    }

    let (&tag, body) = payload.split_first().ok_or(DecodeError::MissingTag)?;
    let decode = packets.resolve_decoder(tag)?;

    let mut reader = PacketReader::new(body);
    let packet = decode(&mut reader)?;
    reader.finish()?;

    let handler = handlers.resolve_handler(tag)?;
    trace!("📨 Routing {:?} from connection {}", packet.packet_type(), connection_id);

    panic::catch_unwind(AssertUnwindSafe(|| {
        handler.handle(packet, connection_id, sessions)
    }))
    .unwrap_or_else(|panic| Err(HandlerError::Panicked(panic_message(panic.as_ref()))))?;

    Ok(tag)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
