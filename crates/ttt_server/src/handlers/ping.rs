//! Keepalive echo for `Ping`.

use crate::connection::{ConnectionId, SessionRegistry};
use crate::error::HandlerError;
use crate::messaging::TypedPacketHandler;
use ttt_shared::{DeliveryMode, Ping, Pong};

/// Echoes a [`Ping`] back as an unreliable [`Pong`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PingHandler;

impl TypedPacketHandler for PingHandler {
    type Packet = Ping;

    fn handle(
        &self,
        ping: Ping,
        connection_id: ConnectionId,
        sessions: &mut SessionRegistry,
    ) -> Result<(), HandlerError> {
        let pong = Pong {
            nonce: ping.nonce,
            sent_at_ms: ping.sent_at_ms,
        };
        sessions.send(connection_id, &pong, DeliveryMode::Unreliable)?;
        Ok(())
    }
}
