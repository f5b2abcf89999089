//! Packet handlers for client-to-server messages.
//!
//! Each handler is a unit struct registered once in the
//! [`HandlerRegistry`](crate::messaging::HandlerRegistry); all per-message
//! state arrives as arguments.

mod join;
mod ping;
mod status;

pub use join::{validate_user_name, JoinHandler, MAX_USER_NAME_CHARS};
pub use ping::PingHandler;
pub use status::{ServerStatusHandler, MAX_LISTED_USERS};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::connection::{ConnectionId, SessionRegistry};
    use crate::transport::{MemoryTransport, MemoryTransportHandle};
    use bytes::Bytes;
    use ttt_shared::{Packet, PacketReader, PacketRegistry};

    /// Session registry with the given connections registered on both sides.
    pub fn sessions_with(ids: &[ConnectionId]) -> (SessionRegistry, MemoryTransportHandle) {
        let (transport, handle) = MemoryTransport::new();
        let mut sessions = SessionRegistry::new(Box::new(transport));
        for &id in ids {
            let addr = std::net::SocketAddr::from(([127, 0, 0, 1], 4000 + id as u16));
            handle.connect(id, addr);
            sessions.add_connection(id, addr).unwrap();
        }
        (sessions, handle)
    }

    pub fn decode(payload: &Bytes) -> Packet {
        let registry = PacketRegistry::standard().unwrap();
        let decode = registry.resolve_decoder(payload[0]).unwrap();
        let mut reader = PacketReader::new(&payload[1..]);
        let packet = decode(&mut reader).unwrap();
        reader.finish().unwrap();
        packet
    }
}
