//! Tag to handler registry.
//!
//! Handlers are stateless singletons registered once at startup from an
//! explicit table. Everything a handler needs for one message (the packet,
//! the connection id and the session registry) is passed in per call.

use crate::connection::{ConnectionId, SessionRegistry};
use crate::error::HandlerError;
use crate::handlers::{JoinHandler, PingHandler, ServerStatusHandler};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use ttt_shared::{NetPacket, Packet, RegistryError};

/// Processes one decoded packet for one connection.
pub trait PacketHandler: Send + Sync + 'static {
    fn handle(
        &self,
        packet: Packet,
        connection_id: ConnectionId,
        sessions: &mut SessionRegistry,
    ) -> Result<(), HandlerError>;
}

/// Handler bound to a single concrete packet kind.
///
/// Register it with [`HandlerRegistryBuilder::register`]; the registry wraps it
/// so the packet arrives already unpacked from [`Packet`].
pub trait TypedPacketHandler: Send + Sync + 'static {
    type Packet: NetPacket + TryFrom<Packet, Error = Packet>;

    fn handle(
        &self,
        packet: Self::Packet,
        connection_id: ConnectionId,
        sessions: &mut SessionRegistry,
    ) -> Result<(), HandlerError>;
}

/// Adapts a [`TypedPacketHandler`] to [`PacketHandler`].
pub struct Typed<H>(pub H);

impl<H: TypedPacketHandler> PacketHandler for Typed<H> {
    fn handle(
        &self,
        packet: Packet,
        connection_id: ConnectionId,
        sessions: &mut SessionRegistry,
    ) -> Result<(), HandlerError> {
        let packet = H::Packet::try_from(packet).map_err(|other| HandlerError::UnexpectedPacket {
            expected: H::Packet::TYPE,
            actual: other.packet_type(),
        })?;
        TypedPacketHandler::handle(&self.0, packet, connection_id, sessions)
    }
}

struct HandlerEntry {
    name: &'static str,
    handler: Arc<dyn PacketHandler>,
}

/// Immutable map from tag byte to handler.
#[derive(Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<u8, Arc<HandlerEntry>>,
}

impl HandlerRegistry {
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    /// Registry with a handler for every client-to-server packet.
    pub fn standard() -> Result<Self, RegistryError> {
        Self::builder()
            .register(JoinHandler)
            .register(ServerStatusHandler)
            .register(PingHandler)
            .build()
    }

    /// Looks up the handler for `tag`.
    pub fn resolve_handler(&self, tag: u8) -> Result<&dyn PacketHandler, RegistryError> {
        self.handlers
            .get(&tag)
            .map(|entry| entry.handler.as_ref())
            .ok_or(RegistryError::UnregisteredTag(tag))
    }

    pub fn name_of(&self, tag: u8) -> Option<&'static str> {
        self.handlers.get(&tag).map(|entry| entry.name)
    }

    pub fn contains(&self, tag: u8) -> bool {
        self.handlers.contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.handlers.iter().map(|(tag, e)| (*tag, e.name)).collect();
        tags.sort_unstable();
        f.debug_struct("HandlerRegistry").field("handlers", &tags).finish()
    }
}

/// Collects handler registrations and reports the first duplicate tag on
/// [`build`](Self::build).
#[derive(Default)]
pub struct HandlerRegistryBuilder {
    handlers: HashMap<u8, Arc<HandlerEntry>>,
    duplicate: Option<RegistryError>,
}

impl HandlerRegistryBuilder {
    /// Registers `handler` under the tag of the packet kind it accepts.
    pub fn register<H: TypedPacketHandler>(self, handler: H) -> Self {
        let kind = <H::Packet as NetPacket>::TYPE;
        self.register_handler(kind.tag(), kind.name(), Arc::new(Typed(handler)))
    }

    /// Registers a handler under an explicit tag.
    pub fn register_handler(
        mut self,
        tag: u8,
        name: &'static str,
        handler: Arc<dyn PacketHandler>,
    ) -> Self {
        if self.duplicate.is_some() {
            return self;
        }
        if let Some(existing) = self.handlers.get(&tag) {
            self.duplicate = Some(RegistryError::DuplicateTag {
                tag,
                existing: existing.name,
                duplicate: name,
            });
            return self;
        }
        debug!("🧩 Registered handler for packet 0x{:02X} ({})", tag, name);
        self.handlers.insert(tag, Arc::new(HandlerEntry { name, handler }));
        self
    }

    pub fn build(self) -> Result<HandlerRegistry, RegistryError> {
        match self.duplicate {
            Some(err) => Err(err),
            None => Ok(HandlerRegistry {
                handlers: self.handlers,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;
    use ttt_shared::{JoinRequest, PacketType, Pong};

    struct Recorder;

    impl TypedPacketHandler for Recorder {
        type Packet = Pong;

        fn handle(
            &self,
            _packet: Pong,
            _connection_id: ConnectionId,
            _sessions: &mut SessionRegistry,
        ) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    fn sessions() -> SessionRegistry {
        let (transport, _) = MemoryTransport::new();
        SessionRegistry::new(Box::new(transport))
    }

    #[test]
    fn test_standard_registry_handles_client_packets_only() {
        let registry = HandlerRegistry::standard().expect("no duplicate tags");
        assert_eq!(registry.len(), 3);
        for kind in [PacketType::JoinRequest, PacketType::ServerStatusRequest, PacketType::Ping] {
            assert!(registry.resolve_handler(kind.tag()).is_ok(), "{} missing", kind.name());
        }
        for kind in [PacketType::OnJoin, PacketType::OnServerStatus, PacketType::Pong] {
            assert_eq!(
                registry.resolve_handler(kind.tag()).err(),
                Some(RegistryError::UnregisteredTag(kind.tag()))
            );
        }
    }

    #[test]
    fn test_duplicate_handler_fails_build() {
        let result = HandlerRegistry::builder()
            .register(Recorder)
            .register(Recorder)
            .build();
        assert_eq!(
            result.err(),
            Some(RegistryError::DuplicateTag {
                tag: PacketType::Pong.tag(),
                existing: "Pong",
                duplicate: "Pong",
            })
        );
    }

    #[test]
    fn test_resolution_returns_the_same_singleton() {
        let registry = HandlerRegistry::builder().register(Recorder).build().unwrap();
        let first = std::ptr::from_ref(registry.resolve_handler(PacketType::Pong.tag()).unwrap());
        let second = std::ptr::from_ref(registry.resolve_handler(PacketType::Pong.tag()).unwrap());
        assert_eq!(first.cast::<()>(), second.cast::<()>());
    }

    #[test]
    fn test_typed_wrapper_rejects_wrong_packet_kind() {
        let registry = HandlerRegistry::builder().register(Recorder).build().unwrap();
        let handler = registry.resolve_handler(PacketType::Pong.tag()).unwrap();
        let mut sessions = sessions();

        let result = handler.handle(
            Packet::JoinRequest(JoinRequest { user_name: "bob".into() }),
            1,
            &mut sessions,
        );
        assert!(matches!(
            result,
            Err(HandlerError::UnexpectedPacket {
                expected: PacketType::Pong,
                actual: PacketType::JoinRequest,
            })
        ));

        let ok = handler.handle(Packet::Pong(Pong { nonce: 0, sent_at_ms: 0 }), 1, &mut sessions);
        assert!(ok.is_ok());
    }
}
