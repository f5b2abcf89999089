//! Tag to decoder registry.
//!
//! The set of packet kinds is closed: [`PacketRegistry::standard`] registers
//! every kind explicitly and fails on a duplicate tag, so a misconfigured
//! build is caught at startup rather than on the first unlucky message. Once
//! built the registry is never mutated and can be shared freely behind an
//! `Arc`.

use crate::codec::PacketReader;
use crate::error::{DecodeError, RegistryError};
use crate::packets::{
    JoinRequest, NetPacket, OnJoin, OnJoinFailed, OnServerStatus, Packet, Ping, Pong,
    ServerStatusRequest,
};
use std::collections::HashMap;
use tracing::debug;

/// Decodes a payload (tag already consumed) into a [`Packet`].
pub type PacketDecoder = fn(&mut PacketReader<'_>) -> Result<Packet, DecodeError>;

fn decode_as<P: NetPacket>(reader: &mut PacketReader<'_>) -> Result<Packet, DecodeError> {
    P::deserialize(reader).map(Into::into)
}

#[derive(Debug, Clone, Copy)]
struct DecoderEntry {
    name: &'static str,
    decode: PacketDecoder,
}

/// Immutable map from tag byte to decoder.
#[derive(Debug, Clone)]
pub struct PacketRegistry {
    decoders: HashMap<u8, DecoderEntry>,
}

impl PacketRegistry {
    pub fn builder() -> PacketRegistryBuilder {
        PacketRegistryBuilder::default()
    }

    /// Registry holding every packet kind this protocol defines.
    pub fn standard() -> Result<Self, RegistryError> {
        Self::builder()
            .register::<JoinRequest>()
            .register::<OnJoin>()
            .register::<OnJoinFailed>()
            .register::<ServerStatusRequest>()
            .register::<OnServerStatus>()
            .register::<Ping>()
            .register::<Pong>()
            .build()
    }

    /// Looks up the decoder for `tag`.
    pub fn resolve_decoder(&self, tag: u8) -> Result<PacketDecoder, RegistryError> {
        self.decoders
            .get(&tag)
            .map(|entry| entry.decode)
            .ok_or(RegistryError::UnregisteredTag(tag))
    }

    /// Name the tag was registered under, for diagnostics.
    pub fn name_of(&self, tag: u8) -> Option<&'static str> {
        self.decoders.get(&tag).map(|entry| entry.name)
    }

    pub fn contains(&self, tag: u8) -> bool {
        self.decoders.contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }
}

/// Collects registrations and reports the first duplicate tag on [`build`](Self::build).
#[derive(Debug, Default)]
pub struct PacketRegistryBuilder {
    decoders: HashMap<u8, DecoderEntry>,
    duplicate: Option<RegistryError>,
}

impl PacketRegistryBuilder {
    pub fn register<P: NetPacket>(self) -> Self {
        self.register_decoder(P::TYPE.tag(), P::TYPE.name(), decode_as::<P>)
    }

    /// Registers a decoder under an explicit tag.
    pub fn register_decoder(mut self, tag: u8, name: &'static str, decode: PacketDecoder) -> Self {
        if self.duplicate.is_some() {
            return self;
        }
        if let Some(existing) = self.decoders.get(&tag) {
            self.duplicate = Some(RegistryError::DuplicateTag {
                tag,
                existing: existing.name,
                duplicate: name,
            });
            return self;
        }
        debug!("📦 Registered packet 0x{:02X} ({})", tag, name);
        self.decoders.insert(tag, DecoderEntry { name, decode });
        self
    }

    pub fn build(self) -> Result<PacketRegistry, RegistryError> {
        match self.duplicate {
            Some(err) => Err(err),
            None => Ok(PacketRegistry {
                decoders: self.decoders,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::{encode, PacketType};
    use bytes::BytesMut;

    #[test]
    fn test_standard_registry_covers_every_packet_type() {
        let registry = PacketRegistry::standard().expect("no duplicate tags");
        assert_eq!(registry.len(), PacketType::ALL.len());
        for kind in PacketType::ALL {
            assert!(registry.resolve_decoder(kind.tag()).is_ok(), "{} missing", kind.name());
            assert_eq!(registry.name_of(kind.tag()), Some(kind.name()));
        }
    }

    #[test]
    fn test_unregistered_tag() {
        let registry = PacketRegistry::standard().unwrap();
        assert_eq!(
            registry.resolve_decoder(0xFF).err(),
            Some(RegistryError::UnregisteredTag(0xFF))
        );
        assert!(!registry.contains(0x00));
    }

    #[test]
    fn test_resolution_is_stable() {
        let registry = PacketRegistry::standard().unwrap();
        let mut buf = BytesMut::new();
        encode(&Ping { nonce: 9, sent_at_ms: 3 }, &mut buf).unwrap();

        for _ in 0..3 {
            let decode = registry.resolve_decoder(PacketType::Ping.tag()).unwrap();
            let mut reader = PacketReader::new(&buf[1..]);
            assert_eq!(
                decode(&mut reader).unwrap(),
                Packet::Ping(Ping { nonce: 9, sent_at_ms: 3 })
            );
        }
    }

    #[test]
    fn test_duplicate_tag_fails_build() {
        let result = PacketRegistry::builder()
            .register::<Ping>()
            .register_decoder(PacketType::Ping.tag(), "Impostor", decode_as::<Pong>)
            .build();

        assert_eq!(
            result.err(),
            Some(RegistryError::DuplicateTag {
                tag: PacketType::Ping.tag(),
                existing: "Ping",
                duplicate: "Impostor",
            })
        );
    }

    #[test]
    fn test_registering_the_same_packet_twice_fails() {
        let result = PacketRegistry::builder()
            .register::<JoinRequest>()
            .register::<JoinRequest>()
            .build();
        assert!(matches!(result, Err(RegistryError::DuplicateTag { tag: 0x01, .. })));
    }
}
