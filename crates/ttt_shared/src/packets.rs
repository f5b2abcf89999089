//! Packet kinds exchanged between server and clients.
//!
//! Each packet is a plain struct implementing [`NetPacket`], which ties it to
//! its wire tag and its codec. The [`Packet`] enum is the decoded form handed
//! to server handlers.

use crate::codec::{PacketReader, PacketWriter};
use crate::error::{DecodeError, EncodeError};
use bytes::BytesMut;

/// Wire tag of every packet kind. The discriminant is the tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PacketType {
    JoinRequest = 0x01,
    OnJoin = 0x02,
    OnJoinFailed = 0x03,
    ServerStatusRequest = 0x04,
    OnServerStatus = 0x05,
    Ping = 0x06,
    Pong = 0x07,
}

impl PacketType {
    /// Every packet kind, in tag order.
    pub const ALL: [PacketType; 7] = [
        PacketType::JoinRequest,
        PacketType::OnJoin,
        PacketType::OnJoinFailed,
        PacketType::ServerStatusRequest,
        PacketType::OnServerStatus,
        PacketType::Ping,
        PacketType::Pong,
    ];

    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    pub fn name(self) -> &'static str {
        match self {
            PacketType::JoinRequest => "JoinRequest",
            PacketType::OnJoin => "OnJoin",
            PacketType::OnJoinFailed => "OnJoinFailed",
            PacketType::ServerStatusRequest => "ServerStatusRequest",
            PacketType::OnServerStatus => "OnServerStatus",
            PacketType::Ping => "Ping",
            PacketType::Pong => "Pong",
        }
    }
}

/// A packet kind with a fixed tag and its own field codec.
pub trait NetPacket: Sized + Into<Packet> {
    /// Tag written in front of the payload.
    const TYPE: PacketType;

    /// Writes the payload (without the tag).
    fn serialize(&self, writer: &mut PacketWriter<'_>) -> Result<(), EncodeError>;

    /// Reads the payload (the tag has already been consumed).
    fn deserialize(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError>;
}

/// Appends `tag + payload` for `packet` to `buf`.
///
/// On error `buf` is truncated back to its length before the call.
pub fn encode<P: NetPacket>(packet: &P, buf: &mut BytesMut) -> Result<(), EncodeError> {
    let start = buf.len();
    let mut writer = PacketWriter::new(buf);
    writer.put_u8(P::TYPE.tag());
    if let Err(e) = packet.serialize(&mut writer) {
        buf.truncate(start);
        return Err(e);
    }
    Ok(())
}

macro_rules! packet_enum {
    ($($variant:ident),+ $(,)?) => {
        /// A decoded packet of any kind.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum Packet {
            $($variant($variant)),+
        }

        impl Packet {
            pub fn packet_type(&self) -> PacketType {
                match self {
                    $(Packet::$variant(_) => <$variant as NetPacket>::TYPE),+
                }
            }
        }

        $(
            impl From<$variant> for Packet {
                fn from(packet: $variant) -> Self {
                    Packet::$variant(packet)
                }
            }

            impl TryFrom<Packet> for $variant {
                type Error = Packet;

                fn try_from(packet: Packet) -> Result<Self, Self::Error> {
                    match packet {
                        Packet::$variant(inner) => Ok(inner),
                        other => Err(other),
                    }
                }
            }
        )+
    };
}

packet_enum!(
    JoinRequest,
    OnJoin,
    OnJoinFailed,
    ServerStatusRequest,
    OnServerStatus,
    Ping,
    Pong,
);

/// Client asks to attach a user name to its connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub user_name: String,
}

impl NetPacket for JoinRequest {
    const TYPE: PacketType = PacketType::JoinRequest;

    fn serialize(&self, writer: &mut PacketWriter<'_>) -> Result<(), EncodeError> {
        writer.put_str("user_name", &self.user_name)
    }

    fn deserialize(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            user_name: reader.read_string("user_name")?,
        })
    }
}

/// Server confirms a join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnJoin {
    pub user_id: String,
    pub user_name: String,
}

impl NetPacket for OnJoin {
    const TYPE: PacketType = PacketType::OnJoin;

    fn serialize(&self, writer: &mut PacketWriter<'_>) -> Result<(), EncodeError> {
        writer.put_str("user_id", &self.user_id)?;
        writer.put_str("user_name", &self.user_name)
    }

    fn deserialize(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            user_id: reader.read_string("user_id")?,
            user_name: reader.read_string("user_name")?,
        })
    }
}

/// Why a join was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum JoinFailReason {
    InvalidName = 1,
    NameTaken = 2,
    AlreadyJoined = 3,
}

impl TryFrom<u8> for JoinFailReason {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(JoinFailReason::InvalidName),
            2 => Ok(JoinFailReason::NameTaken),
            3 => Ok(JoinFailReason::AlreadyJoined),
            other => Err(DecodeError::InvalidValue {
                field: "reason",
                value: other as u64,
            }),
        }
    }
}

/// Server refuses a join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnJoinFailed {
    pub reason: JoinFailReason,
}

impl NetPacket for OnJoinFailed {
    const TYPE: PacketType = PacketType::OnJoinFailed;

    fn serialize(&self, writer: &mut PacketWriter<'_>) -> Result<(), EncodeError> {
        writer.put_u8(self.reason as u8);
        Ok(())
    }

    fn deserialize(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            reason: JoinFailReason::try_from(reader.read_u8()?)?,
        })
    }
}

/// Client asks who is online. Carries no payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerStatusRequest;

impl NetPacket for ServerStatusRequest {
    const TYPE: PacketType = PacketType::ServerStatusRequest;

    fn serialize(&self, _writer: &mut PacketWriter<'_>) -> Result<(), EncodeError> {
        Ok(())
    }

    fn deserialize(_reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self)
    }
}

/// Server reports the joined users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnServerStatus {
    pub players_online: u16,
    pub user_names: Vec<String>,
}

impl NetPacket for OnServerStatus {
    const TYPE: PacketType = PacketType::OnServerStatus;

    fn serialize(&self, writer: &mut PacketWriter<'_>) -> Result<(), EncodeError> {
        writer.put_u16(self.players_online);
        writer.put_str_list("user_names", &self.user_names)
    }

    fn deserialize(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            players_online: reader.read_u16()?,
            user_names: reader.read_string_list("user_names")?,
        })
    }
}

/// Application-level round-trip check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ping {
    pub nonce: u64,
    pub sent_at_ms: u64,
}

impl NetPacket for Ping {
    const TYPE: PacketType = PacketType::Ping;

    fn serialize(&self, writer: &mut PacketWriter<'_>) -> Result<(), EncodeError> {
        writer.put_u64(self.nonce);
        writer.put_u64(self.sent_at_ms);
        Ok(())
    }

    fn deserialize(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            nonce: reader.read_u64()?,
            sent_at_ms: reader.read_u64()?,
        })
    }
}

/// Echo of a [`Ping`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pong {
    pub nonce: u64,
    pub sent_at_ms: u64,
}

impl NetPacket for Pong {
    const TYPE: PacketType = PacketType::Pong;

    fn serialize(&self, writer: &mut PacketWriter<'_>) -> Result<(), EncodeError> {
        writer.put_u64(self.nonce);
        writer.put_u64(self.sent_at_ms);
        Ok(())
    }

    fn deserialize(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            nonce: reader.read_u64()?,
            sent_at_ms: reader.read_u64()?,
        })
    }
}
