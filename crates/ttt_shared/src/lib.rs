//! # TTT Shared - Packet Protocol
//!
//! Packet definitions and the binary codec shared by the Tic-Tac-Toe server and
//! its clients.
//!
//! ## Wire Format
//!
//! Every message is delivered whole by the transport and laid out as
//!
//! ```text
//! +---------+---------------------------+
//! | tag: u8 | kind-specific payload ... |
//! +---------+---------------------------+
//! ```
//!
//! The tag selects the decoder through a [`PacketRegistry`]. Payload fields use
//! the little-endian, length-prefixed layout described in [`codec`].
//!
//! ## Example
//!
//! ```rust
//! use bytes::BytesMut;
//! use ttt_shared::{encode, JoinRequest, Packet, PacketReader, PacketRegistry};
//!
//! let registry = PacketRegistry::standard().expect("tags are unique");
//!
//! let mut buf = BytesMut::new();
//! encode(&JoinRequest { user_name: "alice".into() }, &mut buf).unwrap();
//!
//! let decode = registry.resolve_decoder(buf[0]).unwrap();
//! let mut reader = PacketReader::new(&buf[1..]);
//! let packet = decode(&mut reader).unwrap();
//! assert_eq!(packet, Packet::JoinRequest(JoinRequest { user_name: "alice".into() }));
//! ```

pub mod codec;
pub mod delivery;
pub mod error;
pub mod packets;
pub mod registry;

pub use codec::{PacketReader, PacketWriter, MAX_SEQUENCE_LEN, MAX_STRING_BYTES};
pub use delivery::DeliveryMode;
pub use error::{DecodeError, EncodeError, RegistryError};
pub use packets::{
    encode, JoinFailReason, JoinRequest, NetPacket, OnJoin, OnJoinFailed, OnServerStatus, Packet,
    PacketType, Ping, Pong, ServerStatusRequest,
};
pub use registry::{PacketDecoder, PacketRegistry, PacketRegistryBuilder};
