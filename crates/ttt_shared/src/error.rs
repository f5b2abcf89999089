//! Error types for packet encoding, decoding and registry lookups.

/// Failure while reading a packet payload from the wire.
///
/// Every variant describes malformed input from a peer. None of them are
/// fatal to the server: the offending message is dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The message carried no bytes at all, so there is no tag to read
    #[error("Empty message: missing packet tag")]
    MissingTag,

    /// A field needed more bytes than the payload had left
    #[error("Unexpected end of packet: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEnd { needed: usize, remaining: usize },

    /// A string field was not valid UTF-8
    #[error("Invalid UTF-8 in field '{field}'")]
    InvalidUtf8 { field: &'static str },

    /// A field decoded to a value outside its domain (e.g. an unknown enum discriminant)
    #[error("Invalid value {value} for field '{field}'")]
    InvalidValue { field: &'static str, value: u64 },

    /// The packet decoded successfully but bytes were left over
    #[error("{0} trailing bytes after packet payload")]
    TrailingBytes(usize),
}

/// Failure while writing a packet payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// A string or sequence exceeds what its length prefix can express
    #[error("Field '{field}' has length {len}, maximum is {max}")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
}

/// Failure while building or querying a tag registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No entry is registered for the tag
    #[error("Unregistered packet tag 0x{0:02X}")]
    UnregisteredTag(u8),

    /// Two entries claimed the same tag while the registry was being built
    #[error("Duplicate registration for packet tag 0x{tag:02X}: '{existing}' and '{duplicate}'")]
    DuplicateTag {
        tag: u8,
        existing: &'static str,
        duplicate: &'static str,
    },
}
