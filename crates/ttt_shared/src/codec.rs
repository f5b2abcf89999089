//! Binary reader and writer used by every packet.
//!
//! The layout is deliberately simple so that any client can implement it:
//!
//! * integers are little-endian
//! * strings are a `u16` byte length followed by UTF-8 bytes
//! * string sequences are a `u16` element count followed by the strings
//!
//! There is no framing here. The transport delivers whole messages,
//! and the message tag is written by whoever owns the outbound buffer.

use crate::error::{DecodeError, EncodeError};
use bytes::{Buf, BufMut, BytesMut};

/// Longest string, in bytes, that fits behind a `u16` length prefix.
pub const MAX_STRING_BYTES: usize = u16::MAX as usize;

/// Largest element count that fits behind a `u16` count prefix.
pub const MAX_SEQUENCE_LEN: usize = u16::MAX as usize;

/// Appends packet fields to a borrowed buffer.
///
/// The writer never clears the buffer; callers that reuse a scratch buffer
/// clear it before constructing the writer.
#[derive(Debug)]
pub struct PacketWriter<'a> {
    buf: &'a mut BytesMut,
}

impl<'a> PacketWriter<'a> {
    pub fn new(buf: &'a mut BytesMut) -> Self {
        Self { buf }
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn put_u16(&mut self, value: u16) {
        self.buf.put_u16_le(value);
    }

    pub fn put_u64(&mut self, value: u64) {
        self.buf.put_u64_le(value);
    }

    /// Writes a length-prefixed UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::TooLong`] if the string is longer than
    /// [`MAX_STRING_BYTES`] bytes. Nothing is written in that case.
    pub fn put_str(&mut self, field: &'static str, value: &str) -> Result<(), EncodeError> {
        if value.len() > MAX_STRING_BYTES {
            return Err(EncodeError::TooLong {
                field,
                len: value.len(),
                max: MAX_STRING_BYTES,
            });
        }
        self.buf.put_u16_le(value.len() as u16);
        self.buf.put_slice(value.as_bytes());
        Ok(())
    }

    /// Writes a count-prefixed sequence of strings.
    pub fn put_str_list(
        &mut self,
        field: &'static str,
        values: &[String],
    ) -> Result<(), EncodeError> {
        if values.len() > MAX_SEQUENCE_LEN {
            return Err(EncodeError::TooLong {
                field,
                len: values.len(),
                max: MAX_SEQUENCE_LEN,
            });
        }
        if let Some(oversized) = values.iter().find(|v| v.len() > MAX_STRING_BYTES) {
            return Err(EncodeError::TooLong {
                field,
                len: oversized.len(),
                max: MAX_STRING_BYTES,
            });
        }
        self.buf.put_u16_le(values.len() as u16);
        for value in values {
            self.put_str(field, value)?;
        }
        Ok(())
    }
}

/// Reads packet fields from a received payload.
///
/// Every read checks the remaining length first, so malformed input surfaces
/// as a [`DecodeError`] instead of a panic inside `bytes`.
#[derive(Debug, Clone)]
pub struct PacketReader<'a> {
    buf: &'a [u8],
}

impl<'a> PacketReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn ensure(&self, needed: usize) -> Result<(), DecodeError> {
        let remaining = self.buf.remaining();
        if remaining < needed {
            return Err(DecodeError::UnexpectedEnd { needed, remaining });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        self.ensure(2)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        self.ensure(8)?;
        Ok(self.buf.get_u64_le())
    }

    pub fn read_string(&mut self, field: &'static str) -> Result<String, DecodeError> {
        let len = self.read_u16()? as usize;
        self.ensure(len)?;
        let value = std::str::from_utf8(&self.buf[..len])
            .map_err(|_| DecodeError::InvalidUtf8 { field })?
            .to_owned();
        self.buf.advance(len);
        Ok(value)
    }

    pub fn read_string_list(&mut self, field: &'static str) -> Result<Vec<String>, DecodeError> {
        let count = self.read_u16()? as usize;
        // Each element carries at least its own two-byte prefix; refuse counts
        // the payload cannot possibly hold before allocating for them.
        self.ensure(count * 2)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.read_string(field)?);
        }
        Ok(values)
    }

    /// Consumes the reader, failing if any payload bytes were left unread.
    pub fn finish(self) -> Result<(), DecodeError> {
        match self.buf.remaining() {
            0 => Ok(()),
            left => Err(DecodeError::TrailingBytes(left)),
        }
    }
}
