//! Bounds-checked primitives for reading and writing frame fields.
//!
//! Every read checks the remaining length first, so a hostile length
//! prefix can only ever produce an error, never an out-of-bounds read.

use bytes::{Buf, BufMut};

use crate::{Identity, ProtocolError};

/// A cursor over an immutable byte slice.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn ensure(&self, needed: usize, field: &'static str) -> Result<(), ProtocolError> {
        if self.buf.len() < needed {
            return Err(ProtocolError::Truncated {
                field,
                needed,
                available: self.buf.len(),
            });
        }
        Ok(())
    }

    pub(crate) fn read_u16(&mut self, field: &'static str) -> Result<u16, ProtocolError> {
        self.ensure(2, field)?;
        Ok(self.buf.get_u16())
    }

    pub(crate) fn read_u32(&mut self, field: &'static str) -> Result<u32, ProtocolError> {
        self.ensure(4, field)?;
        Ok(self.buf.get_u32())
    }

    /// Reads a 32-bit length prefix.
    pub(crate) fn read_len(&mut self, field: &'static str) -> Result<usize, ProtocolError> {
        self.read_u32(field).map(|len| len as usize)
    }

    /// Takes exactly `len` bytes, or fails if fewer remain.
    pub(crate) fn take(
        &mut self,
        len: usize,
        field: &'static str,
    ) -> Result<&'a [u8], ProtocolError> {
        if len > self.buf.len() {
            return Err(ProtocolError::LengthOverrun {
                field,
                len,
                remaining: self.buf.len(),
            });
        }
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    /// Takes `len` bytes and interprets them as an identity.
    pub(crate) fn take_identity(
        &mut self,
        len: usize,
        field: &'static str,
    ) -> Result<Identity, ProtocolError> {
        let bytes = self.take(len, field)?;
        let text = std::str::from_utf8(bytes)
            .map_err(|_| ProtocolError::InvalidUtf8 { field })?;
        Ok(Identity::new(text))
    }

    /// Consumes the reader, returning whatever is left.
    pub(crate) fn rest(self) -> &'a [u8] {
        self.buf
    }

    /// Fails if any bytes are left unread.
    pub(crate) fn finish(self) -> Result<(), ProtocolError> {
        if !self.buf.is_empty() {
            return Err(ProtocolError::TrailingBytes {
                count: self.buf.len(),
            });
        }
        Ok(())
    }
}

/// Converts a field length to its 32-bit wire form.
pub(crate) fn wire_len(len: usize, field: &'static str) -> Result<u32, ProtocolError> {
    u32::try_from(len).map_err(|_| ProtocolError::FieldTooLarge { field, len })
}

/// Writes a 32-bit length prefix.
pub(crate) fn put_len(
    buf: &mut Vec<u8>,
    len: usize,
    field: &'static str,
) -> Result<(), ProtocolError> {
    buf.put_u32(wire_len(len, field)?);
    Ok(())
}
