//! Binary writer for serializing Neo data structures.

use crate::{Error, Result, Serializable, MAX_ARRAY_SIZE};
use bytes::{BufMut, BytesMut};

/// A writer that accumulates little-endian binary data into a buffer.
///
/// The writer carries a sticky error: once [`BinaryWriter::fault`] has been
/// called, every subsequent write is a no-op and [`BinaryWriter::into_bytes`]
/// reports the first error. This lets composite encoders run to completion
/// without checking each individual step.
pub struct BinaryWriter {
    buffer: BytesMut,
    error: Option<Error>,
}

impl BinaryWriter {
    /// Creates a new binary writer.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
            error: None,
        }
    }

    /// Creates a new binary writer with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            error: None,
        }
    }

    /// Returns the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Indicates whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns the sticky error, if any.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Records `error` as the writer's sticky error. The first fault wins;
    /// later ones are dropped.
    pub fn fault(&mut self, error: Error) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Consumes the writer, returning the buffer or the sticky error.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.buffer.to_vec()),
        }
    }

    /// Writes a single byte.
    pub fn write_u8(&mut self, value: u8) {
        if self.error.is_none() {
            self.buffer.put_u8(value);
        }
    }

    /// Writes a boolean as a single `0`/`1` byte.
    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(u8::from(value));
    }

    /// Writes an unsigned 16-bit integer in little-endian order.
    pub fn write_u16(&mut self, value: u16) {
        if self.error.is_none() {
            self.buffer.put_u16_le(value);
        }
    }

    /// Writes an unsigned 32-bit integer in little-endian order.
    pub fn write_u32(&mut self, value: u32) {
        if self.error.is_none() {
            self.buffer.put_u32_le(value);
        }
    }

    /// Writes an unsigned 64-bit integer in little-endian order.
    pub fn write_u64(&mut self, value: u64) {
        if self.error.is_none() {
            self.buffer.put_u64_le(value);
        }
    }

    /// Writes a signed 64-bit integer in little-endian order.
    pub fn write_i64(&mut self, value: i64) {
        self.write_u64(value as u64);
    }

    /// Writes raw bytes with no length prefix.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if self.error.is_none() {
            self.buffer.put_slice(bytes);
        }
    }

    /// Writes a variable-length unsigned integer.
    ///
    /// Values below `0xFD` are a single byte; larger values are tagged with
    /// `0xFD`/`0xFE`/`0xFF` followed by the little-endian u16/u32/u64.
    pub fn write_var_uint(&mut self, value: u64) {
        if value < 0xFD {
            self.write_u8(value as u8);
        } else if value <= u64::from(u16::MAX) {
            self.write_u8(0xFD);
            self.write_u16(value as u16);
        } else if value <= u64::from(u32::MAX) {
            self.write_u8(0xFE);
            self.write_u32(value as u32);
        } else {
            self.write_u8(0xFF);
            self.write_u64(value);
        }
    }

    /// Writes a length-prefixed byte string.
    pub fn write_var_bytes(&mut self, bytes: &[u8]) {
        self.write_var_uint(bytes.len() as u64);
        self.write_bytes(bytes);
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn write_var_string(&mut self, value: &str) {
        self.write_var_bytes(value.as_bytes());
    }

    /// Writes a length-prefixed array of serializable items.
    pub fn write_array<T: Serializable>(&mut self, items: &[T]) {
        if items.len() > MAX_ARRAY_SIZE {
            self.fault(Error::OutOfRange(format!(
                "array of {} items exceeds the serialization limit",
                items.len()
            )));
            return;
        }
        self.write_var_uint(items.len() as u64);
        for item in items {
            item.serialize(self);
        }
    }
}

impl Default for BinaryWriter {
    fn default() -> Self {
        Self::new()
    }
}
