//! Binary reader over an in-memory byte slice.

use crate::{Error, Result, Serializable, MAX_ARRAY_SIZE};

/// A reader that consumes little-endian binary data from a byte slice.
///
/// Like [`crate::BinaryWriter`], the reader carries a sticky error. After the
/// first failure every read returns a zero value, so decoders can be written
/// without per-field checks and validated once via [`MemoryReader::finish`].
pub struct MemoryReader<'a> {
    data: &'a [u8],
    position: usize,
    error: Option<Error>,
}

impl<'a> MemoryReader<'a> {
    /// Creates a reader over `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            position: 0,
            error: None,
        }
    }

    /// Returns the current read position.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns the number of bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Returns the sticky error, if any.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Records `error` as the reader's sticky error. The first fault wins.
    pub fn fault(&mut self, error: Error) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Finalizes a decode: returns `value` if no error occurred and the whole
    /// input was consumed.
    pub fn finish<T>(self, value: T) -> Result<T> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let left = self.remaining();
        if left != 0 {
            return Err(Error::TrailingData(left));
        }
        Ok(value)
    }

    fn take(&mut self, count: usize) -> Option<&'a [u8]> {
        if self.error.is_some() {
            return None;
        }
        if self.remaining() < count {
            self.fault(Error::EndOfStream {
                position: self.position,
            });
            return None;
        }
        let slice = &self.data[self.position..self.position + count];
        self.position += count;
        Some(slice)
    }

    /// Reads a single byte.
    pub fn read_u8(&mut self) -> u8 {
        self.take(1).map(|b| b[0]).unwrap_or_default()
    }

    /// Reads a boolean; any non-zero byte is `true`.
    pub fn read_bool(&mut self) -> bool {
        self.read_u8() != 0
    }

    /// Reads an unsigned 16-bit little-endian integer.
    pub fn read_u16(&mut self) -> u16 {
        self.take(2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .unwrap_or_default()
    }

    /// Reads an unsigned 32-bit little-endian integer.
    pub fn read_u32(&mut self) -> u32 {
        self.take(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .unwrap_or_default()
    }

    /// Reads an unsigned 64-bit little-endian integer.
    pub fn read_u64(&mut self) -> u64 {
        self.take(8)
            .map(|b| u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .unwrap_or_default()
    }

    /// Reads a signed 64-bit little-endian integer.
    pub fn read_i64(&mut self) -> i64 {
        self.read_u64() as i64
    }

    /// Reads exactly `count` raw bytes.
    pub fn read_bytes(&mut self, count: usize) -> Vec<u8> {
        self.take(count).map(<[u8]>::to_vec).unwrap_or_default()
    }

    /// Reads a variable-length unsigned integer, faulting if it exceeds `max`.
    pub fn read_var_uint(&mut self, max: u64) -> u64 {
        let prefix = self.read_u8();
        let value = match prefix {
            0xFD => u64::from(self.read_u16()),
            0xFE => u64::from(self.read_u32()),
            0xFF => self.read_u64(),
            b => u64::from(b),
        };
        if self.error.is_none() && value > max {
            self.fault(Error::OutOfRange(format!(
                "variable-length integer {value} exceeds the limit {max}"
            )));
            return 0;
        }
        value
    }

    /// Reads a length-prefixed byte string of at most `max` bytes.
    pub fn read_var_bytes(&mut self, max: usize) -> Vec<u8> {
        let len = self.read_var_uint(max as u64) as usize;
        self.read_bytes(len)
    }

    /// Reads a length-prefixed UTF-8 string of at most `max` bytes.
    pub fn read_var_string(&mut self, max: usize) -> String {
        let bytes = self.read_var_bytes(max);
        match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(_) => {
                self.fault(Error::InvalidFormat("string is not valid UTF-8".into()));
                String::new()
            }
        }
    }

    /// Reads a length-prefixed array of serializable items.
    pub fn read_array<T: Serializable>(&mut self) -> Vec<T> {
        self.read_array_max(MAX_ARRAY_SIZE)
    }

    /// Reads a length-prefixed array of at most `max` serializable items.
    pub fn read_array_max<T: Serializable>(&mut self, max: usize) -> Vec<T> {
        let len = self.read_var_uint(max as u64) as usize;
        let mut items = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            if self.error.is_some() {
                break;
            }
            items.push(T::deserialize(self));
        }
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_integers() {
        let data = [0x34, 0x12, 0xef, 0xbe, 0xad, 0xde];
        let mut reader = MemoryReader::new(&data);
        assert_eq!(reader.read_u16(), 0x1234);
        assert_eq!(reader.read_u32(), 0xdead_beef);
        assert!(reader.error().is_none());
    }

    #[test]
    fn underrun_sets_sticky_error_and_returns_zero() {
        let data = [0x01];
        let mut reader = MemoryReader::new(&data);
        assert_eq!(reader.read_u32(), 0);
        assert_eq!(reader.read_u8(), 0, "reads after a fault return zero");
        assert_eq!(reader.error(), Some(&Error::EndOfStream { position: 0 }));
    }

    #[test]
    fn var_uint_respects_limit() {
        let data = [0xFD, 0x10, 0x27]; // 10000
        let mut reader = MemoryReader::new(&data);
        assert_eq!(reader.read_var_uint(10_000), 10_000);

        let mut reader = MemoryReader::new(&data);
        assert_eq!(reader.read_var_uint(9_999), 0);
        assert!(matches!(reader.error(), Some(Error::OutOfRange(_))));
    }

    #[test]
    fn var_bytes_round_trip() {
        let mut writer = crate::BinaryWriter::new();
        writer.write_var_bytes(b"hello");
        let bytes = writer.into_bytes().unwrap();
        let mut reader = MemoryReader::new(&bytes);
        assert_eq!(reader.read_var_bytes(16), b"hello");
        assert_eq!(reader.remaining(), 0);
    }
}
