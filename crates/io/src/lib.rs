//! Binary serialization primitives for the Neo ledger.
//!
//! Every on-disk and on-wire object implements [`Serializable`]: it encodes
//! itself into a [`BinaryWriter`] and decodes from a [`MemoryReader`]. Both
//! sides carry a sticky error so composite codecs can be written as straight
//! sequences of reads and writes and checked once at the end.

pub mod binary_writer;
pub mod memory_reader;
pub mod serializable;

pub use binary_writer::BinaryWriter;
pub use memory_reader::MemoryReader;
pub use serializable::Serializable;

/// Upper bound on decoded array lengths. Anything larger than this is a
/// malformed payload, not a legitimate object.
pub const MAX_ARRAY_SIZE: usize = 0x0100_0000;

/// Error types for IO operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("unexpected end of stream at position {position}")]
    EndOfStream { position: usize },

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("value out of range: {0}")]
    OutOfRange(String),

    #[error("trailing data: {0} bytes left after decoding")]
    TrailingData(usize),
}

/// Result type for IO operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Serializes `value` into a fresh byte vector.
pub fn to_vec<T: Serializable>(value: &T) -> Result<Vec<u8>> {
    let mut writer = BinaryWriter::new();
    value.serialize(&mut writer);
    writer.into_bytes()
}

/// Decodes a single `T` from `data`, requiring the whole slice to be consumed.
pub fn from_slice<T: Serializable>(data: &[u8]) -> Result<T> {
    let mut reader = MemoryReader::new(data);
    let value = T::deserialize(&mut reader);
    reader.finish(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Pair {
        a: u32,
        b: Vec<u8>,
    }

    impl Serializable for Pair {
        fn serialize(&self, writer: &mut BinaryWriter) {
            writer.write_u32(self.a);
            writer.write_var_bytes(&self.b);
        }

        fn deserialize(reader: &mut MemoryReader) -> Self {
            Self {
                a: reader.read_u32(),
                b: reader.read_var_bytes(64),
            }
        }
    }

    #[test]
    fn round_trip_through_helpers() {
        let pair = Pair {
            a: 0xdead_beef,
            b: vec![1, 2, 3],
        };
        let bytes = to_vec(&pair).unwrap();
        let back: Pair = from_slice(&bytes).unwrap();
        assert_eq!(back.a, pair.a);
        assert_eq!(back.b, pair.b);
    }

    #[test]
    fn from_slice_rejects_trailing_bytes() {
        let mut bytes = to_vec(&Pair { a: 1, b: vec![] }).unwrap();
        bytes.push(0x00);
        assert_eq!(
            from_slice::<Pair>(&bytes).unwrap_err(),
            Error::TrailingData(1)
        );
    }
}
