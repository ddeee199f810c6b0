//! Contract storage items.

use neo_io::{BinaryWriter, MemoryReader, Serializable};

/// An opaque value stored under a `(script hash, user key)` pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageItem {
    pub value: Vec<u8>,
    /// Constant items may not be modified or deleted once written.
    pub is_constant: bool,
}

impl StorageItem {
    /// Creates a storage item.
    pub fn new(value: Vec<u8>, is_constant: bool) -> Self {
        Self { value, is_constant }
    }
}

impl Serializable for StorageItem {
    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_var_bytes(&self.value);
        writer.write_bool(self.is_constant);
    }

    fn deserialize(reader: &mut MemoryReader) -> Self {
        Self {
            value: reader.read_var_bytes(65_536),
            is_constant: reader.read_bool(),
        }
    }
}
