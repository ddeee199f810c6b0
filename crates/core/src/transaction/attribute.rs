// Copyright (C) 2015-2025 The Neo Project.
//
// attribute.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Transaction attributes.
//!
//! The attribute payload codec depends on the usage byte: fixed 32 bytes for
//! hash-like usages, fixed 20 for scripts, a one-byte length for the
//! description URL and a var-length prefix for everything else.

use neo_io::{BinaryWriter, Error as IoError, MemoryReader, Serializable};

/// Maximum size of a var-length attribute payload.
pub const MAX_ATTRIBUTE_DATA: usize = 65_535;

/// Attribute usage tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AttributeUsage {
    ContractHash = 0x00,
    Ecdh02 = 0x02,
    Ecdh03 = 0x03,
    Script = 0x20,
    Vote = 0x30,
    DescriptionUrl = 0x81,
    Description = 0x90,
    Hash1 = 0xa1,
    Hash2 = 0xa2,
    Hash3 = 0xa3,
    Hash4 = 0xa4,
    Hash5 = 0xa5,
    Hash6 = 0xa6,
    Hash7 = 0xa7,
    Hash8 = 0xa8,
    Hash9 = 0xa9,
    Hash10 = 0xaa,
    Hash11 = 0xab,
    Hash12 = 0xac,
    Hash13 = 0xad,
    Hash14 = 0xae,
    Hash15 = 0xaf,
    Remark = 0xf0,
    Remark1 = 0xf1,
    Remark2 = 0xf2,
    Remark3 = 0xf3,
    Remark4 = 0xf4,
    Remark5 = 0xf5,
    Remark6 = 0xf6,
    Remark7 = 0xf7,
    Remark8 = 0xf8,
    Remark9 = 0xf9,
    Remark10 = 0xfa,
    Remark11 = 0xfb,
    Remark12 = 0xfc,
    Remark13 = 0xfd,
    Remark14 = 0xfe,
    Remark15 = 0xff,
}

impl AttributeUsage {
    /// Decodes a usage byte.
    pub fn from_byte(value: u8) -> Option<Self> {
        use AttributeUsage::*;
        Some(match value {
            0x00 => ContractHash,
            0x02 => Ecdh02,
            0x03 => Ecdh03,
            0x20 => Script,
            0x30 => Vote,
            0x81 => DescriptionUrl,
            0x90 => Description,
            0xa1 => Hash1,
            0xa2 => Hash2,
            0xa3 => Hash3,
            0xa4 => Hash4,
            0xa5 => Hash5,
            0xa6 => Hash6,
            0xa7 => Hash7,
            0xa8 => Hash8,
            0xa9 => Hash9,
            0xaa => Hash10,
            0xab => Hash11,
            0xac => Hash12,
            0xad => Hash13,
            0xae => Hash14,
            0xaf => Hash15,
            0xf0 => Remark,
            0xf1 => Remark1,
            0xf2 => Remark2,
            0xf3 => Remark3,
            0xf4 => Remark4,
            0xf5 => Remark5,
            0xf6 => Remark6,
            0xf7 => Remark7,
            0xf8 => Remark8,
            0xf9 => Remark9,
            0xfa => Remark10,
            0xfb => Remark11,
            0xfc => Remark12,
            0xfd => Remark13,
            0xfe => Remark14,
            0xff => Remark15,
            _ => return None,
        })
    }

    fn fixed_payload_len(self) -> Option<usize> {
        use AttributeUsage::*;
        match self {
            ContractHash | Ecdh02 | Ecdh03 | Vote | Hash1 | Hash2 | Hash3 | Hash4 | Hash5
            | Hash6 | Hash7 | Hash8 | Hash9 | Hash10 | Hash11 | Hash12 | Hash13 | Hash14
            | Hash15 => Some(32),
            Script => Some(20),
            _ => None,
        }
    }
}

/// A single transaction attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub usage: AttributeUsage,
    pub data: Vec<u8>,
}

impl Attribute {
    /// Creates an attribute.
    pub fn new(usage: AttributeUsage, data: Vec<u8>) -> Self {
        Self { usage, data }
    }
}

impl Serializable for Attribute {
    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_u8(self.usage as u8);
        match self.usage.fixed_payload_len() {
            Some(len) => {
                if self.data.len() != len {
                    writer.fault(IoError::InvalidFormat(format!(
                        "attribute {:?} expects {len} bytes, got {}",
                        self.usage,
                        self.data.len()
                    )));
                    return;
                }
                writer.write_bytes(&self.data);
            }
            None if self.usage == AttributeUsage::DescriptionUrl => {
                if self.data.len() > u8::MAX as usize {
                    writer.fault(IoError::OutOfRange("description URL too long".into()));
                    return;
                }
                writer.write_u8(self.data.len() as u8);
                writer.write_bytes(&self.data);
            }
            None => writer.write_var_bytes(&self.data),
        }
    }

    fn deserialize(reader: &mut MemoryReader) -> Self {
        let usage_byte = reader.read_u8();
        let Some(usage) = AttributeUsage::from_byte(usage_byte) else {
            reader.fault(IoError::InvalidFormat(format!(
                "unknown attribute usage {usage_byte:#04x}"
            )));
            return Self::new(AttributeUsage::Remark, Vec::new());
        };
        let data = match usage.fixed_payload_len() {
            Some(len) => reader.read_bytes(len),
            None if usage == AttributeUsage::DescriptionUrl => {
                let len = reader.read_u8() as usize;
                reader.read_bytes(len)
            }
            None => reader.read_var_bytes(MAX_ATTRIBUTE_DATA),
        };
        Self { usage, data }
    }
}
