//! Contract parameter types.

use serde::{Deserialize, Serialize};

/// The type of a contract parameter or return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ContractParameterType {
    Signature = 0x00,
    Boolean = 0x01,
    Integer = 0x02,
    Hash160 = 0x03,
    Hash256 = 0x04,
    ByteArray = 0x05,
    PublicKey = 0x06,
    String = 0x07,
    Array = 0x10,
    Map = 0x12,
    InteropInterface = 0xf0,
    Any = 0xfe,
    Void = 0xff,
}

impl ContractParameterType {
    /// Decodes a parameter type byte.
    pub fn from_byte(value: u8) -> Option<Self> {
        use ContractParameterType::*;
        Some(match value {
            0x00 => Signature,
            0x01 => Boolean,
            0x02 => Integer,
            0x03 => Hash160,
            0x04 => Hash256,
            0x05 => ByteArray,
            0x06 => PublicKey,
            0x07 => String,
            0x10 => Array,
            0x12 => Map,
            0xf0 => InteropInterface,
            0xfe => Any,
            0xff => Void,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_round_trip() {
        for byte in 0..=0xffu8 {
            if let Some(t) = ContractParameterType::from_byte(byte) {
                assert_eq!(t as u8, byte);
            }
        }
    }

    #[test]
    fn json_form_is_the_variant_name() {
        let json = serde_json::to_string(&ContractParameterType::Hash160).unwrap();
        assert_eq!(json, "\"Hash160\"");
    }
}
