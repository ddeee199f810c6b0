// Copyright (C) 2015-2025 The Neo Project.
//
// uint160.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Implementation of UInt160, a 160-bit identifier for scripts and accounts.

use crate::{CoreError, Result};
use neo_io::{BinaryWriter, MemoryReader, Serializable};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// The length of UInt160 values in bytes.
pub const UINT160_SIZE: usize = 20;

/// A 160-bit value identifying a script or an account.
///
/// Stored in the digest (little-endian) byte order used on disk and on the
/// wire; the textual form is big-endian hex.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct UInt160([u8; UINT160_SIZE]);

impl UInt160 {
    /// The all-zero value.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Indicates whether every byte is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; UINT160_SIZE]
    }

    /// Creates a value from its little-endian byte representation.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let array: [u8; UINT160_SIZE] = data
            .try_into()
            .map_err(|_| CoreError::InvalidFormat(format!("expected 20 bytes, got {}", data.len())))?;
        Ok(Self(array))
    }

    /// Creates a value from its big-endian byte representation.
    pub fn from_bytes_be(data: &[u8]) -> Result<Self> {
        let mut value = Self::from_bytes(data)?;
        value.0.reverse();
        Ok(value)
    }

    /// The script hash of `script`: RIPEMD160 over SHA256.
    pub fn from_script(script: &[u8]) -> Self {
        Self(neo_cryptography::hash160(script))
    }

    /// Returns the little-endian byte representation.
    pub fn to_array(self) -> [u8; UINT160_SIZE] {
        self.0
    }

    /// Returns the big-endian byte representation used in display contexts
    /// and some storage keys.
    pub fn to_array_be(self) -> [u8; UINT160_SIZE] {
        let mut bytes = self.0;
        bytes.reverse();
        bytes
    }

    /// Parses the big-endian hex form, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| CoreError::InvalidFormat(e.to_string()))?;
        Self::from_bytes_be(&bytes)
    }
}

impl From<[u8; UINT160_SIZE]> for UInt160 {
    fn from(bytes: [u8; UINT160_SIZE]) -> Self {
        Self(bytes)
    }
}

impl Ord for UInt160 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_array_be().cmp(&other.to_array_be())
    }
}

impl PartialOrd for UInt160 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for UInt160 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.to_array_be()))
    }
}

impl fmt::Debug for UInt160 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UInt160(0x{self})")
    }
}

impl FromStr for UInt160 {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serializable for UInt160 {
    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_bytes(&self.0);
    }

    fn deserialize(reader: &mut MemoryReader) -> Self {
        let bytes = reader.read_bytes(UINT160_SIZE);
        Self::from_bytes(&bytes).unwrap_or_default()
    }
}

impl Serialize for UInt160 {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{self}"))
    }
}

impl<'de> Deserialize<'de> for UInt160 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip_is_big_endian() {
        let hex_str = "2d3b96ae1bcc5a585e075e3b81920210dec16302";
        let value = UInt160::from_hex(hex_str).unwrap();
        assert_eq!(value.to_string(), hex_str);
        // LE array is the reverse of the displayed form.
        assert_eq!(hex::encode(value.to_array()), {
            let mut b = hex::decode(hex_str).unwrap();
            b.reverse();
            hex::encode(b)
        });
    }

    #[test]
    fn accepts_0x_prefix() {
        let a = UInt160::from_hex("0x2d3b96ae1bcc5a585e075e3b81920210dec16302").unwrap();
        let b = UInt160::from_hex("2d3b96ae1bcc5a585e075e3b81920210dec16302").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert!(UInt160::from_bytes(&[0u8; 19]).is_err());
        assert!(UInt160::from_hex("abcd").is_err());
    }

    #[test]
    fn ordering_follows_big_endian_value() {
        let small = UInt160::from_hex("0000000000000000000000000000000000000001").unwrap();
        let big = UInt160::from_hex("0100000000000000000000000000000000000000").unwrap();
        assert!(small < big);
    }

    #[test]
    fn serializable_round_trip() {
        let value = UInt160::from_hex("2d3b96ae1bcc5a585e075e3b81920210dec16302").unwrap();
        let bytes = neo_io::to_vec(&value).unwrap();
        assert_eq!(bytes.len(), UINT160_SIZE);
        let back: UInt160 = neo_io::from_slice(&bytes).unwrap();
        assert_eq!(back, value);
    }
}
