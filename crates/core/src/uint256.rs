// Copyright (C) 2015-2025 The Neo Project.
//
// uint256.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Implementation of UInt256, a 256-bit identifier for blocks, transactions
//! and assets.

use crate::{CoreError, Result};
use neo_io::{BinaryWriter, MemoryReader, Serializable};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// The length of UInt256 values in bytes.
pub const UINT256_SIZE: usize = 32;

/// A 256-bit value identifying a block, transaction or asset.
///
/// Stored in the digest (little-endian) byte order; displayed big-endian.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct UInt256([u8; UINT256_SIZE]);

impl UInt256 {
    /// The all-zero value.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Indicates whether every byte is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; UINT256_SIZE]
    }

    /// Creates a value from its little-endian byte representation.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let array: [u8; UINT256_SIZE] = data
            .try_into()
            .map_err(|_| CoreError::InvalidFormat(format!("expected 32 bytes, got {}", data.len())))?;
        Ok(Self(array))
    }

    /// Creates a value from its big-endian byte representation.
    pub fn from_bytes_be(data: &[u8]) -> Result<Self> {
        let mut value = Self::from_bytes(data)?;
        value.0.reverse();
        Ok(value)
    }

    /// Double-SHA256 of `data`, the hash used for blocks and transactions.
    pub fn from_data(data: &[u8]) -> Self {
        Self(neo_cryptography::hash256(data))
    }

    /// Returns the little-endian byte representation.
    pub fn to_array(self) -> [u8; UINT256_SIZE] {
        self.0
    }

    /// Returns the big-endian byte representation.
    pub fn to_array_be(self) -> [u8; UINT256_SIZE] {
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

impl From<[u8; UINT256_SIZE]> for UInt256 {
    fn from(bytes: [u8; UINT256_SIZE]) -> Self {
        Self(bytes)
    }
}

impl Ord for UInt256 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_array_be().cmp(&other.to_array_be())
    }
}

impl PartialOrd for UInt256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for UInt256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.to_array_be()))
    }
}

impl fmt::Debug for UInt256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UInt256(0x{self})")
    }
}

impl FromStr for UInt256 {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serializable for UInt256 {
    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_bytes(&self.0);
    }

    fn deserialize(reader: &mut MemoryReader) -> Self {
        let bytes = reader.read_bytes(UINT256_SIZE);
        Self::from_bytes(&bytes).unwrap_or_default()
    }
}

impl Serialize for UInt256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{self}"))
    }
}

impl<'de> Deserialize<'de> for UInt256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let hex_str = "f037308fa0ab18155bccfc08485468c112409ea5064595699e98c545f245f32d";
        let value = UInt256::from_hex(hex_str).unwrap();
        assert_eq!(value.to_string(), hex_str);
    }

    #[test]
    fn from_data_is_double_sha() {
        let value = UInt256::from_data(b"neo");
        assert_eq!(value.to_array(), neo_cryptography::hash256(b"neo"));
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert!(UInt256::from_bytes(&[0u8; 31]).is_err());
    }

    #[test]
    fn serializable_round_trip() {
        let value =
            UInt256::from_hex("f037308fa0ab18155bccfc08485468c112409ea5064595699e98c545f245f32d")
                .unwrap();
        let back: UInt256 = neo_io::from_slice(&neo_io::to_vec(&value).unwrap()).unwrap();
        assert_eq!(back, value);
    }
}
