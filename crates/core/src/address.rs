// Copyright (C) 2015-2025 The Neo Project.
//
// address.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Base58Check address form of script hashes.

use crate::{CoreError, Result, UInt160};
use neo_cryptography::{base58_check_decode, base58_check_encode};

/// Encodes a script hash as an address with the given version byte.
pub fn to_address(hash: UInt160, version: u8) -> String {
    let mut data = Vec::with_capacity(21);
    data.push(version);
    data.extend_from_slice(&hash.to_array());
    base58_check_encode(&data)
}

/// Decodes an address, returning the script hash and checking the version.
pub fn from_address(address: &str, version: u8) -> Result<UInt160> {
    let data =
        base58_check_decode(address).map_err(|e| CoreError::InvalidFormat(e.to_string()))?;
    if data.len() != 21 {
        return Err(CoreError::InvalidFormat(format!(
            "address payload has {} bytes, expected 21",
            data.len()
        )));
    }
    if data[0] != version {
        return Err(CoreError::InvalidFormat(format!(
            "address version {} does not match expected {version}",
            data[0]
        )));
    }
    UInt160::from_bytes(&data[1..])
}
