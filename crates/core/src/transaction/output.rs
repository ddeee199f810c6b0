// Copyright (C) 2015-2025 The Neo Project.
//
// output.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Transaction outputs carrying asset amounts to script hashes.

use crate::{Fixed8, UInt160, UInt256};
use neo_io::{BinaryWriter, MemoryReader, Serializable};

/// A transfer of an asset amount to a destination script hash.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Output {
    /// Identifier of the transferred asset.
    pub asset_id: UInt256,
    /// Transferred amount.
    pub amount: Fixed8,
    /// Destination account.
    pub script_hash: UInt160,
}

impl Output {
    /// Creates an output.
    pub fn new(asset_id: UInt256, amount: Fixed8, script_hash: UInt160) -> Self {
        Self {
            asset_id,
            amount,
            script_hash,
        }
    }
}

impl Serializable for Output {
    fn serialize(&self, writer: &mut BinaryWriter) {
        self.asset_id.serialize(writer);
        self.amount.serialize(writer);
        self.script_hash.serialize(writer);
    }

    fn deserialize(reader: &mut MemoryReader) -> Self {
        Self {
            asset_id: UInt256::deserialize(reader),
            amount: Fixed8::deserialize(reader),
            script_hash: UInt160::deserialize(reader),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let output = Output::new(
            UInt256::from_data(b"asset"),
            Fixed8::from_int(12).unwrap(),
            UInt160::from_script(b"dest"),
        );
        let back: Output = neo_io::from_slice(&neo_io::to_vec(&output).unwrap()).unwrap();
        assert_eq!(back, output);
    }
}
