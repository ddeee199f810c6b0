// Copyright (C) 2015-2025 The Neo Project.
//
// witness.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Witnesses: invocation/verification script pairs attached to signed
//! objects.

use crate::UInt160;
use neo_io::{BinaryWriter, MemoryReader, Serializable};

/// Maximum accepted length of either witness script.
pub const MAX_SCRIPT_SIZE: usize = 65_536;

/// A pair of scripts proving authority over a script hash: the invocation
/// script pushes arguments (typically signatures) and the verification
/// script consumes them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Witness {
    pub invocation_script: Vec<u8>,
    pub verification_script: Vec<u8>,
}

impl Witness {
    /// Creates a witness from its two scripts.
    pub fn new(invocation_script: Vec<u8>, verification_script: Vec<u8>) -> Self {
        Self {
            invocation_script,
            verification_script,
        }
    }

    /// The hash of the verification script, identifying the signer.
    pub fn script_hash(&self) -> UInt160 {
        UInt160::from_script(&self.verification_script)
    }
}

impl Serializable for Witness {
    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_var_bytes(&self.invocation_script);
        writer.write_var_bytes(&self.verification_script);
    }

    fn deserialize(reader: &mut MemoryReader) -> Self {
        Self {
            invocation_script: reader.read_var_bytes(MAX_SCRIPT_SIZE),
            verification_script: reader.read_var_bytes(MAX_SCRIPT_SIZE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let witness = Witness::new(vec![0x00, 0x01], vec![0x51]);
        let bytes = neo_io::to_vec(&witness).unwrap();
        let back: Witness = neo_io::from_slice(&bytes).unwrap();
        assert_eq!(back, witness);
    }

    #[test]
    fn script_hash_is_hash160_of_verification_script() {
        let witness = Witness::new(vec![], vec![0x51]);
        assert_eq!(
            witness.script_hash(),
            UInt160::from_script(&[0x51])
        );
    }
}
