// Copyright (C) 2015-2025 The Neo Project.
//
// input.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Transaction inputs referencing previous outputs.

use crate::UInt256;
use neo_io::{BinaryWriter, MemoryReader, Serializable};
use std::collections::BTreeMap;

/// A reference to an output of a previous transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Input {
    /// Hash of the transaction that produced the output.
    pub prev_hash: UInt256,
    /// Index of the output within that transaction.
    pub prev_index: u16,
}

impl Input {
    /// Creates an input reference.
    pub fn new(prev_hash: UInt256, prev_index: u16) -> Self {
        Self {
            prev_hash,
            prev_index,
        }
    }
}

impl Serializable for Input {
    fn serialize(&self, writer: &mut BinaryWriter) {
        self.prev_hash.serialize(writer);
        writer.write_u16(self.prev_index);
    }

    fn deserialize(reader: &mut MemoryReader) -> Self {
        Self {
            prev_hash: UInt256::deserialize(reader),
            prev_index: reader.read_u16(),
        }
    }
}

/// Groups inputs by the transaction they spend from, preserving a
/// deterministic order of groups.
pub fn group_inputs_by_prev_hash(inputs: &[Input]) -> BTreeMap<UInt256, Vec<Input>> {
    let mut groups: BTreeMap<UInt256, Vec<Input>> = BTreeMap::new();
    for input in inputs {
        groups.entry(input.prev_hash).or_default().push(*input);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let input = Input::new(UInt256::from_data(b"tx"), 3);
        let back: Input = neo_io::from_slice(&neo_io::to_vec(&input).unwrap()).unwrap();
        assert_eq!(back, input);
    }

    #[test]
    fn grouping_collects_same_prev_hash() {
        let a = UInt256::from_data(b"a");
        let b = UInt256::from_data(b"b");
        let inputs = [Input::new(a, 0), Input::new(b, 1), Input::new(a, 2)];
        let groups = group_inputs_by_prev_hash(&inputs);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[&a].len(), 2);
        assert_eq!(groups[&b].len(), 1);
    }
}
