//! Deployed contract state.

use neo_core::UInt160;
use neo_io::{BinaryWriter, MemoryReader, Serializable};
use neo_smart_contract::ContractPropertyState;

/// A deployed (non-native) contract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractState {
    pub script: Vec<u8>,
    pub param_list: Vec<u8>,
    pub return_type: u8,
    pub properties: ContractPropertyState,
    pub name: String,
    pub code_version: String,
    pub author: String,
    pub email: String,
    pub description: String,
}

impl ContractState {
    /// The contract's identifying script hash.
    pub fn script_hash(&self) -> UInt160 {
        UInt160::from_script(&self.script)
    }

    /// Whether the contract was deployed with its own storage.
    pub fn has_storage(&self) -> bool {
        self.properties.contains(ContractPropertyState::HAS_STORAGE)
    }

    /// Whether the contract may be the target of a dynamic invocation.
    pub fn has_dynamic_invoke(&self) -> bool {
        self.properties
            .contains(ContractPropertyState::HAS_DYNAMIC_INVOKE)
    }

    /// Whether the contract accepts asset transfers.
    pub fn is_payable(&self) -> bool {
        self.properties.contains(ContractPropertyState::IS_PAYABLE)
    }
}

impl Serializable for ContractState {
    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_var_bytes(&self.script);
        writer.write_var_bytes(&self.param_list);
        writer.write_u8(self.return_type);
        writer.write_u8(self.properties.bits());
        writer.write_var_string(&self.name);
        writer.write_var_string(&self.code_version);
        writer.write_var_string(&self.author);
        writer.write_var_string(&self.email);
        writer.write_var_string(&self.description);
    }

    fn deserialize(reader: &mut MemoryReader) -> Self {
        Self {
            script: reader.read_var_bytes(1 << 20),
            param_list: reader.read_var_bytes(252),
            return_type: reader.read_u8(),
            properties: ContractPropertyState::from_bits_truncate(reader.read_u8()),
            name: reader.read_var_string(252),
            code_version: reader.read_var_string(252),
            author: reader.read_var_string(252),
            email: reader.read_var_string(252),
            description: reader.read_var_string(65_536),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_and_flags() {
        let contract = ContractState {
            script: vec![0x51],
            param_list: vec![0x05, 0x05],
            return_type: 0x05,
            properties: ContractPropertyState::HAS_STORAGE | ContractPropertyState::IS_PAYABLE,
            name: "test".into(),
            code_version: "1.0".into(),
            author: "dev".into(),
            email: "dev@example.org".into(),
            description: String::new(),
        };
        let back: ContractState = neo_io::from_slice(&neo_io::to_vec(&contract).unwrap()).unwrap();
        assert_eq!(back, contract);
        assert!(back.has_storage());
        assert!(!back.has_dynamic_invoke());
        assert_eq!(back.script_hash(), UInt160::from_script(&[0x51]));
    }
}
