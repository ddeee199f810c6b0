// Copyright (C) 2015-2025 The Neo Project.
//
// mod.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! The transaction model.
//!
//! A transaction is a tagged union: the type byte selects the
//! exclusive-data codec, followed by the shared attribute/input/output
//! sections and the witnesses. The hash covers everything except the
//! witnesses.

pub mod attribute;
pub mod input;
pub mod output;

pub use attribute::{Attribute, AttributeUsage};
pub use input::{group_inputs_by_prev_hash, Input};
pub use output::Output;

use crate::{Fixed8, UInt160, UInt256, Witness};
use neo_cryptography::PublicKey;
use neo_io::{BinaryWriter, Error as IoError, MemoryReader, Serializable};
use once_cell::sync::OnceCell;

/// Maximum size of an invocation or contract script carried in a transaction.
pub const MAX_TX_SCRIPT_SIZE: usize = 65_536;

/// Transaction type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TransactionType {
    Miner = 0x00,
    Issue = 0x01,
    Claim = 0x02,
    Enrollment = 0x20,
    Register = 0x40,
    Contract = 0x80,
    Publish = 0xd0,
    Invocation = 0xd1,
}

impl TransactionType {
    /// Decodes a type byte.
    pub fn from_byte(value: u8) -> Option<Self> {
        use TransactionType::*;
        Some(match value {
            0x00 => Miner,
            0x01 => Issue,
            0x02 => Claim,
            0x20 => Enrollment,
            0x40 => Register,
            0x80 => Contract,
            0xd0 => Publish,
            0xd1 => Invocation,
            _ => return None,
        })
    }

    /// The name used to key per-type system fees in the configuration.
    pub fn config_name(self) -> &'static str {
        use TransactionType::*;
        match self {
            Miner => "MinerTransaction",
            Issue => "IssueTransaction",
            Claim => "ClaimTransaction",
            Enrollment => "EnrollmentTransaction",
            Register => "RegisterTransaction",
            Contract => "ContractTransaction",
            Publish => "PublishTransaction",
            Invocation => "InvocationTransaction",
        }
    }
}

/// Legacy UTXO asset classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AssetType {
    GoverningToken = 0x00,
    UtilityToken = 0x01,
    Currency = 0x08,
    Token = 0x60,
    Share = 0x90,
    Invoice = 0x98,
}

impl AssetType {
    /// Decodes an asset type byte.
    pub fn from_byte(value: u8) -> Option<Self> {
        use AssetType::*;
        Some(match value {
            0x00 => GoverningToken,
            0x01 => UtilityToken,
            0x08 => Currency,
            0x60 => Token,
            0x90 => Share,
            0x98 => Invoice,
            _ => return None,
        })
    }
}

/// Exclusive data of a register transaction: a new UTXO asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterData {
    pub asset_type: AssetType,
    pub name: String,
    pub amount: Fixed8,
    pub precision: u8,
    pub owner: PublicKey,
    pub admin: UInt160,
}

/// Exclusive data of a publish transaction: a deployed contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishData {
    pub script: Vec<u8>,
    pub param_list: Vec<u8>,
    pub return_type: u8,
    pub needs_storage: bool,
    pub name: String,
    pub code_version: String,
    pub author: String,
    pub email: String,
    pub description: String,
}

/// Type-specific transaction payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionData {
    Miner { nonce: u32 },
    Issue,
    Claim { claims: Vec<Input> },
    Enrollment { public_key: PublicKey },
    Register(Box<RegisterData>),
    Contract,
    Publish(Box<PublishData>),
    Invocation { script: Vec<u8>, gas: Fixed8 },
}

impl TransactionData {
    /// The type tag matching this payload.
    pub fn tx_type(&self) -> TransactionType {
        match self {
            TransactionData::Miner { .. } => TransactionType::Miner,
            TransactionData::Issue => TransactionType::Issue,
            TransactionData::Claim { .. } => TransactionType::Claim,
            TransactionData::Enrollment { .. } => TransactionType::Enrollment,
            TransactionData::Register(_) => TransactionType::Register,
            TransactionData::Contract => TransactionType::Contract,
            TransactionData::Publish(_) => TransactionType::Publish,
            TransactionData::Invocation { .. } => TransactionType::Invocation,
        }
    }
}

/// A ledger transaction.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub version: u8,
    pub data: TransactionData,
    pub attributes: Vec<Attribute>,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    pub witnesses: Vec<Witness>,
    hash: OnceCell<UInt256>,
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.data == other.data
            && self.attributes == other.attributes
            && self.inputs == other.inputs
            && self.outputs == other.outputs
            && self.witnesses == other.witnesses
    }
}

impl Eq for Transaction {}

impl Transaction {
    /// Creates a transaction with the given payload and version.
    pub fn new(data: TransactionData, version: u8) -> Self {
        Self {
            version,
            data,
            attributes: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            witnesses: Vec::new(),
            hash: OnceCell::new(),
        }
    }

    /// Creates a version-1 invocation transaction.
    pub fn new_invocation(script: Vec<u8>, gas: Fixed8) -> Self {
        Self::new(TransactionData::Invocation { script, gas }, 1)
    }

    /// Creates a miner transaction with the given nonce.
    pub fn new_miner(nonce: u32) -> Self {
        Self::new(TransactionData::Miner { nonce }, 0)
    }

    /// The type tag of this transaction.
    pub fn tx_type(&self) -> TransactionType {
        self.data.tx_type()
    }

    /// The transaction hash: double SHA256 over the unsigned form.
    /// Memoized; callers must not mutate a transaction after hashing it.
    pub fn hash(&self) -> UInt256 {
        *self.hash.get_or_init(|| {
            let mut writer = BinaryWriter::new();
            self.serialize_unsigned(&mut writer);
            let bytes = writer.into_bytes().unwrap_or_default();
            UInt256::from_data(&bytes)
        })
    }

    /// The serialized size in bytes, witnesses included.
    pub fn size(&self) -> usize {
        neo_io::to_vec(self).map(|b| b.len()).unwrap_or(0)
    }

    /// The gas budget of an invocation transaction, zero for other types.
    pub fn invocation_gas(&self) -> Fixed8 {
        match &self.data {
            TransactionData::Invocation { gas, .. } => *gas,
            _ => Fixed8::ZERO,
        }
    }

    /// Serializes everything the hash covers.
    pub fn serialize_unsigned(&self, writer: &mut BinaryWriter) {
        writer.write_u8(self.tx_type() as u8);
        writer.write_u8(self.version);
        self.serialize_exclusive(writer);
        writer.write_array(&self.attributes);
        writer.write_array(&self.inputs);
        writer.write_array(&self.outputs);
    }

    fn serialize_exclusive(&self, writer: &mut BinaryWriter) {
        match &self.data {
            TransactionData::Miner { nonce } => writer.write_u32(*nonce),
            TransactionData::Issue | TransactionData::Contract => {}
            TransactionData::Claim { claims } => writer.write_array(claims),
            TransactionData::Enrollment { public_key } => public_key.serialize(writer),
            TransactionData::Register(data) => {
                writer.write_u8(data.asset_type as u8);
                writer.write_var_string(&data.name);
                data.amount.serialize(writer);
                writer.write_u8(data.precision);
                data.owner.serialize(writer);
                data.admin.serialize(writer);
            }
            TransactionData::Publish(data) => {
                writer.write_var_bytes(&data.script);
                writer.write_var_bytes(&data.param_list);
                writer.write_u8(data.return_type);
                if self.version >= 1 {
                    writer.write_bool(data.needs_storage);
                }
                writer.write_var_string(&data.name);
                writer.write_var_string(&data.code_version);
                writer.write_var_string(&data.author);
                writer.write_var_string(&data.email);
                writer.write_var_string(&data.description);
            }
            TransactionData::Invocation { script, gas } => {
                writer.write_var_bytes(script);
                if self.version >= 1 {
                    gas.serialize(writer);
                }
            }
        }
    }

    fn deserialize_exclusive(
        tx_type: TransactionType,
        version: u8,
        reader: &mut MemoryReader,
    ) -> TransactionData {
        match tx_type {
            TransactionType::Miner => TransactionData::Miner {
                nonce: reader.read_u32(),
            },
            TransactionType::Issue => TransactionData::Issue,
            TransactionType::Contract => TransactionData::Contract,
            TransactionType::Claim => TransactionData::Claim {
                claims: reader.read_array(),
            },
            TransactionType::Enrollment => TransactionData::Enrollment {
                public_key: PublicKey::deserialize(reader),
            },
            TransactionType::Register => {
                let type_byte = reader.read_u8();
                let asset_type = match AssetType::from_byte(type_byte) {
                    Some(t) => t,
                    None => {
                        reader.fault(IoError::InvalidFormat(format!(
                            "unknown asset type {type_byte:#04x}"
                        )));
                        AssetType::Token
                    }
                };
                TransactionData::Register(Box::new(RegisterData {
                    asset_type,
                    name: reader.read_var_string(1024),
                    amount: Fixed8::deserialize(reader),
                    precision: reader.read_u8(),
                    owner: PublicKey::deserialize(reader),
                    admin: UInt160::deserialize(reader),
                }))
            }
            TransactionType::Publish => TransactionData::Publish(Box::new(PublishData {
                script: reader.read_var_bytes(MAX_TX_SCRIPT_SIZE),
                param_list: reader.read_var_bytes(252),
                return_type: reader.read_u8(),
                needs_storage: if version >= 1 { reader.read_bool() } else { false },
                name: reader.read_var_string(252),
                code_version: reader.read_var_string(252),
                author: reader.read_var_string(252),
                email: reader.read_var_string(252),
                description: reader.read_var_string(65_536),
            })),
            TransactionType::Invocation => {
                let script = reader.read_var_bytes(MAX_TX_SCRIPT_SIZE);
                let gas = if version >= 1 {
                    Fixed8::deserialize(reader)
                } else {
                    Fixed8::ZERO
                };
                if script.is_empty() && reader.error().is_none() {
                    reader.fault(IoError::InvalidFormat("empty invocation script".into()));
                }
                if gas.is_negative() && reader.error().is_none() {
                    reader.fault(IoError::InvalidFormat("negative gas budget".into()));
                }
                TransactionData::Invocation { script, gas }
            }
        }
    }
}

impl Serializable for Transaction {
    fn serialize(&self, writer: &mut BinaryWriter) {
        self.serialize_unsigned(writer);
        writer.write_array(&self.witnesses);
    }

    fn deserialize(reader: &mut MemoryReader) -> Self {
        let type_byte = reader.read_u8();
        let Some(tx_type) = TransactionType::from_byte(type_byte) else {
            reader.fault(IoError::InvalidFormat(format!(
                "unknown transaction type {type_byte:#04x}"
            )));
            return Transaction::new_miner(0);
        };
        let version = reader.read_u8();
        let data = Self::deserialize_exclusive(tx_type, version, reader);
        Self {
            version,
            data,
            attributes: reader.read_array_max(16),
            inputs: reader.read_array(),
            outputs: reader.read_array(),
            witnesses: reader.read_array(),
            hash: OnceCell::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_invocation() -> Transaction {
        let mut tx = Transaction::new_invocation(vec![0x51], Fixed8::from_int(1).unwrap());
        tx.attributes
            .push(Attribute::new(AttributeUsage::Script, vec![9u8; 20]));
        tx.inputs.push(Input::new(UInt256::from_data(b"prev"), 0));
        tx.outputs.push(Output::new(
            UInt256::from_data(b"asset"),
            Fixed8::from_int(5).unwrap(),
            UInt160::from_script(b"dest"),
        ));
        tx.witnesses.push(Witness::new(vec![0x00], vec![0x51]));
        tx
    }

    #[test]
    fn round_trip_preserves_every_section() {
        let tx = sample_invocation();
        let bytes = neo_io::to_vec(&tx).unwrap();
        let back: Transaction = neo_io::from_slice(&bytes).unwrap();
        assert_eq!(back, tx);
        assert_eq!(back.hash(), tx.hash());
    }

    #[test]
    fn hash_ignores_witnesses() {
        let mut with = sample_invocation();
        let mut without = sample_invocation();
        without.witnesses.clear();
        assert_eq!(with.hash(), without.hash());
        // but the full serialization differs
        with.witnesses.push(Witness::default());
        assert_ne!(neo_io::to_vec(&with).unwrap(), neo_io::to_vec(&without).unwrap());
    }

    #[test]
    fn miner_nonce_round_trip() {
        let tx = Transaction::new_miner(0xdead_beef);
        let back: Transaction = neo_io::from_slice(&neo_io::to_vec(&tx).unwrap()).unwrap();
        assert_eq!(back.data, TransactionData::Miner { nonce: 0xdead_beef });
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(neo_io::from_slice::<Transaction>(&[0x05, 0x00]).is_err());
    }

    #[test]
    fn claim_round_trip() {
        let mut tx = Transaction::new(
            TransactionData::Claim {
                claims: vec![Input::new(UInt256::from_data(b"c"), 1)],
            },
            0,
        );
        tx.witnesses.push(Witness::new(vec![], vec![0x51]));
        let back: Transaction = neo_io::from_slice(&neo_io::to_vec(&tx).unwrap()).unwrap();
        assert_eq!(back, tx);
    }

    #[test]
    fn invocation_v0_has_no_gas_field() {
        let tx = Transaction::new(
            TransactionData::Invocation {
                script: vec![0x51],
                gas: Fixed8::ZERO,
            },
            0,
        );
        let bytes = neo_io::to_vec(&tx).unwrap();
        // type, version, varlen(1), script, attrs(0), ins(0), outs(0), wits(0)
        assert_eq!(bytes.len(), 1 + 1 + 1 + 1 + 1 + 1 + 1 + 1);
    }
}
