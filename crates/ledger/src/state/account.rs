//! Account state.

use neo_core::{Fixed8, UInt160, UInt256};
use neo_cryptography::PublicKey;
use neo_io::{BinaryWriter, MemoryReader, Serializable};
use std::collections::BTreeMap;

/// Balance of the governing token, with the height at which it last
/// changed. The height drives claimable-gas accrual.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GoverningBalance {
    pub balance: i64,
    pub balance_height: u32,
}

/// Per-account ledger state.
///
/// Legacy UTXO asset balances live in `balances`; the native governing and
/// utility token balances are tracked separately because they accrue and
/// distribute gas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub version: u8,
    pub script_hash: UInt160,
    pub is_frozen: bool,
    pub votes: Vec<PublicKey>,
    pub balances: BTreeMap<UInt256, Fixed8>,
    pub neo: GoverningBalance,
    pub gas_balance: i64,
}

impl Account {
    /// A fresh account for `script_hash` with empty balances.
    pub fn new(script_hash: UInt160) -> Self {
        Self {
            version: 0,
            script_hash,
            is_frozen: false,
            votes: Vec::new(),
            balances: BTreeMap::new(),
            neo: GoverningBalance::default(),
            gas_balance: 0,
        }
    }

    /// The balance held in a legacy UTXO asset.
    pub fn balance_of(&self, asset_id: &UInt256) -> Fixed8 {
        self.balances.get(asset_id).copied().unwrap_or(Fixed8::ZERO)
    }

    /// Adds `delta` (possibly negative) to a legacy asset balance, dropping
    /// the entry when it reaches zero.
    pub fn adjust_balance(&mut self, asset_id: UInt256, delta: Fixed8) {
        let updated = Fixed8::from_raw(self.balance_of(&asset_id).raw() + delta.raw());
        if updated == Fixed8::ZERO {
            self.balances.remove(&asset_id);
        } else {
            self.balances.insert(asset_id, updated);
        }
    }
}

impl Serializable for Account {
    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_u8(self.version);
        self.script_hash.serialize(writer);
        writer.write_bool(self.is_frozen);
        writer.write_var_uint(self.votes.len() as u64);
        for vote in &self.votes {
            vote.serialize(writer);
        }
        writer.write_var_uint(self.balances.len() as u64);
        for (asset_id, amount) in &self.balances {
            asset_id.serialize(writer);
            amount.serialize(writer);
        }
        writer.write_i64(self.neo.balance);
        writer.write_u32(self.neo.balance_height);
        writer.write_i64(self.gas_balance);
    }

    fn deserialize(reader: &mut MemoryReader) -> Self {
        let version = reader.read_u8();
        let script_hash = UInt160::deserialize(reader);
        let is_frozen = reader.read_bool();
        let vote_count = reader.read_var_uint(1024) as usize;
        let mut votes = Vec::with_capacity(vote_count);
        for _ in 0..vote_count {
            if reader.error().is_some() {
                break;
            }
            votes.push(PublicKey::deserialize(reader));
        }
        let balance_count = reader.read_var_uint(u16::MAX as u64) as usize;
        let mut balances = BTreeMap::new();
        for _ in 0..balance_count {
            if reader.error().is_some() {
                break;
            }
            let asset_id = UInt256::deserialize(reader);
            let amount = Fixed8::deserialize(reader);
            balances.insert(asset_id, amount);
        }
        Self {
            version,
            script_hash,
            is_frozen,
            votes,
            balances,
            neo: GoverningBalance {
                balance: reader.read_i64(),
                balance_height: reader.read_u32(),
            },
            gas_balance: reader.read_i64(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let mut account = Account::new(UInt160::from_script(b"acc"));
        account.votes.push(
            PublicKey::from_hex(
                "02b3622bf4017bdfe317c58aed5f4c753f206b7db896046fa7d774bbc4bf7f8dc2",
            )
            .unwrap(),
        );
        account
            .balances
            .insert(UInt256::from_data(b"asset"), Fixed8::from_int(3).unwrap());
        account.neo = GoverningBalance {
            balance: 100,
            balance_height: 7,
        };
        account.gas_balance = 42;

        let back: Account = neo_io::from_slice(&neo_io::to_vec(&account).unwrap()).unwrap();
        assert_eq!(back, account);
    }

    #[test]
    fn zero_balances_are_dropped() {
        let mut account = Account::new(UInt160::zero());
        let asset = UInt256::from_data(b"asset");
        account.adjust_balance(asset, Fixed8::from_int(5).unwrap());
        account.adjust_balance(asset, Fixed8::from_int(-5).unwrap());
        assert!(account.balances.is_empty());
    }
}
