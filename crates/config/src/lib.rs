//! Protocol settings shared by every component of the node.
//!
//! The settings are deserialized from the node's JSON configuration; the
//! defaults below describe a single-node private network and are what the
//! test chains run with.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Number of decimal places in a fixed-point amount.
pub const DECIMALS: u32 = 8;

/// One whole unit in fixed-point representation.
pub const FIXED8_FACTOR: i64 = 100_000_000;

/// Protocol-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ProtocolSettings {
    /// 32-bit network identifier mixed into witness-verification contexts.
    pub magic: u32,
    /// Byte prepended to a script hash during Base58Check address encoding.
    pub address_version: u8,
    /// Target interval between blocks, for the consensus layer.
    pub seconds_per_block: u32,
    /// Capacity of the memory pool.
    pub mem_pool_size: usize,
    /// Hex-encoded compressed public keys of the standby committee, in order.
    pub standby_validators: Vec<String>,
    /// Bootstrap peer addresses, consumed by the networking layer.
    pub seed_list: Vec<String>,
    /// Base system fee per transaction type, in whole units.
    pub system_fee: HashMap<String, i64>,
    /// Gates full block verification on import.
    pub verify_blocks: bool,
    /// Gates standalone transaction verification.
    pub verify_transactions: bool,
    /// Per-invocation free gas allowance, in 1e-8 units.
    pub free_gas_limit: i64,
    /// Hard cap on transactions in a block.
    pub max_transactions_per_block: usize,
    /// Cap on free (zero network fee) transactions in a block.
    pub max_free_transactions_per_block: usize,
    /// Size in bytes under which a transaction may be free.
    pub max_free_transaction_size: usize,
    /// Fee per byte beyond the free size, in 1e-8 units.
    pub fee_per_extra_byte: i64,
}

impl ProtocolSettings {
    /// Returns the base system fee for a transaction type name, in whole
    /// units. Types not present in the table are free.
    pub fn system_fee_for(&self, tx_type: &str) -> i64 {
        self.system_fee.get(tx_type).copied().unwrap_or(0)
    }

    /// Parses settings from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        let mut system_fee = HashMap::new();
        system_fee.insert("EnrollmentTransaction".to_string(), 1000);
        system_fee.insert("IssueTransaction".to_string(), 500);
        system_fee.insert("PublishTransaction".to_string(), 500);
        system_fee.insert("RegisterTransaction".to_string(), 10_000);

        Self {
            magic: 56753,
            address_version: 23,
            seconds_per_block: 15,
            mem_pool_size: 50_000,
            standby_validators: vec![
                "02b3622bf4017bdfe317c58aed5f4c753f206b7db896046fa7d774bbc4bf7f8dc2".to_string(),
                "02103a7f7dd016558597f7960d27c516a4394fd968b9e65155eb4b013e4040406e".to_string(),
                "03d90c07df63e690ce77912e10ab51acc944b66860237b608c4f8f8309e71ee699".to_string(),
                "02a7bc55fe8684e0119768d104ba30795bdcc86619e864add26156723ed185cd62".to_string(),
            ],
            seed_list: Vec::new(),
            system_fee,
            verify_blocks: true,
            verify_transactions: false,
            free_gas_limit: 10 * FIXED8_FACTOR,
            max_transactions_per_block: 500,
            max_free_transactions_per_block: 20,
            max_free_transaction_size: 1024,
            fee_per_extra_byte: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_a_private_network() {
        let settings = ProtocolSettings::default();
        assert_eq!(settings.address_version, 23);
        assert_eq!(settings.standby_validators.len(), 4);
        assert_eq!(settings.system_fee_for("RegisterTransaction"), 10_000);
        assert_eq!(settings.system_fee_for("ContractTransaction"), 0);
    }

    #[test]
    fn json_round_trip_preserves_fields() {
        let settings = ProtocolSettings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let back = ProtocolSettings::from_json(&json).unwrap();
        assert_eq!(back.magic, settings.magic);
        assert_eq!(back.standby_validators, settings.standby_validators);
        assert_eq!(back.free_gas_limit, settings.free_gas_limit);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let json = r#"{"Magic": 7630401, "SecondsPerBlock": 20}"#;
        let settings = ProtocolSettings::from_json(json).unwrap();
        assert_eq!(settings.magic, 7_630_401);
        assert_eq!(settings.seconds_per_block, 20);
        assert_eq!(settings.address_version, 23);
    }
}
