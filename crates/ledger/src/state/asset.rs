//! Legacy UTXO asset state.

use neo_core::{AssetType, Fixed8, UInt160, UInt256};
use neo_cryptography::PublicKey;
use neo_io::{BinaryWriter, Error as IoError, MemoryReader, Serializable};

/// Registered UTXO asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub id: UInt256,
    pub asset_type: AssetType,
    pub name: String,
    pub amount: Fixed8,
    pub available: Fixed8,
    pub precision: u8,
    pub owner: PublicKey,
    pub admin: UInt160,
    pub issuer: UInt160,
    pub expiration: u32,
    pub is_frozen: bool,
}

impl Asset {
    /// Amount still issuable: total minus what is already in circulation.
    pub fn issuable(&self) -> Fixed8 {
        Fixed8::from_raw(self.amount.raw() - self.available.raw())
    }
}

impl Serializable for Asset {
    fn serialize(&self, writer: &mut BinaryWriter) {
        self.id.serialize(writer);
        writer.write_u8(self.asset_type as u8);
        writer.write_var_string(&self.name);
        self.amount.serialize(writer);
        self.available.serialize(writer);
        writer.write_u8(self.precision);
        self.owner.serialize(writer);
        self.admin.serialize(writer);
        self.issuer.serialize(writer);
        writer.write_u32(self.expiration);
        writer.write_bool(self.is_frozen);
    }

    fn deserialize(reader: &mut MemoryReader) -> Self {
        let id = UInt256::deserialize(reader);
        let type_byte = reader.read_u8();
        let asset_type = AssetType::from_byte(type_byte).unwrap_or_else(|| {
            reader.fault(IoError::InvalidFormat(format!(
                "unknown asset type {type_byte:#04x}"
            )));
            AssetType::Token
        });
        Self {
            id,
            asset_type,
            name: reader.read_var_string(1024),
            amount: Fixed8::deserialize(reader),
            available: Fixed8::deserialize(reader),
            precision: reader.read_u8(),
            owner: PublicKey::deserialize(reader),
            admin: UInt160::deserialize(reader),
            issuer: UInt160::deserialize(reader),
            expiration: reader.read_u32(),
            is_frozen: reader.read_bool(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let asset = Asset {
            id: UInt256::from_data(b"asset"),
            asset_type: AssetType::Token,
            name: "Token".to_string(),
            amount: Fixed8::from_int(1_000).unwrap(),
            available: Fixed8::from_int(250).unwrap(),
            precision: 8,
            owner: PublicKey::infinity(),
            admin: UInt160::from_script(b"admin"),
            issuer: UInt160::from_script(b"issuer"),
            expiration: 4_000_000,
            is_frozen: false,
        };
        let back: Asset = neo_io::from_slice(&neo_io::to_vec(&asset).unwrap()).unwrap();
        assert_eq!(back, asset);
        assert_eq!(asset.issuable(), Fixed8::from_int(750).unwrap());
    }
}
