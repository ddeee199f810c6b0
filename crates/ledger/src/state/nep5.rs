//! NEP-5 balance trackers and transfer logs.

use neo_core::{UInt160, UInt256};
use neo_io::{BinaryWriter, MemoryReader, Serializable};
use std::collections::BTreeMap;

/// Transfers per log page; a full page rolls the account over to the next
/// page index.
pub const TRANSFER_BATCH_SIZE: usize = 128;

/// Last-known balance of one token for one account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Nep5Tracker {
    pub balance: i64,
    pub last_updated_block: u32,
}

impl Serializable for Nep5Tracker {
    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_i64(self.balance);
        writer.write_u32(self.last_updated_block);
    }

    fn deserialize(reader: &mut MemoryReader) -> Self {
        Self {
            balance: reader.read_i64(),
            last_updated_block: reader.read_u32(),
        }
    }
}

/// All NEP-5 balances of one account, keyed by token script hash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Nep5Balances {
    pub trackers: BTreeMap<UInt160, Nep5Tracker>,
    /// Index of the transfer-log page currently being filled.
    pub next_transfer_batch: u32,
}

impl Nep5Balances {
    /// An empty balance record.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Serializable for Nep5Balances {
    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_u32(self.next_transfer_batch);
        writer.write_var_uint(self.trackers.len() as u64);
        for (asset, tracker) in &self.trackers {
            asset.serialize(writer);
            tracker.serialize(writer);
        }
    }

    fn deserialize(reader: &mut MemoryReader) -> Self {
        let next_transfer_batch = reader.read_u32();
        let count = reader.read_var_uint(u16::MAX as u64) as usize;
        let mut trackers = BTreeMap::new();
        for _ in 0..count {
            if reader.error().is_some() {
                break;
            }
            let asset = UInt160::deserialize(reader);
            let tracker = Nep5Tracker::deserialize(reader);
            trackers.insert(asset, tracker);
        }
        Self {
            trackers,
            next_transfer_batch,
        }
    }
}

/// One NEP-5 transfer as seen from a single account's log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Nep5Transfer {
    pub asset: UInt160,
    pub from: UInt160,
    pub to: UInt160,
    pub amount: i64,
    pub block: u32,
    pub timestamp: u32,
    pub tx: UInt256,
}

/// Serialized size of a single transfer record.
const TRANSFER_SIZE: usize = 20 + 20 + 20 + 8 + 4 + 4 + 32;

impl Serializable for Nep5Transfer {
    fn serialize(&self, writer: &mut BinaryWriter) {
        self.asset.serialize(writer);
        self.from.serialize(writer);
        self.to.serialize(writer);
        writer.write_i64(self.amount);
        writer.write_u32(self.block);
        writer.write_u32(self.timestamp);
        self.tx.serialize(writer);
    }

    fn deserialize(reader: &mut MemoryReader) -> Self {
        Self {
            asset: UInt160::deserialize(reader),
            from: UInt160::deserialize(reader),
            to: UInt160::deserialize(reader),
            amount: reader.read_i64(),
            block: reader.read_u32(),
            timestamp: reader.read_u32(),
            tx: UInt256::deserialize(reader),
        }
    }
}

/// A page of an account's transfer history: raw fixed-size records appended
/// back to back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Nep5TransferLog {
    pub raw: Vec<u8>,
}

impl Nep5TransferLog {
    /// Appends one transfer to the page.
    pub fn append(&mut self, transfer: &Nep5Transfer) -> neo_io::Result<()> {
        let mut writer = BinaryWriter::new();
        transfer.serialize(&mut writer);
        self.raw.extend_from_slice(&writer.into_bytes()?);
        Ok(())
    }

    /// The number of records in the page.
    pub fn len(&self) -> usize {
        self.raw.len() / TRANSFER_SIZE
    }

    /// Indicates an empty page.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Decodes every record in the page, in append order.
    pub fn transfers(&self) -> neo_io::Result<Vec<Nep5Transfer>> {
        let mut reader = MemoryReader::new(&self.raw);
        let mut transfers = Vec::with_capacity(self.len());
        for _ in 0..self.len() {
            transfers.push(Nep5Transfer::deserialize(&mut reader));
        }
        reader.finish(transfers)
    }
}
