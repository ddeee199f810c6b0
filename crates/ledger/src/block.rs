//! Blocks, headers and the merkle tree over transaction hashes.

use crate::{LedgerError, Result};
use neo_core::{Transaction, UInt160, UInt256, Witness};
use neo_cryptography::{hash256, sha256};
use neo_io::{BinaryWriter, Error as IoError, MemoryReader, Serializable};
use once_cell::sync::OnceCell;

/// Computes the merkle root over `hashes` with the duplicate-last rule.
/// The root of an empty list is zero; a single hash is its own root.
pub fn merkle_root(hashes: &[UInt256]) -> UInt256 {
    if hashes.is_empty() {
        return UInt256::zero();
    }
    let mut layer: Vec<UInt256> = hashes.to_vec();
    while layer.len() > 1 {
        let mut next = Vec::with_capacity(layer.len().div_ceil(2));
        for pair in layer.chunks(2) {
            let left = pair[0];
            let right = if pair.len() == 2 { pair[1] } else { pair[0] };
            let mut data = [0u8; 64];
            data[..32].copy_from_slice(&left.to_array());
            data[32..].copy_from_slice(&right.to_array());
            next.push(UInt256::from(hash256(&data)));
        }
        layer = next;
    }
    layer[0]
}

/// A block header. The hash covers everything except the witness.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    pub version: u32,
    pub prev_hash: UInt256,
    pub merkle_root: UInt256,
    pub timestamp: u32,
    pub index: u32,
    pub consensus_data: u64,
    pub next_consensus: UInt160,
    pub witness: Witness,
}

impl Header {
    /// Serializes the hashed portion.
    pub fn serialize_unsigned(&self, writer: &mut BinaryWriter) {
        writer.write_u32(self.version);
        self.prev_hash.serialize(writer);
        self.merkle_root.serialize(writer);
        writer.write_u32(self.timestamp);
        writer.write_u32(self.index);
        writer.write_u64(self.consensus_data);
        self.next_consensus.serialize(writer);
    }

    fn unsigned_bytes(&self) -> Vec<u8> {
        let mut writer = BinaryWriter::new();
        self.serialize_unsigned(&mut writer);
        writer.into_bytes().unwrap_or_default()
    }

    /// The block hash: double SHA256 over the unsigned header.
    pub fn hash(&self) -> UInt256 {
        UInt256::from_data(&self.unsigned_bytes())
    }

    /// The digest the block witness signs.
    pub fn verification_hash(&self) -> [u8; 32] {
        sha256(&self.unsigned_bytes())
    }
}

impl Serializable for Header {
    fn serialize(&self, writer: &mut BinaryWriter) {
        self.serialize_unsigned(writer);
        writer.write_u8(1);
        self.witness.serialize(writer);
    }

    fn deserialize(reader: &mut MemoryReader) -> Self {
        let mut header = Header {
            version: reader.read_u32(),
            prev_hash: UInt256::deserialize(reader),
            merkle_root: UInt256::deserialize(reader),
            timestamp: reader.read_u32(),
            index: reader.read_u32(),
            consensus_data: reader.read_u64(),
            next_consensus: UInt160::deserialize(reader),
            witness: Witness::default(),
        };
        let padding = reader.read_u8();
        if padding != 1 && reader.error().is_none() {
            reader.fault(IoError::InvalidFormat(format!(
                "bad header padding byte {padding:#04x}"
            )));
            return header;
        }
        header.witness = Witness::deserialize(reader);
        header
    }
}

/// A full block: header plus ordered transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
    hash: OnceCell<UInt256>,
}

impl Block {
    /// Creates a block; the header's merkle root is not recomputed.
    pub fn new(header: Header, transactions: Vec<Transaction>) -> Self {
        Self {
            header,
            transactions,
            hash: OnceCell::new(),
        }
    }

    /// The block hash, memoized.
    pub fn hash(&self) -> UInt256 {
        *self.hash.get_or_init(|| self.header.hash())
    }

    /// The block height.
    pub fn index(&self) -> u32 {
        self.header.index
    }

    /// Recomputes the merkle root from the current transaction list and
    /// stores it in the header.
    pub fn rebuild_merkle_root(&mut self) {
        let hashes: Vec<UInt256> = self.transactions.iter().map(Transaction::hash).collect();
        self.header.merkle_root = merkle_root(&hashes);
    }

    /// Serializes header plus the transaction hash list only. Full
    /// restoration reads the transactions individually from the store.
    pub fn trim(&self) -> Result<Vec<u8>> {
        let mut writer = BinaryWriter::new();
        self.header.serialize(&mut writer);
        let hashes: Vec<UInt256> = self.transactions.iter().map(Transaction::hash).collect();
        writer.write_array(&hashes);
        writer.into_bytes().map_err(LedgerError::from)
    }
}

impl Serializable for Block {
    fn serialize(&self, writer: &mut BinaryWriter) {
        self.header.serialize(writer);
        writer.write_array(&self.transactions);
    }

    fn deserialize(reader: &mut MemoryReader) -> Self {
        Self {
            header: Header::deserialize(reader),
            transactions: reader.read_array_max(u16::MAX as usize),
            hash: OnceCell::new(),
        }
    }
}

/// A block restored from its trimmed form: the header and the transaction
/// hashes, without the transactions themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimmedBlock {
    pub header: Header,
    pub tx_hashes: Vec<UInt256>,
}

impl TrimmedBlock {
    /// Decodes the output of [`Block::trim`].
    pub fn from_trimmed(data: &[u8]) -> Result<Self> {
        let mut reader = MemoryReader::new(data);
        let header = Header::deserialize(&mut reader);
        let tx_hashes = reader.read_array_max(u16::MAX as usize);
        reader
            .finish(Self { header, tx_hashes })
            .map_err(LedgerError::from)
    }

    /// The block hash.
    pub fn hash(&self) -> UInt256 {
        self.header.hash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo_core::Fixed8;

    fn sample_block() -> Block {
        let mut block = Block::new(
            Header {
                version: 0,
                prev_hash: UInt256::from_data(b"prev"),
                merkle_root: UInt256::zero(),
                timestamp: 1_468_595_301,
                index: 1,
                consensus_data: 99,
                next_consensus: UInt160::from_script(b"consensus"),
                witness: Witness::new(vec![0x00], vec![0x51]),
            },
            vec![
                Transaction::new_miner(7),
                Transaction::new_invocation(vec![0x51], Fixed8::ZERO),
            ],
        );
        block.rebuild_merkle_root();
        block
    }

    #[test]
    fn merkle_root_rules() {
        assert_eq!(merkle_root(&[]), UInt256::zero());

        let single = UInt256::from_data(b"one");
        assert_eq!(merkle_root(&[single]), single);

        // Odd count duplicates the last hash.
        let a = UInt256::from_data(b"a");
        let b = UInt256::from_data(b"b");
        let c = UInt256::from_data(b"c");
        assert_eq!(merkle_root(&[a, b, c]), merkle_root(&[a, b, c, c]));
        assert_ne!(merkle_root(&[a, b]), merkle_root(&[b, a]));
    }

    #[test]
    fn block_round_trip() {
        let block = sample_block();
        let back: Block = neo_io::from_slice(&neo_io::to_vec(&block).unwrap()).unwrap();
        assert_eq!(back, block);
        assert_eq!(back.hash(), block.hash());
    }

    #[test]
    fn hash_ignores_witness() {
        let mut block = sample_block();
        let hash = block.hash();
        block.header.witness = Witness::default();
        assert_eq!(block.header.hash(), hash);
    }

    #[test]
    fn trim_round_trip_keeps_header_and_hashes() {
        let block = sample_block();
        let trimmed = TrimmedBlock::from_trimmed(&block.trim().unwrap()).unwrap();
        assert_eq!(trimmed.header, block.header);
        assert_eq!(
            trimmed.tx_hashes,
            block
                .transactions
                .iter()
                .map(Transaction::hash)
                .collect::<Vec<_>>()
        );
        assert_eq!(trimmed.hash(), block.hash());
    }

    #[test]
    fn bad_padding_byte_is_rejected() {
        let mut bytes = neo_io::to_vec(&sample_block().header).unwrap();
        // Corrupt the padding byte between the base fields and the witness.
        let padding_pos = 4 + 32 + 32 + 4 + 4 + 8 + 20;
        bytes[padding_pos] = 0x02;
        assert!(neo_io::from_slice::<Header>(&bytes).is_err());
    }
}
