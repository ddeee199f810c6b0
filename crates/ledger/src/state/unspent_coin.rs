//! Unspent-coin tracking for the UTXO subsystem.

use bitflags::bitflags;
use neo_core::Output;
use neo_io::{BinaryWriter, MemoryReader, Serializable};

bitflags! {
    /// Lifecycle flags of a single transaction output. An empty value means
    /// the output is confirmed and spendable.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CoinState: u8 {
        const SPENT = 0x02;
        const CLAIMED = 0x08;
        const FROZEN = 0x20;
    }
}

/// The recorded state of one output: the output itself, the height at which
/// it was spent (zero while unspent) and its lifecycle flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputState {
    pub output: Output,
    pub spend_height: u32,
    pub state: CoinState,
}

impl Serializable for OutputState {
    fn serialize(&self, writer: &mut BinaryWriter) {
        self.output.serialize(writer);
        writer.write_u32(self.spend_height);
        writer.write_u8(self.state.bits());
    }

    fn deserialize(reader: &mut MemoryReader) -> Self {
        Self {
            output: Output::deserialize(reader),
            spend_height: reader.read_u32(),
            state: CoinState::from_bits_truncate(reader.read_u8()),
        }
    }
}

/// Per-transaction record of which outputs remain spendable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnspentCoin {
    /// Height of the block that confirmed the transaction.
    pub height: u32,
    /// One entry per output of the transaction, in output order.
    pub states: Vec<OutputState>,
}

impl UnspentCoin {
    /// Builds the record for a freshly-confirmed transaction.
    pub fn new(height: u32, outputs: &[Output]) -> Self {
        Self {
            height,
            states: outputs
                .iter()
                .map(|output| OutputState {
                    output: *output,
                    spend_height: 0,
                    state: CoinState::empty(),
                })
                .collect(),
        }
    }
}

impl Serializable for UnspentCoin {
    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_u32(self.height);
        writer.write_array(&self.states);
    }

    fn deserialize(reader: &mut MemoryReader) -> Self {
        Self {
            height: reader.read_u32(),
            states: reader.read_array(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo_core::{Fixed8, UInt160, UInt256};

    #[test]
    fn round_trip() {
        let outputs = [Output::new(
            UInt256::from_data(b"asset"),
            Fixed8::from_int(9).unwrap(),
            UInt160::from_script(b"dest"),
        )];
        let mut coin = UnspentCoin::new(12, &outputs);
        coin.states[0].state = CoinState::SPENT;
        coin.states[0].spend_height = 15;

        let back: UnspentCoin = neo_io::from_slice(&neo_io::to_vec(&coin).unwrap()).unwrap();
        assert_eq!(back, coin);
    }

    #[test]
    fn fresh_outputs_are_spendable() {
        let coin = UnspentCoin::new(1, &[Output::default()]);
        assert!(coin.states[0].state.is_empty());
    }
}
