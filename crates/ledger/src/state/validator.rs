//! Validator state and committee-size tallies.

use neo_core::Fixed8;
use neo_cryptography::PublicKey;
use neo_io::{BinaryWriter, MemoryReader, Serializable};

/// Largest committee size that can be voted for.
pub const MAX_VALIDATORS: usize = 1024;

/// A registered (or previously-voted) validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validator {
    pub public_key: PublicKey,
    pub registered: bool,
    pub votes: Fixed8,
}

impl Validator {
    /// A fresh, unregistered record for `public_key`.
    pub fn new(public_key: PublicKey) -> Self {
        Self {
            public_key,
            registered: false,
            votes: Fixed8::ZERO,
        }
    }

    /// Registered candidates with any votes participate in selection.
    pub fn registered_and_has_votes(&self) -> bool {
        self.registered && self.votes > Fixed8::ZERO
    }

    /// A record that holds no information may be deleted.
    pub fn is_empty(&self) -> bool {
        !self.registered && self.votes == Fixed8::ZERO
    }
}

impl Serializable for Validator {
    fn serialize(&self, writer: &mut BinaryWriter) {
        self.public_key.serialize(writer);
        writer.write_bool(self.registered);
        self.votes.serialize(writer);
    }

    fn deserialize(reader: &mut MemoryReader) -> Self {
        Self {
            public_key: PublicKey::deserialize(reader),
            registered: reader.read_bool(),
            votes: Fixed8::deserialize(reader),
        }
    }
}

/// Vote weight accumulated per prospective committee size. A vote for `N`
/// validators is stored at index `N - 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorsCount {
    counts: Vec<i64>,
}

impl Default for ValidatorsCount {
    fn default() -> Self {
        Self {
            counts: vec![0; MAX_VALIDATORS],
        }
    }
}

impl ValidatorsCount {
    /// Creates an all-zero tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Indicates that no vote has ever been recorded.
    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&c| c == 0)
    }

    /// Adds `weight` (possibly negative) to the tally for committee size
    /// `size`.
    pub fn adjust(&mut self, size: usize, weight: Fixed8) {
        if size == 0 || size > MAX_VALIDATORS {
            return;
        }
        self.counts[size - 1] += weight.raw();
    }

    /// The committee size selected by weighted average, ignoring the bottom
    /// and top quarters of the vote weight.
    pub fn weighted_average(&self) -> usize {
        const LOWER_THRESHOLD: i128 = 25;
        const UPPER_THRESHOLD: i128 = 75;

        let overall: i128 = self.counts.iter().map(|&c| c as i128).sum();
        if overall <= 0 {
            return 0;
        }

        let mut sum_weight: i128 = 0;
        let mut sum_value: i128 = 0;
        let mut sliding_sum: i128 = 0;
        let mut sliding_ratio: i128 = 0;

        for (i, &count) in self.counts.iter().enumerate() {
            if sliding_ratio >= UPPER_THRESHOLD {
                break;
            }
            let mut weight = count as i128;
            sliding_sum += weight;
            let previous_ratio = sliding_ratio;
            sliding_ratio = sliding_sum * 100 / overall;

            if sliding_ratio <= LOWER_THRESHOLD {
                continue;
            }
            if previous_ratio < LOWER_THRESHOLD {
                if sliding_ratio > UPPER_THRESHOLD {
                    weight = (UPPER_THRESHOLD - LOWER_THRESHOLD) * overall / 100;
                } else {
                    weight = sliding_sum - LOWER_THRESHOLD * overall / 100;
                }
            } else if sliding_ratio > UPPER_THRESHOLD {
                weight = UPPER_THRESHOLD * overall / 100 - sliding_sum + weight;
            }

            sum_weight += weight;
            sum_value += weight * (i as i128 + 1);
        }
        if sum_value == 0 || sum_weight == 0 {
            return 0;
        }
        (sum_value / sum_weight) as usize
    }
}

impl Serializable for ValidatorsCount {
    fn serialize(&self, writer: &mut BinaryWriter) {
        // Sparse encoding: (index, weight) pairs for non-zero entries.
        let non_zero: Vec<(u32, i64)> = self
            .counts
            .iter()
            .enumerate()
            .filter(|(_, &c)| c != 0)
            .map(|(i, &c)| (i as u32, c))
            .collect();
        writer.write_var_uint(non_zero.len() as u64);
        for (index, count) in non_zero {
            writer.write_u32(index);
            writer.write_i64(count);
        }
    }

    fn deserialize(reader: &mut MemoryReader) -> Self {
        let mut counts = vec![0i64; MAX_VALIDATORS];
        let entries = reader.read_var_uint(MAX_VALIDATORS as u64) as usize;
        for _ in 0..entries {
            if reader.error().is_some() {
                break;
            }
            let index = reader.read_u32() as usize;
            let count = reader.read_i64();
            if index < MAX_VALIDATORS {
                counts[index] = count;
            }
        }
        Self { counts }
    }
}
