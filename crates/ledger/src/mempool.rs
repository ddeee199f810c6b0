//! The memory pool of pending transactions.

use crate::block::Block;
use crate::{LedgerError, Result};
use neo_core::{Fixed8, Transaction, UInt256};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Pool admission priority: higher fee density first, then absolute fee,
/// then arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Priority {
    fee_per_byte: i64,
    network_fee: i64,
    /// Monotonic arrival sequence; earlier arrivals win ties.
    arrival: u64,
    hash: UInt256,
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.fee_per_byte
            .cmp(&other.fee_per_byte)
            .then_with(|| self.network_fee.cmp(&other.network_fee))
            .then_with(|| other.arrival.cmp(&self.arrival))
            .then_with(|| self.hash.cmp(&other.hash))
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// One pooled transaction with its priority key.
#[derive(Debug, Clone)]
pub struct PoolItem {
    pub transaction: Transaction,
    pub network_fee: Fixed8,
    priority: Priority,
}

#[derive(Default)]
struct PoolInner {
    verified: HashMap<UInt256, PoolItem>,
    ordered: BTreeSet<Priority>,
    unverified: HashMap<UInt256, PoolItem>,
    arrivals: u64,
}

/// A bounded collection of pending transactions ordered by fee priority.
/// After a reorg, surviving transactions move to an unverified set and are
/// re-verified lazily before their next inclusion.
pub struct MemPool {
    capacity: usize,
    inner: Mutex<PoolInner>,
}

impl MemPool {
    /// Creates a pool holding at most `capacity` verified transactions.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(PoolInner::default()),
        }
    }

    /// The number of verified transactions in the pool.
    pub fn len(&self) -> usize {
        self.inner.lock().verified.len()
    }

    /// Indicates an empty verified set.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().verified.is_empty()
    }

    /// Indicates whether `hash` is pooled, verified or not.
    pub fn contains(&self, hash: &UInt256) -> bool {
        let inner = self.inner.lock();
        inner.verified.contains_key(hash) || inner.unverified.contains_key(hash)
    }

    /// Admits a verified transaction. Duplicates are rejected; when the
    /// pool is full the new transaction must beat the worst pooled one,
    /// which is then evicted.
    pub fn try_add(&self, transaction: Transaction, network_fee: Fixed8) -> Result<()> {
        let hash = transaction.hash();
        let size = transaction.size().max(1);
        let mut inner = self.inner.lock();
        if inner.verified.contains_key(&hash) || inner.unverified.contains_key(&hash) {
            return Err(LedgerError::Pool(format!("{hash} is already pooled")));
        }

        let priority = Priority {
            fee_per_byte: network_fee.raw() / size as i64,
            network_fee: network_fee.raw(),
            arrival: inner.arrivals,
            hash,
        };
        inner.arrivals += 1;

        if inner.verified.len() >= self.capacity {
            let worst = match inner.ordered.iter().next() {
                Some(worst) => *worst,
                None => return Err(LedgerError::Pool("pool capacity is zero".into())),
            };
            if priority <= worst {
                return Err(LedgerError::Pool(format!(
                    "{hash} does not beat the worst pooled transaction"
                )));
            }
            inner.ordered.remove(&worst);
            inner.verified.remove(&worst.hash);
            debug!(evicted = %worst.hash, "pool full, evicted the worst transaction");
        }

        inner.ordered.insert(priority);
        inner.verified.insert(
            hash,
            PoolItem {
                transaction,
                network_fee,
                priority,
            },
        );
        Ok(())
    }

    /// Removes every transaction included in `block`, from both sets.
    pub fn remove_for_block(&self, block: &Block) {
        let mut inner = self.inner.lock();
        for tx in &block.transactions {
            let hash = tx.hash();
            if let Some(item) = inner.verified.remove(&hash) {
                inner.ordered.remove(&item.priority);
            }
            inner.unverified.remove(&hash);
        }
    }

    /// Moves every verified transaction to the unverified set, to be
    /// re-verified lazily after a reorg.
    pub fn invalidate_all(&self) {
        let mut inner = self.inner.lock();
        inner.ordered.clear();
        let drained: Vec<(UInt256, PoolItem)> = inner.verified.drain().collect();
        inner.unverified.extend(drained);
    }

    /// Takes up to `count` unverified transactions for re-verification.
    pub fn take_unverified(&self, count: usize) -> Vec<Transaction> {
        let mut inner = self.inner.lock();
        let hashes: Vec<UInt256> = inner.unverified.keys().take(count).copied().collect();
        hashes
            .into_iter()
            .filter_map(|h| inner.unverified.remove(&h))
            .map(|item| item.transaction)
            .collect()
    }

    /// The verified transactions, best priority first.
    pub fn verified_transactions(&self) -> Vec<Transaction> {
        let inner = self.inner.lock();
        inner
            .ordered
            .iter()
            .rev()
            .filter_map(|p| inner.verified.get(&p.hash))
            .map(|item| item.transaction.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo_core::TransactionData;

    fn tx(nonce: u32) -> Transaction {
        Transaction::new_miner(nonce)
    }

    fn gas(raw: i64) -> Fixed8 {
        Fixed8::from_raw(raw)
    }

    #[test]
    fn ordering_prefers_fee_density_then_fee_then_arrival() {
        let pool = MemPool::new(10);
        pool.try_add(tx(1), gas(1_000)).unwrap();
        pool.try_add(tx(2), gas(100_000)).unwrap();
        pool.try_add(tx(3), gas(1_000)).unwrap();

        let ordered = pool.verified_transactions();
        assert_eq!(ordered[0].hash(), tx(2).hash());
        // Same fee: earlier arrival first.
        assert_eq!(ordered[1].hash(), tx(1).hash());
        assert_eq!(ordered[2].hash(), tx(3).hash());
    }

    #[test]
    fn duplicates_are_rejected() {
        let pool = MemPool::new(10);
        pool.try_add(tx(1), gas(0)).unwrap();
        assert!(pool.try_add(tx(1), gas(0)).is_err());
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn full_pool_evicts_the_worst_for_a_better_entry() {
        let pool = MemPool::new(2);
        pool.try_add(tx(1), gas(1_000)).unwrap();
        pool.try_add(tx(2), gas(2_000)).unwrap();

        // Worse than everything pooled: rejected.
        assert!(pool.try_add(tx(3), gas(500)).is_err());
        assert_eq!(pool.len(), 2);

        // Better: admitted, evicting the worst.
        pool.try_add(tx(4), gas(5_000)).unwrap();
        assert_eq!(pool.len(), 2);
        assert!(!pool.contains(&tx(1).hash()));
        assert!(pool.contains(&tx(4).hash()));
    }

    #[test]
    fn block_application_removes_included_transactions() {
        let pool = MemPool::new(10);
        pool.try_add(tx(1), gas(100)).unwrap();
        pool.try_add(tx(2), gas(100)).unwrap();

        let block = Block::new(
            crate::block::Header::default(),
            vec![tx(1)],
        );
        pool.remove_for_block(&block);
        assert!(!pool.contains(&tx(1).hash()));
        assert!(pool.contains(&tx(2).hash()));
    }

    #[test]
    fn reorg_moves_transactions_to_the_unverified_set() {
        let pool = MemPool::new(10);
        pool.try_add(tx(1), gas(100)).unwrap();
        pool.try_add(tx(2), gas(200)).unwrap();

        pool.invalidate_all();
        assert!(pool.is_empty());
        assert!(pool.contains(&tx(1).hash()));

        let mut taken = pool.take_unverified(10);
        assert_eq!(taken.len(), 2);
        taken.sort_by_key(Transaction::hash);
        assert!(!pool.contains(&tx(1).hash()));
    }

    #[test]
    fn zero_fee_transactions_never_beat_paid_ones() {
        let pool = MemPool::new(1);
        pool.try_add(tx(1), gas(1_000)).unwrap();
        assert!(matches!(
            pool.try_add(tx(2), gas(0)),
            Err(LedgerError::Pool(_))
        ));
    }

    #[test]
    fn transaction_data_variants_pool_equally() {
        let pool = MemPool::new(4);
        let invocation = Transaction::new(
            TransactionData::Invocation {
                script: vec![0x51],
                gas: Fixed8::ZERO,
            },
            1,
        );
        pool.try_add(invocation.clone(), gas(10)).unwrap();
        assert!(pool.contains(&invocation.hash()));
    }
}
