//! The data-access object: typed accessors over the cached store.
//!
//! Every record family fixes a one-byte key prefix and a serialization; the
//! DAO is the only component that knows both. A DAO owns one write-cache
//! overlay; nesting DAOs (block over persistent, transaction over block)
//! provides the rollback scopes the applier relies on.

use crate::block::{Block, TrimmedBlock};
use crate::state::{
    Account, AppExecResult, Asset, CoinState, ContractState, Nep5Balances, Nep5Transfer,
    Nep5TransferLog, StorageItem, UnspentCoin, Validator, ValidatorsCount, TRANSFER_BATCH_SIZE,
};
use crate::{LedgerError, Result};
use neo_core::{group_inputs_by_prev_hash, Input, Transaction, UInt160, UInt256};
use neo_cryptography::PublicKey;
use neo_io::{BinaryWriter, MemoryReader, Serializable};
use neo_persistence::{DataEntryPrefix, MemCachedStore, Store};
use std::sync::Arc;

/// Hashes per header-hash page.
pub const HEADER_HASH_PAGE_SIZE: usize = 2000;

/// Typed data access over a [`MemCachedStore`] overlay.
pub struct Dao {
    store: Arc<MemCachedStore>,
}

impl Dao {
    /// Creates a DAO whose overlay sits on `backend`.
    pub fn new(backend: Arc<dyn Store>) -> Self {
        Self {
            store: Arc::new(MemCachedStore::new(backend)),
        }
    }

    /// Creates a DAO layered on this one. Changes in the nested DAO are
    /// invisible here until its `persist`.
    pub fn nested(&self) -> Dao {
        Dao::new(self.store.clone() as Arc<dyn Store>)
    }

    /// Flushes this DAO's overlay into its parent, returning the number of
    /// entries applied. On error the overlay is intact and may be retried.
    pub fn persist(&self) -> Result<usize> {
        self.store.persist().map_err(LedgerError::from)
    }

    fn get_and_decode<T: Serializable>(&self, key: &[u8]) -> Result<T> {
        let bytes = self.store.get(key)?;
        neo_io::from_slice(&bytes).map_err(LedgerError::from)
    }

    fn put_serializable<T: Serializable>(&self, key: &[u8], value: &T) -> Result<()> {
        let bytes = neo_io::to_vec(value)?;
        self.store.put(key, &bytes).map_err(LedgerError::from)
    }

    // -- accounts

    fn account_key(hash: UInt160) -> Vec<u8> {
        DataEntryPrefix::StAccount.make_key(&hash.to_array_be())
    }

    /// Reads an account; `NotFound` if it was never touched.
    pub fn get_account(&self, hash: UInt160) -> Result<Account> {
        self.get_and_decode(&Self::account_key(hash))
    }

    /// Reads an account, or a typed empty one if absent.
    pub fn get_account_or_new(&self, hash: UInt160) -> Result<Account> {
        match self.get_account(hash) {
            Ok(account) => Ok(account),
            Err(err) if err.is_not_found() => Ok(Account::new(hash)),
            Err(err) => Err(err),
        }
    }

    /// Writes an account.
    pub fn put_account(&self, account: &Account) -> Result<()> {
        self.put_serializable(&Self::account_key(account.script_hash), account)
    }

    // -- assets

    fn asset_key(id: UInt256) -> Vec<u8> {
        DataEntryPrefix::StAsset.make_key(&id.to_array_be())
    }

    /// Reads an asset registration.
    pub fn get_asset(&self, id: UInt256) -> Result<Asset> {
        let asset: Asset = self.get_and_decode(&Self::asset_key(id))?;
        if asset.id != id {
            return Err(LedgerError::Verification(
                "stored asset id does not match its key".into(),
            ));
        }
        Ok(asset)
    }

    /// Writes an asset registration.
    pub fn put_asset(&self, asset: &Asset) -> Result<()> {
        self.put_serializable(&Self::asset_key(asset.id), asset)
    }

    // -- contracts

    fn contract_key(hash: UInt160) -> Vec<u8> {
        DataEntryPrefix::StContract.make_key(&hash.to_array_be())
    }

    /// Reads a deployed contract.
    pub fn get_contract(&self, hash: UInt160) -> Result<ContractState> {
        let contract: ContractState = self.get_and_decode(&Self::contract_key(hash))?;
        if contract.script_hash() != hash {
            return Err(LedgerError::Verification(
                "stored contract hash does not match its key".into(),
            ));
        }
        Ok(contract)
    }

    /// Writes a deployed contract.
    pub fn put_contract(&self, contract: &ContractState) -> Result<()> {
        self.put_serializable(&Self::contract_key(contract.script_hash()), contract)
    }

    /// Deletes a deployed contract.
    pub fn delete_contract(&self, hash: UInt160) -> Result<()> {
        self.store
            .delete(&Self::contract_key(hash))
            .map_err(LedgerError::from)
    }

    // -- native contract state

    fn native_state_key(hash: UInt160) -> Vec<u8> {
        DataEntryPrefix::StNativeContract.make_key(&hash.to_array_be())
    }

    /// Reads a native contract's private state blob.
    pub fn get_native_state(&self, hash: UInt160) -> Result<Vec<u8>> {
        self.store
            .get(&Self::native_state_key(hash))
            .map_err(LedgerError::from)
    }

    /// Writes a native contract's private state blob.
    pub fn put_native_state(&self, hash: UInt160, value: &[u8]) -> Result<()> {
        self.store
            .put(&Self::native_state_key(hash), value)
            .map_err(LedgerError::from)
    }

    // -- NEP-5 balances and transfer logs

    fn nep5_balance_key(account: UInt160) -> Vec<u8> {
        DataEntryPrefix::StNep5Balances.make_key(&account.to_array_be())
    }

    /// Reads an account's NEP-5 balances; absent means empty.
    pub fn get_nep5_balances(&self, account: UInt160) -> Result<Nep5Balances> {
        match self.get_and_decode(&Self::nep5_balance_key(account)) {
            Ok(balances) => Ok(balances),
            Err(err) if err.is_not_found() => Ok(Nep5Balances::new()),
            Err(err) => Err(err),
        }
    }

    /// Writes an account's NEP-5 balances.
    pub fn put_nep5_balances(&self, account: UInt160, balances: &Nep5Balances) -> Result<()> {
        self.put_serializable(&Self::nep5_balance_key(account), balances)
    }

    fn nep5_transfer_key(account: UInt160, page: u32) -> Vec<u8> {
        let mut suffix = [0u8; 24];
        suffix[..20].copy_from_slice(&account.to_array_be());
        suffix[20..].copy_from_slice(&page.to_le_bytes());
        DataEntryPrefix::StNep5Transfers.make_key(&suffix)
    }

    /// Reads one page of an account's transfer log; absent means empty.
    pub fn get_nep5_transfer_log(&self, account: UInt160, page: u32) -> Result<Nep5TransferLog> {
        match self.store.get(&Self::nep5_transfer_key(account, page)) {
            Ok(raw) => Ok(Nep5TransferLog { raw }),
            Err(neo_persistence::Error::NotFound) => Ok(Nep5TransferLog::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// Writes one page of an account's transfer log.
    pub fn put_nep5_transfer_log(
        &self,
        account: UInt160,
        page: u32,
        log: &Nep5TransferLog,
    ) -> Result<()> {
        self.store
            .put(&Self::nep5_transfer_key(account, page), &log.raw)
            .map_err(LedgerError::from)
    }

    /// Appends a transfer to an account's current page. Returns `true` when
    /// the page is full and the account must roll to the next one.
    pub fn append_nep5_transfer(
        &self,
        account: UInt160,
        page: u32,
        transfer: &Nep5Transfer,
    ) -> Result<bool> {
        let mut log = self.get_nep5_transfer_log(account, page)?;
        log.append(transfer)?;
        self.put_nep5_transfer_log(account, page, &log)?;
        Ok(log.len() >= TRANSFER_BATCH_SIZE)
    }

    // -- unspent coins

    fn coin_key(tx_hash: UInt256) -> Vec<u8> {
        DataEntryPrefix::StCoin.make_key(&tx_hash.to_array())
    }

    /// Reads the unspent-coin record of a transaction.
    pub fn get_unspent_coin(&self, tx_hash: UInt256) -> Result<UnspentCoin> {
        self.get_and_decode(&Self::coin_key(tx_hash))
    }

    /// Writes the unspent-coin record of a transaction.
    pub fn put_unspent_coin(&self, tx_hash: UInt256, coin: &UnspentCoin) -> Result<()> {
        self.put_serializable(&Self::coin_key(tx_hash), coin)
    }

    // -- validators

    fn validator_key(key: &PublicKey) -> Vec<u8> {
        DataEntryPrefix::StValidator.make_key(&key.to_bytes())
    }

    /// Reads a validator record.
    pub fn get_validator(&self, key: &PublicKey) -> Result<Validator> {
        self.get_and_decode(&Self::validator_key(key))
    }

    /// Reads a validator record, or a fresh one if absent.
    pub fn get_validator_or_new(&self, key: &PublicKey) -> Result<Validator> {
        match self.get_validator(key) {
            Ok(validator) => Ok(validator),
            Err(err) if err.is_not_found() => Ok(Validator::new(key.clone())),
            Err(err) => Err(err),
        }
    }

    /// Writes a validator record.
    pub fn put_validator(&self, validator: &Validator) -> Result<()> {
        self.put_serializable(&Self::validator_key(&validator.public_key), validator)
    }

    /// Deletes a validator record.
    pub fn delete_validator(&self, key: &PublicKey) -> Result<()> {
        self.store
            .delete(&Self::validator_key(key))
            .map_err(LedgerError::from)
    }

    /// Reads every validator record, in key order. Undecodable records are
    /// skipped.
    pub fn get_validators(&self) -> Vec<Validator> {
        let mut validators = Vec::new();
        self.store
            .seek(&DataEntryPrefix::StValidator.bytes(), &mut |_, value| {
                if let Ok(validator) = neo_io::from_slice::<Validator>(value) {
                    validators.push(validator);
                }
            });
        validators
    }

    /// Reads the committee-size tallies; absent means all-zero.
    pub fn get_validators_count(&self) -> Result<ValidatorsCount> {
        match self.get_and_decode(&DataEntryPrefix::IxValidatorsCount.bytes()) {
            Ok(counts) => Ok(counts),
            Err(err) if err.is_not_found() => Ok(ValidatorsCount::new()),
            Err(err) => Err(err),
        }
    }

    /// Writes the committee-size tallies.
    pub fn put_validators_count(&self, counts: &ValidatorsCount) -> Result<()> {
        self.put_serializable(&DataEntryPrefix::IxValidatorsCount.bytes(), counts)
    }

    // -- application execution results

    fn app_exec_key(tx_hash: UInt256) -> Vec<u8> {
        DataEntryPrefix::StNotification.make_key(&tx_hash.to_array_be())
    }

    /// Reads the execution result recorded for a transaction.
    pub fn get_app_exec_result(&self, tx_hash: UInt256) -> Result<AppExecResult> {
        self.get_and_decode(&Self::app_exec_key(tx_hash))
    }

    /// Writes the execution result of a transaction.
    pub fn put_app_exec_result(&self, result: &AppExecResult) -> Result<()> {
        self.put_serializable(&Self::app_exec_key(result.tx_hash), result)
    }

    // -- storage items

    fn storage_key(script_hash: UInt160, key: &[u8]) -> Vec<u8> {
        let mut suffix = Vec::with_capacity(20 + key.len());
        suffix.extend_from_slice(&script_hash.to_array());
        suffix.extend_from_slice(key);
        DataEntryPrefix::StStorage.make_key(&suffix)
    }

    /// Reads a storage item, or `None` if absent or undecodable.
    pub fn get_storage_item(&self, script_hash: UInt160, key: &[u8]) -> Option<StorageItem> {
        let bytes = self.store.get(&Self::storage_key(script_hash, key)).ok()?;
        neo_io::from_slice(&bytes).ok()
    }

    /// Writes a storage item.
    pub fn put_storage_item(
        &self,
        script_hash: UInt160,
        key: &[u8],
        item: &StorageItem,
    ) -> Result<()> {
        self.put_serializable(&Self::storage_key(script_hash, key), item)
    }

    /// Deletes a storage item.
    pub fn delete_storage_item(&self, script_hash: UInt160, key: &[u8]) -> Result<()> {
        self.store
            .delete(&Self::storage_key(script_hash, key))
            .map_err(LedgerError::from)
    }

    /// Reads every storage item of a contract whose user key starts with
    /// `key_prefix`, in key order.
    pub fn find_storage_items(
        &self,
        script_hash: UInt160,
        key_prefix: &[u8],
    ) -> Vec<(Vec<u8>, StorageItem)> {
        let prefix = Self::storage_key(script_hash, key_prefix);
        let mut items = Vec::new();
        self.store.seek(&prefix, &mut |key, value| {
            if let Ok(item) = neo_io::from_slice::<StorageItem>(value) {
                // Strip the table prefix and script hash.
                items.push((key[21..].to_vec(), item));
            }
        });
        items
    }

    // -- blocks and transactions

    fn block_key(hash: UInt256) -> Vec<u8> {
        DataEntryPrefix::DataBlock.make_key(&hash.to_array())
    }

    /// Reads a block record: the trimmed block plus the cumulative system
    /// fee at that height, in whole units.
    pub fn get_block(&self, hash: UInt256) -> Result<(TrimmedBlock, u32)> {
        let bytes = self.store.get(&Self::block_key(hash))?;
        if bytes.len() < 4 {
            return Err(LedgerError::Decode(neo_io::Error::EndOfStream {
                position: bytes.len(),
            }));
        }
        let sys_fee = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let block = TrimmedBlock::from_trimmed(&bytes[4..])?;
        Ok((block, sys_fee))
    }

    /// Writes a block record with its cumulative system fee.
    pub fn store_as_block(&self, block: &Block, sys_fee: u32) -> Result<()> {
        let mut value = sys_fee.to_le_bytes().to_vec();
        value.extend_from_slice(&block.trim()?);
        self.store
            .put(&Self::block_key(block.hash()), &value)
            .map_err(LedgerError::from)
    }

    fn transaction_key(hash: UInt256) -> Vec<u8> {
        DataEntryPrefix::DataTransaction.make_key(&hash.to_array())
    }

    /// Reads a transaction and the height it was confirmed at.
    pub fn get_transaction(&self, hash: UInt256) -> Result<(Transaction, u32)> {
        let bytes = self.store.get(&Self::transaction_key(hash))?;
        let mut reader = MemoryReader::new(&bytes);
        let height = reader.read_u32();
        let tx = Transaction::deserialize(&mut reader);
        reader.finish((tx, height)).map_err(LedgerError::from)
    }

    /// Writes a transaction record at `height`.
    pub fn store_as_transaction(&self, tx: &Transaction, height: u32) -> Result<()> {
        let mut writer = BinaryWriter::new();
        writer.write_u32(height);
        tx.serialize(&mut writer);
        self.store
            .put(&Self::transaction_key(tx.hash()), &writer.into_bytes()?)
            .map_err(LedgerError::from)
    }

    /// Indicates whether a transaction is already recorded.
    pub fn has_transaction(&self, hash: UInt256) -> bool {
        self.store.get(&Self::transaction_key(hash)).is_ok()
    }

    // -- header hash pages

    fn header_page_key(stored_count: u32) -> Vec<u8> {
        DataEntryPrefix::IxHeaderHashList.make_key(&stored_count.to_le_bytes())
    }

    /// Writes one page of header hashes, keyed by the count of hashes
    /// stored before it.
    pub fn put_header_hash_page(&self, stored_count: u32, hashes: &[UInt256]) -> Result<()> {
        let mut writer = BinaryWriter::new();
        writer.write_array(hashes);
        self.store
            .put(&Self::header_page_key(stored_count), &writer.into_bytes()?)
            .map_err(LedgerError::from)
    }

    /// Reads every stored header hash, in height order.
    pub fn get_header_hashes(&self) -> Result<Vec<UInt256>> {
        let mut pages: Vec<(u32, Vec<UInt256>)> = Vec::new();
        let mut decode_error = None;
        self.store
            .seek(&DataEntryPrefix::IxHeaderHashList.bytes(), &mut |key, value| {
                if key.len() != 5 || decode_error.is_some() {
                    return;
                }
                let stored_count = u32::from_le_bytes([key[1], key[2], key[3], key[4]]);
                let mut reader = MemoryReader::new(value);
                let hashes: Vec<UInt256> = reader.read_array_max(HEADER_HASH_PAGE_SIZE);
                match reader.finish(hashes) {
                    Ok(hashes) => pages.push((stored_count, hashes)),
                    Err(err) => decode_error = Some(err),
                }
            });
        if let Some(err) = decode_error {
            return Err(err.into());
        }
        pages.sort_by_key(|(count, _)| *count);
        let mut all = Vec::new();
        for (stored_count, hashes) in pages {
            all.truncate(stored_count as usize);
            all.extend(hashes);
        }
        Ok(all)
    }

    // -- system anchors

    /// Reads the schema version.
    pub fn get_version(&self) -> Result<String> {
        let bytes = self.store.get(&DataEntryPrefix::SysVersion.bytes())?;
        String::from_utf8(bytes)
            .map_err(|_| LedgerError::Decode(neo_io::Error::InvalidFormat("version".into())))
    }

    /// Writes the schema version.
    pub fn put_version(&self, version: &str) -> Result<()> {
        self.store
            .put(&DataEntryPrefix::SysVersion.bytes(), version.as_bytes())
            .map_err(LedgerError::from)
    }

    fn get_anchor(&self, prefix: DataEntryPrefix) -> Result<(UInt256, u32)> {
        let bytes = self.store.get(&prefix.bytes())?;
        let mut reader = MemoryReader::new(&bytes);
        let hash = UInt256::deserialize(&mut reader);
        let index = reader.read_u32();
        reader.finish((hash, index)).map_err(LedgerError::from)
    }

    fn put_anchor(&self, prefix: DataEntryPrefix, hash: UInt256, index: u32) -> Result<()> {
        let mut writer = BinaryWriter::new();
        hash.serialize(&mut writer);
        writer.write_u32(index);
        self.store
            .put(&prefix.bytes(), &writer.into_bytes()?)
            .map_err(LedgerError::from)
    }

    /// Reads the current full-block anchor: hash and height.
    pub fn get_current_block(&self) -> Result<(UInt256, u32)> {
        self.get_anchor(DataEntryPrefix::SysCurrentBlock)
    }

    /// Writes the current full-block anchor.
    pub fn put_current_block(&self, hash: UInt256, index: u32) -> Result<()> {
        self.put_anchor(DataEntryPrefix::SysCurrentBlock, hash, index)
    }

    /// Reads the current header anchor: hash and height.
    pub fn get_current_header(&self) -> Result<(UInt256, u32)> {
        self.get_anchor(DataEntryPrefix::SysCurrentHeader)
    }

    /// Writes the current header anchor.
    pub fn put_current_header(&self, hash: UInt256, index: u32) -> Result<()> {
        self.put_anchor(DataEntryPrefix::SysCurrentHeader, hash, index)
    }

    // -- double spend / double claim

    /// Checks whether any input of `tx` references an output that is
    /// missing or already spent.
    pub fn is_double_spend(&self, tx: &Transaction) -> bool {
        self.check_used_inputs(&tx.inputs, CoinState::SPENT)
    }

    /// Checks whether any claim input is missing or already claimed.
    pub fn is_double_claim(&self, claims: &[Input]) -> bool {
        self.check_used_inputs(claims, CoinState::CLAIMED)
    }

    fn check_used_inputs(&self, inputs: &[Input], state: CoinState) -> bool {
        if inputs.is_empty() {
            return false;
        }
        for (prev_hash, group) in group_inputs_by_prev_hash(inputs) {
            let Ok(unspent) = self.get_unspent_coin(prev_hash) else {
                return true;
            };
            for input in group {
                match unspent.states.get(input.prev_index as usize) {
                    Some(output_state) if !output_state.state.intersects(state) => {}
                    _ => return true,
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Header;
    use neo_core::{Fixed8, Output, Witness};
    use neo_persistence::MemoryStore;

    fn dao() -> Dao {
        Dao::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn account_or_new_distinguishes_not_found() {
        let dao = dao();
        let hash = UInt160::from_script(b"acc");
        assert!(dao.get_account(hash).unwrap_err().is_not_found());

        let fresh = dao.get_account_or_new(hash).unwrap();
        assert_eq!(fresh.script_hash, hash);

        dao.put_account(&fresh).unwrap();
        assert!(dao.get_account(hash).is_ok());
    }

    #[test]
    fn storage_item_find_strips_prefixes() {
        let dao = dao();
        let contract = UInt160::from_script(b"contract");
        dao.put_storage_item(contract, b"aa1", &StorageItem::new(vec![1], false))
            .unwrap();
        dao.put_storage_item(contract, b"aa2", &StorageItem::new(vec![2], false))
            .unwrap();
        dao.put_storage_item(contract, b"bb", &StorageItem::new(vec![3], false))
            .unwrap();

        let found = dao.find_storage_items(contract, b"aa");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].0, b"aa1");
        assert_eq!(found[1].1.value, vec![2]);
    }

    #[test]
    fn block_record_round_trip_with_sys_fee() {
        let dao = dao();
        let mut block = Block::new(
            Header {
                index: 3,
                witness: Witness::new(vec![], vec![0x51]),
                ..Header::default()
            },
            vec![Transaction::new_miner(5)],
        );
        block.rebuild_merkle_root();
        dao.store_as_block(&block, 77).unwrap();

        let (trimmed, sys_fee) = dao.get_block(block.hash()).unwrap();
        assert_eq!(sys_fee, 77);
        assert_eq!(trimmed.header, block.header);
        assert_eq!(trimmed.tx_hashes, vec![block.transactions[0].hash()]);
    }

    #[test]
    fn transaction_record_round_trip() {
        let dao = dao();
        let tx = Transaction::new_miner(9);
        assert!(!dao.has_transaction(tx.hash()));
        dao.store_as_transaction(&tx, 4).unwrap();
        let (back, height) = dao.get_transaction(tx.hash()).unwrap();
        assert_eq!(back, tx);
        assert_eq!(height, 4);
        assert!(dao.has_transaction(tx.hash()));
    }

    #[test]
    fn header_hash_pages_concatenate_in_order() {
        let dao = dao();
        let first: Vec<UInt256> = (0..3).map(|i| UInt256::from_data(&[i])).collect();
        let second: Vec<UInt256> = (3..5).map(|i| UInt256::from_data(&[i])).collect();
        dao.put_header_hash_page(0, &first).unwrap();
        dao.put_header_hash_page(3, &second).unwrap();

        let all = dao.get_header_hashes().unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0], first[0]);
        assert_eq!(all[4], second[1]);
    }

    #[test]
    fn double_spend_detection() {
        let dao = dao();
        let outputs = [Output::new(
            UInt256::from_data(b"asset"),
            Fixed8::from_int(1).unwrap(),
            UInt160::zero(),
        )];
        let source = Transaction::new_miner(1);
        dao.put_unspent_coin(source.hash(), &UnspentCoin::new(1, &outputs))
            .unwrap();

        let mut spender = Transaction::new(neo_core::TransactionData::Contract, 0);
        spender.inputs.push(Input::new(source.hash(), 0));
        assert!(!dao.is_double_spend(&spender));

        // Mark the output spent; the same input must now be rejected.
        let mut coin = dao.get_unspent_coin(source.hash()).unwrap();
        coin.states[0].state = CoinState::SPENT;
        dao.put_unspent_coin(source.hash(), &coin).unwrap();
        assert!(dao.is_double_spend(&spender));

        // Out-of-range index is a double spend, too.
        let mut bad = Transaction::new(neo_core::TransactionData::Contract, 0);
        bad.inputs.push(Input::new(source.hash(), 7));
        assert!(dao.is_double_spend(&bad));
    }

    #[test]
    fn nested_dao_rolls_back_by_dropping() {
        let dao = dao();
        let hash = UInt160::from_script(b"acc");
        {
            let inner = dao.nested();
            inner.put_account(&Account::new(hash)).unwrap();
            // dropped without persist
        }
        assert!(dao.get_account(hash).unwrap_err().is_not_found());

        let inner = dao.nested();
        inner.put_account(&Account::new(hash)).unwrap();
        inner.persist().unwrap();
        assert!(dao.get_account(hash).is_ok());
    }

    #[test]
    fn anchors_round_trip() {
        let dao = dao();
        let hash = UInt256::from_data(b"block");
        dao.put_current_block(hash, 10).unwrap();
        dao.put_current_header(hash, 12).unwrap();
        assert_eq!(dao.get_current_block().unwrap(), (hash, 10));
        assert_eq!(dao.get_current_header().unwrap(), (hash, 12));
        dao.put_version("0.2.0").unwrap();
        assert_eq!(dao.get_version().unwrap(), "0.2.0");
    }
}
