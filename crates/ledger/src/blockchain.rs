//! The block applier: validates and commits one block end to end.

use crate::block::{merkle_root, Block, Header, TrimmedBlock};
use crate::dao::{Dao, HEADER_HASH_PAGE_SIZE};
use crate::interop::{spawn_vm, InteropContext};
use crate::native::{GasToken, NativeContract, NativeRegistry, NeoToken};
use crate::state::{
    AppExecResult, Asset, CoinState, ContractState, Nep5Transfer, NotificationEvent, UnspentCoin,
};
use crate::{LedgerError, Result};
use neo_config::ProtocolSettings;
use neo_core::{
    group_inputs_by_prev_hash, Fixed8, Transaction, TransactionData, TransactionType, UInt160,
    UInt256, Witness,
};
use neo_cryptography::PublicKey;
use neo_persistence::Store;
use neo_smart_contract::TriggerType;
use neo_vm::{StackItem, VmState};
use parking_lot::{Mutex, RwLock};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Current persisted-schema version.
const SCHEMA_VERSION: &str = "0.2.0";

/// Whole utility tokens generated per block, decreasing every
/// [`DECREMENT_INTERVAL`] blocks.
const GENERATION_AMOUNT: [i64; 8] = [8, 7, 6, 5, 4, 3, 2, 1];

/// Blocks per generation decrement.
const DECREMENT_INTERVAL: u32 = 2_000_000;

/// Timestamp of the genesis block.
const GENESIS_TIMESTAMP: u32 = 1_468_595_301;

/// Consensus nonce of the genesis block.
const GENESIS_NONCE: u64 = 2_083_236_893;

/// Chain facts shared with interop handlers: configuration, the standby
/// committee and the in-memory header-hash index.
pub struct ChainState {
    pub config: Arc<ProtocolSettings>,
    pub standby_validators: Vec<PublicKey>,
    header_hashes: RwLock<Vec<UInt256>>,
    block_height: AtomicU32,
}

impl ChainState {
    fn new(config: Arc<ProtocolSettings>, standby_validators: Vec<PublicKey>) -> Self {
        Self {
            config,
            standby_validators,
            header_hashes: RwLock::new(Vec::new()),
            block_height: AtomicU32::new(0),
        }
    }

    /// Height of the newest fully-applied block.
    pub fn block_height(&self) -> u32 {
        self.block_height.load(Ordering::Acquire)
    }

    /// Height of the newest known header.
    pub fn header_height(&self) -> u32 {
        (self.header_hashes.read().len() as u32).saturating_sub(1)
    }

    /// The header hash at `index`.
    pub fn header_hash(&self, index: u32) -> Option<UInt256> {
        self.header_hashes.read().get(index as usize).copied()
    }

    /// The hash of the newest fully-applied block.
    pub fn current_block_hash(&self) -> Option<UInt256> {
        self.header_hash(self.block_height())
    }

    fn header_count(&self) -> usize {
        self.header_hashes.read().len()
    }

    fn sys_fee_at(&self, dao: &Dao, index: u32) -> Result<u32> {
        let hash = self
            .header_hash(index)
            .ok_or_else(|| LedgerError::Verification(format!("no header at {index}")))?;
        Ok(dao.get_block(hash)?.1)
    }

    /// The utility-token accrual owed to `neo_count` whole governing
    /// tokens held over `[start, end)`: generated gas per the decrement
    /// schedule plus the system fees of the covered blocks, pro rata.
    pub fn calculate_claimable(
        &self,
        dao: &Dao,
        neo_count: i64,
        start: u32,
        end: u32,
    ) -> Result<Fixed8> {
        if neo_count <= 0 || start >= end {
            return Ok(Fixed8::ZERO);
        }

        let mut generated: i64 = 0;
        let mut ustart = start / DECREMENT_INTERVAL;
        let generation_len = GENERATION_AMOUNT.len() as u32;
        if ustart < generation_len {
            let mut uend = end / DECREMENT_INTERVAL;
            let mut iend = end % DECREMENT_INTERVAL;
            if uend >= generation_len {
                uend = generation_len - 1;
                iend = DECREMENT_INTERVAL;
            }
            if iend == 0 {
                uend -= 1;
                iend = DECREMENT_INTERVAL;
            }
            let mut istart = start % DECREMENT_INTERVAL;
            while ustart < uend {
                generated += i64::from(DECREMENT_INTERVAL - istart)
                    * GENERATION_AMOUNT[ustart as usize];
                ustart += 1;
                istart = 0;
            }
            generated += i64::from(iend - istart) * GENERATION_AMOUNT[ustart as usize];
        }

        let fee_start = if start == 0 {
            0
        } else {
            self.sys_fee_at(dao, start - 1)?
        };
        let fee_end = self.sys_fee_at(dao, end - 1)?;
        let fees = i64::from(fee_end) - i64::from(fee_start);

        Ok(Fixed8::from_raw(neo_count * (generated + fees)))
    }
}

/// The ledger: a persistent DAO over a pluggable store, the native
/// registry, and the applier that commits blocks atomically.
///
/// A single applier runs at a time; readers observe either the pre- or the
/// post-apply snapshot.
pub struct Blockchain {
    state: Arc<ChainState>,
    dao: Dao,
    natives: Arc<NativeRegistry>,
    neo: Arc<NeoToken>,
    gas: Arc<GasToken>,
    governing_id: UInt256,
    utility_id: UInt256,
    apply_lock: Mutex<()>,
    stored_header_count: AtomicU32,
}

impl Blockchain {
    /// Opens (or initializes) a chain over `backend`.
    pub fn new(backend: Arc<dyn Store>, config: ProtocolSettings) -> Result<Self> {
        let config = Arc::new(config);
        let standby = parse_standby_validators(&config)?;
        let state = Arc::new(ChainState::new(config.clone(), standby.clone()));

        let gas = Arc::new(GasToken::new());
        let neo = Arc::new(NeoToken::new(gas.clone()));
        let mut registry = NativeRegistry::new();
        registry.register(neo.to_native_contract());
        registry.register(gas.to_native_contract());
        let natives = Arc::new(registry);

        let dao = Dao::new(backend);
        natives.store_contract_stubs(&dao)?;

        let governing_tx = governing_token_tx();
        let utility_tx = utility_token_tx();
        let chain = Self {
            state,
            dao,
            natives,
            neo,
            gas,
            governing_id: governing_tx.hash(),
            utility_id: utility_tx.hash(),
            apply_lock: Mutex::new(()),
            stored_header_count: AtomicU32::new(0),
        };

        match chain.dao.get_version() {
            Ok(version) if version == SCHEMA_VERSION => chain.load_existing()?,
            Ok(version) => {
                return Err(LedgerError::Verification(format!(
                    "schema version {version} is not supported"
                )))
            }
            Err(err) if err.is_not_found() => chain.init_fresh(governing_tx, utility_tx)?,
            Err(err) => return Err(err),
        }
        Ok(chain)
    }

    /// The shared chain facts.
    pub fn chain_state(&self) -> Arc<ChainState> {
        self.state.clone()
    }

    /// Height of the newest applied block.
    pub fn block_height(&self) -> u32 {
        self.state.block_height()
    }

    /// Height of the newest known header.
    pub fn header_height(&self) -> u32 {
        self.state.header_height()
    }

    /// Hash of the newest applied block.
    pub fn current_block_hash(&self) -> UInt256 {
        self.state.current_block_hash().unwrap_or_default()
    }

    /// The asset id of the legacy governing token.
    pub fn governing_token_id(&self) -> UInt256 {
        self.governing_id
    }

    /// The asset id of the legacy utility token.
    pub fn utility_token_id(&self) -> UInt256 {
        self.utility_id
    }

    /// The governance native.
    pub fn neo_token(&self) -> &Arc<NeoToken> {
        &self.neo
    }

    /// The utility native.
    pub fn gas_token(&self) -> &Arc<GasToken> {
        &self.gas
    }

    /// The persistent DAO, for read paths.
    pub fn dao(&self) -> &Dao {
        &self.dao
    }

    /// Registers an additional native contract. Only meaningful before the
    /// chain starts applying blocks that invoke it.
    pub fn register_native(&mut self, contract: NativeContract) -> Result<()> {
        let registry = Arc::make_mut(&mut self.natives);
        registry.register(contract);
        self.natives.store_contract_stubs(&self.dao)?;
        self.dao.persist()?;
        Ok(())
    }

    fn interop_context(
        &self,
        trigger: TriggerType,
        dao: &Dao,
        block: Option<Block>,
        tx: Option<Transaction>,
    ) -> InteropContext {
        InteropContext::new(trigger, self.state.clone(), dao, block, tx)
    }

    // -- startup

    fn init_fresh(&self, governing_tx: Transaction, utility_tx: Transaction) -> Result<()> {
        let genesis = genesis_block(&self.state.standby_validators, governing_tx, utility_tx)?;
        info!(hash = %genesis.hash(), "initializing fresh chain");

        self.dao.put_version(SCHEMA_VERSION)?;
        {
            let mut hashes = self.state.header_hashes.write();
            hashes.clear();
            hashes.push(genesis.hash());
        }

        // Native genesis state: supplies minted to the standby committee.
        let mut ic = self.interop_context(TriggerType::Application, &self.dao, None, None);
        self.neo.initialize(&mut ic)?;
        self.gas.initialize(&mut ic)?;
        let notifications = std::mem::take(&mut ic.notifications);
        ic.dao.persist()?;
        for note in &notifications {
            self.process_transfer_notification(&self.dao, note, 0, UInt256::zero())?;
        }

        // Ledger effects of the genesis transactions.
        for tx in &genesis.transactions {
            self.apply_state_effects(&self.dao, tx)?;
            self.apply_outputs(&self.dao, tx, 0)?;
            self.dao.store_as_transaction(tx, 0)?;
        }
        self.dao.store_as_block(&genesis, 0)?;
        self.dao.put_current_block(genesis.hash(), 0)?;
        self.dao.put_current_header(genesis.hash(), 0)?;
        self.persist_with_retry()?;
        self.state.block_height.store(0, Ordering::Release);
        Ok(())
    }

    fn load_existing(&self) -> Result<()> {
        let (_, block_height) = self.dao.get_current_block()?;
        let (header_hash, header_height) = self.dao.get_current_header()?;

        let mut hashes = self.dao.get_header_hashes()?;
        self.stored_header_count
            .store(hashes.len() as u32, Ordering::Release);

        // Recover the tail not yet covered by a full page by walking the
        // header chain backwards from the anchor.
        let mut tail = Vec::new();
        let mut hash = header_hash;
        let mut index = header_height;
        while (index as usize) >= hashes.len() {
            let (trimmed, _) = self.dao.get_block(hash)?;
            tail.push(hash);
            hash = trimmed.header.prev_hash;
            if index == 0 {
                break;
            }
            index -= 1;
        }
        tail.reverse();
        hashes.extend(tail);

        *self.state.header_hashes.write() = hashes;
        self.state
            .block_height
            .store(block_height, Ordering::Release);

        // Rebuild in-memory native state from the store.
        let mut ic = self.interop_context(TriggerType::Application, &self.dao, None, None);
        self.neo.initialize(&mut ic)?;
        self.gas.initialize(&mut ic)?;
        info!(height = block_height, headers = header_height, "chain loaded");
        Ok(())
    }

    // -- header chain

    /// Appends verified headers ahead of full blocks.
    pub fn add_headers(&self, headers: &[Header]) -> Result<()> {
        let _guard = self.apply_lock.lock();
        for header in headers {
            let expected = self.state.header_count() as u32;
            if header.index < expected {
                continue;
            }
            if header.index > expected {
                return Err(LedgerError::InvalidBlock(format!(
                    "header {} skips ahead of {expected}",
                    header.index
                )));
            }
            let prev = self
                .state
                .header_hash(expected - 1)
                .ok_or_else(|| LedgerError::InvalidBlock("no previous header".into()))?;
            if header.prev_hash != prev {
                return Err(LedgerError::InvalidBlock(format!(
                    "header {} does not link to {prev}",
                    header.index
                )));
            }
            let record = Block::new(header.clone(), Vec::new());
            self.dao.store_as_block(&record, 0)?;
            self.dao.put_current_header(header.hash(), header.index)?;
            self.state.header_hashes.write().push(header.hash());
            self.write_full_header_pages()?;
        }
        self.persist_with_retry()
    }

    fn write_full_header_pages(&self) -> Result<()> {
        let total = self.state.header_count() as u32;
        let mut stored = self.stored_header_count.load(Ordering::Acquire);
        while stored + (HEADER_HASH_PAGE_SIZE as u32) <= total {
            let page: Vec<UInt256> = {
                let hashes = self.state.header_hashes.read();
                hashes[stored as usize..stored as usize + HEADER_HASH_PAGE_SIZE].to_vec()
            };
            self.dao.put_header_hash_page(stored, &page)?;
            stored += HEADER_HASH_PAGE_SIZE as u32;
            self.stored_header_count.store(stored, Ordering::Release);
        }
        Ok(())
    }

    // -- block application

    /// Validates and applies one block atomically. On any error the
    /// persistent store is left untouched.
    pub fn add_block(&self, block: &Block) -> Result<()> {
        let _guard = self.apply_lock.lock();
        self.check_block(block)?;
        self.store_block(block)?;
        self.state
            .block_height
            .store(block.index(), Ordering::Release);
        debug!(height = block.index(), hash = %block.hash(), txs = block.transactions.len(), "block applied");
        Ok(())
    }

    fn check_block(&self, block: &Block) -> Result<()> {
        let height = self.state.block_height();
        if block.index() != height + 1 {
            return Err(LedgerError::InvalidBlock(format!(
                "expected block {}, got {}",
                height + 1,
                block.index()
            )));
        }
        let current = self
            .state
            .current_block_hash()
            .ok_or_else(|| LedgerError::InvalidBlock("chain has no tip".into()))?;
        if block.header.prev_hash != current {
            return Err(LedgerError::InvalidBlock(
                "previous-hash does not match the chain tip".into(),
            ));
        }

        if block.transactions.len() > self.state.config.max_transactions_per_block {
            return Err(LedgerError::InvalidBlock(format!(
                "{} transactions exceed the block cap",
                block.transactions.len()
            )));
        }
        if block.transactions.is_empty()
            || block.transactions[0].tx_type() != TransactionType::Miner
        {
            return Err(LedgerError::InvalidBlock(
                "the first transaction must be a miner transaction".into(),
            ));
        }
        if block.transactions[1..]
            .iter()
            .any(|tx| tx.tx_type() == TransactionType::Miner)
        {
            return Err(LedgerError::InvalidBlock(
                "only one miner transaction is allowed".into(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for tx in &block.transactions {
            if !seen.insert(tx.hash()) {
                return Err(LedgerError::InvalidBlock(format!(
                    "duplicate transaction {}",
                    tx.hash()
                )));
            }
            if self.dao.has_transaction(tx.hash()) {
                return Err(LedgerError::InvalidBlock(format!(
                    "transaction {} is already on chain",
                    tx.hash()
                )));
            }
        }

        // No double spend across the union of the block's inputs.
        let mut spent = std::collections::HashSet::new();
        for tx in &block.transactions {
            for input in &tx.inputs {
                if !spent.insert(*input) {
                    return Err(LedgerError::InvalidBlock(format!(
                        "input {}:{} spent twice within the block",
                        input.prev_hash, input.prev_index
                    )));
                }
            }
            if self.dao.is_double_spend(tx) {
                return Err(LedgerError::InvalidBlock(format!(
                    "transaction {} double-spends",
                    tx.hash()
                )));
            }
        }

        let hashes: Vec<UInt256> = block.transactions.iter().map(Transaction::hash).collect();
        if merkle_root(&hashes) != block.header.merkle_root {
            return Err(LedgerError::InvalidBlock("merkle root mismatch".into()));
        }

        if self.state.config.verify_blocks {
            self.verify_block_witness(block)?;
        }
        Ok(())
    }

    fn verify_block_witness(&self, block: &Block) -> Result<()> {
        let (prev, _) = self.dao.get_block(block.header.prev_hash)?;
        let expected = prev.header.next_consensus;
        if block.header.witness.script_hash() != expected {
            return Err(LedgerError::InvalidBlock(
                "block witness does not match the consensus script".into(),
            ));
        }
        let verified = self.verify_witness(
            &self.dao,
            expected,
            &block.header.witness,
            block.header.verification_hash(),
            None,
        )?;
        if !verified {
            return Err(LedgerError::InvalidBlock(
                "block witness verification failed".into(),
            ));
        }
        Ok(())
    }

    fn store_block(&self, block: &Block) -> Result<()> {
        let block_dao = self.dao.nested();

        let prev_sys_fee = if block.index() == 0 {
            0
        } else {
            self.dao.get_block(block.header.prev_hash)?.1
        };
        let block_fee: i64 = block
            .transactions
            .iter()
            .map(|tx| self.system_fee(tx).to_int())
            .sum();
        let cumulative_fee = prev_sys_fee
            .checked_add(block_fee as u32)
            .ok_or_else(|| LedgerError::InvalidBlock("system-fee counter overflow".into()))?;

        for tx in &block.transactions {
            if self.state.config.verify_transactions {
                self.verify_transaction(&block_dao, tx)?;
            }
            self.apply_inputs(&block_dao, tx, block.index())?;
            self.apply_outputs(&block_dao, tx, block.index())?;
            self.apply_state_effects(&block_dao, tx)?;
            if let TransactionData::Invocation { script, gas } = &tx.data {
                self.execute_invocation(&block_dao, block, tx, script.clone(), *gas)?;
            }
            block_dao.store_as_transaction(tx, block.index())?;
        }

        // Per-block native hooks, in registration order.
        let mut ic =
            self.interop_context(TriggerType::Application, &block_dao, Some(block.clone()), None);
        for native in self.natives.contracts() {
            if let Some(on_persist) = &native.on_persist {
                on_persist(&mut ic)?;
            }
        }
        ic.dao.persist()?;

        block_dao.store_as_block(block, cumulative_fee)?;
        block_dao.put_current_block(block.hash(), block.index())?;

        let new_header = (self.state.header_count() as u32) == block.index();
        if new_header {
            block_dao.put_current_header(block.hash(), block.index())?;
        }

        block_dao.persist()?;
        if new_header {
            self.state.header_hashes.write().push(block.hash());
            self.write_full_header_pages()?;
        }
        self.persist_with_retry()
    }

    fn persist_with_retry(&self) -> Result<()> {
        match self.dao.persist() {
            Ok(count) => {
                debug!(entries = count, "flushed to backend");
                Ok(())
            }
            Err(first) => {
                warn!(error = %first, "backend flush failed, retrying once");
                match self.dao.persist() {
                    Ok(count) => {
                        debug!(entries = count, "flush retry succeeded");
                        Ok(())
                    }
                    Err(second) => Err(second),
                }
            }
        }
    }

    /// The base system fee of a transaction, in whole units.
    pub fn system_fee(&self, tx: &Transaction) -> Fixed8 {
        match &tx.data {
            TransactionData::Invocation { gas, .. } => *gas,
            _ => Fixed8::from_int(
                self.state
                    .config
                    .system_fee_for(tx.tx_type().config_name()),
            )
            .unwrap_or(Fixed8::ZERO),
        }
    }

    // -- transaction-level effects

    fn apply_inputs(&self, dao: &Dao, tx: &Transaction, height: u32) -> Result<()> {
        for (prev_hash, group) in group_inputs_by_prev_hash(&tx.inputs) {
            let mut unspent = dao.get_unspent_coin(prev_hash)?;
            for input in group {
                let state = unspent
                    .states
                    .get_mut(input.prev_index as usize)
                    .ok_or_else(|| {
                        LedgerError::Verification(format!(
                            "input {}:{} does not exist",
                            input.prev_hash, input.prev_index
                        ))
                    })?;
                if state.state.contains(CoinState::SPENT) {
                    return Err(LedgerError::Verification(format!(
                        "input {}:{} already spent",
                        input.prev_hash, input.prev_index
                    )));
                }
                state.state |= CoinState::SPENT;
                state.spend_height = height;

                let output = state.output;
                let mut account = dao.get_account_or_new(output.script_hash)?;
                account.adjust_balance(output.asset_id, -output.amount);
                if output.asset_id == self.governing_id {
                    self.adjust_vote_weight(dao, &account.votes, -output.amount)?;
                }
                dao.put_account(&account)?;
            }
            dao.put_unspent_coin(prev_hash, &unspent)?;
        }
        Ok(())
    }

    fn apply_outputs(&self, dao: &Dao, tx: &Transaction, height: u32) -> Result<()> {
        for output in &tx.outputs {
            let mut account = dao.get_account_or_new(output.script_hash)?;
            account.adjust_balance(output.asset_id, output.amount);
            if output.asset_id == self.governing_id {
                self.adjust_vote_weight(dao, &account.votes, output.amount)?;
            }
            dao.put_account(&account)?;
        }
        if !tx.outputs.is_empty() {
            dao.put_unspent_coin(tx.hash(), &UnspentCoin::new(height, &tx.outputs))?;
        }
        Ok(())
    }

    fn adjust_vote_weight(
        &self,
        dao: &Dao,
        votes: &[PublicKey],
        delta: Fixed8,
    ) -> Result<()> {
        if votes.is_empty() || delta == Fixed8::ZERO {
            return Ok(());
        }
        for key in votes {
            let mut validator = dao.get_validator_or_new(key)?;
            validator.votes = Fixed8::from_raw(validator.votes.raw() + delta.raw());
            dao.put_validator(&validator)?;
        }
        let mut counts = dao.get_validators_count()?;
        counts.adjust(votes.len(), delta);
        dao.put_validators_count(&counts)
    }

    fn apply_state_effects(&self, dao: &Dao, tx: &Transaction) -> Result<()> {
        match &tx.data {
            TransactionData::Register(data) => {
                let asset = Asset {
                    id: tx.hash(),
                    asset_type: data.asset_type,
                    name: data.name.clone(),
                    amount: data.amount,
                    available: Fixed8::ZERO,
                    precision: data.precision,
                    owner: data.owner.clone(),
                    admin: data.admin,
                    issuer: data.admin,
                    expiration: self.state.block_height() + 1 + 2 * DECREMENT_INTERVAL,
                    is_frozen: false,
                };
                dao.put_asset(&asset)
            }
            TransactionData::Issue => {
                // Outputs mint circulating supply of the issued assets.
                for output in &tx.outputs {
                    let mut asset = dao.get_asset(output.asset_id)?;
                    let available = asset.available.checked_add(output.amount)?;
                    if available > asset.amount {
                        return Err(LedgerError::Verification(format!(
                            "issue exceeds the registered amount of {}",
                            asset.id
                        )));
                    }
                    asset.available = available;
                    dao.put_asset(&asset)?;
                }
                Ok(())
            }
            TransactionData::Enrollment { public_key } => {
                let mut validator = dao.get_validator_or_new(public_key)?;
                validator.registered = true;
                dao.put_validator(&validator)
            }
            TransactionData::Claim { claims } => {
                if dao.is_double_claim(claims) {
                    return Err(LedgerError::Verification("double claim".into()));
                }
                for (prev_hash, group) in group_inputs_by_prev_hash(claims) {
                    let mut unspent = dao.get_unspent_coin(prev_hash)?;
                    for input in group {
                        let state = unspent
                            .states
                            .get_mut(input.prev_index as usize)
                            .ok_or_else(|| {
                                LedgerError::Verification("claim input does not exist".into())
                            })?;
                        state.state |= CoinState::CLAIMED;
                    }
                    dao.put_unspent_coin(prev_hash, &unspent)?;
                }
                Ok(())
            }
            TransactionData::Publish(data) => {
                let contract = ContractState {
                    script: data.script.clone(),
                    param_list: data.param_list.clone(),
                    return_type: data.return_type,
                    properties: if data.needs_storage {
                        neo_smart_contract::ContractPropertyState::HAS_STORAGE
                    } else {
                        neo_smart_contract::ContractPropertyState::empty()
                    },
                    name: data.name.clone(),
                    code_version: data.code_version.clone(),
                    author: data.author.clone(),
                    email: data.email.clone(),
                    description: data.description.clone(),
                };
                dao.put_contract(&contract)
            }
            TransactionData::Miner { .. }
            | TransactionData::Contract
            | TransactionData::Invocation { .. } => Ok(()),
        }
    }

    fn execute_invocation(
        &self,
        block_dao: &Dao,
        block: &Block,
        tx: &Transaction,
        script: Vec<u8>,
        gas: Fixed8,
    ) -> Result<()> {
        let ic = Rc::new(RefCell::new(self.interop_context(
            TriggerType::Application,
            block_dao,
            Some(block.clone()),
            Some(tx.clone()),
        )));
        let mut vm = spawn_vm(&ic);
        vm.register_interop_getter(NativeRegistry::interop_getter(&self.natives, ic.clone()));
        let limit = self
            .state
            .config
            .free_gas_limit
            .saturating_add(gas.raw());
        vm.set_gas_limit(Some(limit));
        vm.load_script(script, true);
        vm.execute();

        let halted = vm.state() == VmState::Halt;
        let notifications = std::mem::take(&mut ic.borrow_mut().notifications);

        if halted {
            let ic = ic.borrow();
            for note in &notifications {
                self.process_transfer_notification(&ic.dao, note, block.index(), tx.hash())?;
            }
            ic.dao.persist()?;
        } else {
            warn!(tx = %tx.hash(), reason = ?vm.fault_reason(), "invocation faulted");
        }

        let result = AppExecResult::from_vm(tx.hash(), TriggerType::Application, &vm, notifications);
        block_dao.put_app_exec_result(&result)
    }

    fn process_transfer_notification(
        &self,
        dao: &Dao,
        note: &NotificationEvent,
        block_index: u32,
        tx_hash: UInt256,
    ) -> Result<()> {
        let Ok(item) = note.to_item() else {
            return Ok(());
        };
        let Ok(fields) = item.to_vec() else {
            return Ok(());
        };
        if fields.len() != 4 {
            return Ok(());
        }
        let Ok(name) = fields[0].to_bytes() else {
            return Ok(());
        };
        if name != b"Transfer" {
            return Ok(());
        }
        let endpoint = |item: &StackItem| -> Option<UInt160> {
            let bytes = item.to_bytes().ok()?;
            UInt160::from_bytes_be(&bytes).ok()
        };
        let from = endpoint(&fields[1]);
        let to = endpoint(&fields[2]);
        let Ok(amount) = fields[3].to_bigint().map(|a| neo_vm::bigint_to_i64(&a)) else {
            return Ok(());
        };
        let Ok(amount) = amount else {
            return Ok(());
        };

        let transfer = Nep5Transfer {
            asset: note.script_hash,
            from: from.unwrap_or_default(),
            to: to.unwrap_or_default(),
            amount,
            block: block_index,
            timestamp: self
                .state
                .header_hash(block_index)
                .and_then(|h| dao.get_block(h).ok())
                .map(|(b, _)| b.header.timestamp)
                .unwrap_or(0),
            tx: tx_hash,
        };
        for (account, delta) in [(from, -amount), (to, amount)] {
            let Some(account) = account else { continue };
            let mut balances = dao.get_nep5_balances(account)?;
            let tracker = balances.trackers.entry(note.script_hash).or_default();
            tracker.balance += delta;
            tracker.last_updated_block = block_index;
            let page = balances.next_transfer_batch;
            if dao.append_nep5_transfer(account, page, &transfer)? {
                balances.next_transfer_batch += 1;
            }
            dao.put_nep5_balances(account, &balances)?;
        }
        Ok(())
    }

    // -- verification

    fn verify_transaction(&self, dao: &Dao, tx: &Transaction) -> Result<()> {
        let mut inputs = tx.inputs.clone();
        inputs.sort();
        if inputs.windows(2).any(|w| w[0] == w[1]) {
            return Err(LedgerError::Verification("duplicate inputs".into()));
        }

        // Per-asset balance equation over the resolved references.
        let mut deltas: std::collections::BTreeMap<UInt256, i64> =
            std::collections::BTreeMap::new();
        for (prev_hash, group) in group_inputs_by_prev_hash(&tx.inputs) {
            let unspent = dao.get_unspent_coin(prev_hash)?;
            for input in group {
                let state = unspent
                    .states
                    .get(input.prev_index as usize)
                    .ok_or_else(|| LedgerError::Verification("missing reference".into()))?;
                *deltas.entry(state.output.asset_id).or_default() += state.output.amount.raw();
            }
        }
        for output in &tx.outputs {
            *deltas.entry(output.asset_id).or_default() -= output.amount.raw();
        }
        for (asset, delta) in &deltas {
            match delta.cmp(&0) {
                std::cmp::Ordering::Equal => {}
                // Fees leave through the utility token only.
                std::cmp::Ordering::Greater => {
                    if *asset != self.utility_id {
                        return Err(LedgerError::Verification(format!(
                            "asset {asset} is underspent"
                        )));
                    }
                }
                std::cmp::Ordering::Less => {
                    let allowed = matches!(
                        tx.tx_type(),
                        TransactionType::Issue | TransactionType::Miner | TransactionType::Claim
                    );
                    if !allowed {
                        return Err(LedgerError::Verification(format!(
                            "outputs exceed inputs for asset {asset}"
                        )));
                    }
                }
            }
        }

        if let TransactionData::Invocation { script, gas } = &tx.data {
            if script.is_empty() || gas.is_negative() {
                return Err(LedgerError::Verification("malformed invocation".into()));
            }
        }

        self.verify_tx_witnesses(dao, tx)
    }

    fn verify_tx_witnesses(&self, dao: &Dao, tx: &Transaction) -> Result<()> {
        let ic = self.interop_context(TriggerType::Verification, dao, None, Some(tx.clone()));
        let mut required = ic.verifying_hashes()?;
        required.sort();

        if required.len() != tx.witnesses.len() {
            return Err(LedgerError::Verification(format!(
                "{} witnesses supplied, {} required",
                tx.witnesses.len(),
                required.len()
            )));
        }
        let mut writer = neo_io::BinaryWriter::new();
        tx.serialize_unsigned(&mut writer);
        let unsigned = writer.into_bytes()?;
        let checked_hash = neo_cryptography::sha256(&unsigned);

        for (hash, witness) in required.iter().zip(&tx.witnesses) {
            let ok = self.verify_witness(
                dao,
                *hash,
                witness,
                checked_hash,
                Some(self.state.config.free_gas_limit),
            )?;
            if !ok {
                return Err(LedgerError::Verification(format!(
                    "witness for {hash} failed"
                )));
            }
        }
        Ok(())
    }

    /// Runs one witness: the invocation script pushes arguments, then the
    /// verification script must halt with a single truthy item. Gas is
    /// accounted under the network-fee budget.
    fn verify_witness(
        &self,
        dao: &Dao,
        hash: UInt160,
        witness: &Witness,
        checked_hash: [u8; 32],
        gas_limit: Option<i64>,
    ) -> Result<bool> {
        let verification = if witness.verification_script.is_empty() {
            dao.get_contract(hash)?.script
        } else {
            if witness.script_hash() != hash {
                return Ok(false);
            }
            witness.verification_script.clone()
        };

        let ic = Rc::new(RefCell::new(self.interop_context(
            TriggerType::Verification,
            dao,
            None,
            None,
        )));
        let mut vm = spawn_vm(&ic);
        vm.register_interop_getter(NativeRegistry::interop_getter(&self.natives, ic.clone()));
        vm.set_gas_limit(gas_limit);
        vm.set_checked_hash(checked_hash);
        vm.load_script(verification, false);
        if !witness.invocation_script.is_empty() {
            vm.load_script(witness.invocation_script.clone(), false);
        }
        vm.execute();

        if vm.state() != VmState::Halt {
            return Ok(false);
        }
        let stack = vm.estack();
        Ok(stack.len() == 1 && stack[0].to_bool())
    }

    // -- read paths

    /// A block by hash, fully restored.
    pub fn get_block(&self, hash: UInt256) -> Result<Block> {
        let (trimmed, _) = self.dao.get_block(hash)?;
        let mut transactions = Vec::with_capacity(trimmed.tx_hashes.len());
        for tx_hash in &trimmed.tx_hashes {
            transactions.push(self.dao.get_transaction(*tx_hash)?.0);
        }
        Ok(Block::new(trimmed.header, transactions))
    }

    /// A header by height.
    pub fn get_header(&self, index: u32) -> Result<Header> {
        let hash = self
            .state
            .header_hash(index)
            .ok_or_else(|| LedgerError::Verification(format!("no header at {index}")))?;
        Ok(self.dao.get_block(hash)?.0.header)
    }

    /// A trimmed block plus its cumulative system fee.
    pub fn get_trimmed_block(&self, hash: UInt256) -> Result<(TrimmedBlock, u32)> {
        self.dao.get_block(hash)
    }

    /// The execution result recorded for a transaction.
    pub fn get_app_exec_result(&self, tx_hash: UInt256) -> Result<AppExecResult> {
        self.dao.get_app_exec_result(tx_hash)
    }
}

fn parse_standby_validators(config: &ProtocolSettings) -> Result<Vec<PublicKey>> {
    if config.standby_validators.is_empty() {
        return Err(LedgerError::Verification(
            "no standby validators configured".into(),
        ));
    }
    config
        .standby_validators
        .iter()
        .map(|hex| PublicKey::from_hex(hex).map_err(LedgerError::from))
        .collect()
}

/// The genesis registration of the governing token.
pub fn governing_token_tx() -> Transaction {
    Transaction::new(
        TransactionData::Register(Box::new(neo_core::RegisterData {
            asset_type: neo_core::AssetType::GoverningToken,
            name: "[{\"lang\":\"zh-CN\",\"name\":\"小蚁股\"},{\"lang\":\"en\",\"name\":\"AntShare\"}]"
                .to_string(),
            amount: Fixed8::from_raw(100_000_000 * 100_000_000),
            precision: 0,
            owner: PublicKey::infinity(),
            admin: UInt160::from_script(&[0x51]),
        })),
        0,
    )
}

/// The genesis registration of the utility token.
pub fn utility_token_tx() -> Transaction {
    let total: i64 = GENERATION_AMOUNT.iter().sum::<i64>() * i64::from(DECREMENT_INTERVAL);
    Transaction::new(
        TransactionData::Register(Box::new(neo_core::RegisterData {
            asset_type: neo_core::AssetType::UtilityToken,
            name: "[{\"lang\":\"zh-CN\",\"name\":\"小蚁币\"},{\"lang\":\"en\",\"name\":\"AntCoin\"}]"
                .to_string(),
            amount: Fixed8::from_raw(total * 100_000_000),
            precision: 8,
            owner: PublicKey::infinity(),
            admin: UInt160::from_script(&[0x00]),
        })),
        0,
    )
}

/// Builds the deterministic genesis block for a standby committee.
pub fn genesis_block(
    standby: &[PublicKey],
    governing_tx: Transaction,
    utility_tx: Transaction,
) -> Result<Block> {
    let threshold = standby.len() / 2 + 1;
    let consensus_script =
        neo_smart_contract::create_multisig_redeem_script(threshold, standby)
            .map_err(|e| LedgerError::Verification(e.to_string()))?;
    let next_consensus = UInt160::from_script(&consensus_script);

    let governing_id = governing_tx.hash();
    let mut issue = Transaction::new(TransactionData::Issue, 0);
    issue.outputs.push(neo_core::Output::new(
        governing_id,
        governing_issue_amount(),
        next_consensus,
    ));
    issue
        .witnesses
        .push(Witness::new(Vec::new(), vec![0x51]));

    let mut block = Block::new(
        Header {
            version: 0,
            prev_hash: UInt256::zero(),
            merkle_root: UInt256::zero(),
            timestamp: GENESIS_TIMESTAMP,
            index: 0,
            consensus_data: GENESIS_NONCE,
            next_consensus,
            witness: Witness::new(Vec::new(), vec![0x51]),
        },
        vec![
            Transaction::new_miner(GENESIS_NONCE as u32),
            governing_tx,
            utility_tx,
            issue,
        ],
    );
    block.rebuild_merkle_root();
    Ok(block)
}

fn governing_issue_amount() -> Fixed8 {
    Fixed8::from_raw(100_000_000 * 100_000_000)
}
