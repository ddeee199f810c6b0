//! The interop layer: host functions callable from bytecode via `SYSCALL`.
//!
//! Handlers are registered in two id-sorted tables (`System.*` and `Neo.*`
//! with the legacy `AntShares.*` aliases) and resolved by binary search.
//! Handlers run under the VM's fault containment, so they pop typed
//! arguments and raise errors freely; a raised error becomes a `FAULT`.

pub mod chain_ops;
pub mod contract_ops;
pub mod crypto_ops;
pub mod enumerator_ops;
pub mod runtime_ops;
pub mod storage_ops;

use crate::blockchain::ChainState;
use crate::block::{Block, Header};
use crate::dao::Dao;
use crate::state::NotificationEvent;
use crate::Result;
use lazy_static::lazy_static;
use neo_core::{Transaction, UInt160};
use neo_smart_contract::TriggerType;
use neo_vm::{interop_name_to_id, InteropFuncPrice, InteropGetter, StackItem, Vm, VmError, VmResult};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// Everything a handler may observe or mutate: the trigger, the containing
/// block and transaction, the innermost DAO layer and the notifications
/// collected so far.
pub struct InteropContext {
    pub trigger: TriggerType,
    pub block: Option<Block>,
    pub tx: Option<Transaction>,
    pub dao: Dao,
    pub notifications: Vec<NotificationEvent>,
    pub chain: Arc<ChainState>,
}

impl InteropContext {
    /// Creates a context over a fresh DAO layer nested in `dao`.
    pub fn new(
        trigger: TriggerType,
        chain: Arc<ChainState>,
        dao: &Dao,
        block: Option<Block>,
        tx: Option<Transaction>,
    ) -> Self {
        Self {
            trigger,
            block,
            tx,
            dao: dao.nested(),
            notifications: Vec::new(),
            chain,
        }
    }

    /// The script hashes that must be witnessed for the current
    /// transaction: referenced output owners, explicit `Script` attributes
    /// and the enrollee of an enrollment, deduplicated and sorted.
    pub fn verifying_hashes(&self) -> Result<Vec<UInt160>> {
        let Some(tx) = &self.tx else {
            return Ok(Vec::new());
        };
        let mut hashes = Vec::new();
        for (prev_hash, group) in neo_core::group_inputs_by_prev_hash(&tx.inputs) {
            let unspent = self.dao.get_unspent_coin(prev_hash)?;
            for input in group {
                if let Some(state) = unspent.states.get(input.prev_index as usize) {
                    hashes.push(state.output.script_hash);
                }
            }
        }
        for attribute in &tx.attributes {
            if attribute.usage == neo_core::AttributeUsage::Script {
                if let Ok(hash) = UInt160::from_bytes_be(&attribute.data) {
                    hashes.push(hash);
                }
            }
        }
        if let neo_core::TransactionData::Enrollment { public_key } = &tx.data {
            let script = neo_smart_contract::create_signature_redeem_script(public_key);
            hashes.push(UInt160::from_script(&script));
        }
        hashes.sort();
        hashes.dedup();
        Ok(hashes)
    }
}

/// An interop table entry: name, derived id, handler and price.
pub struct InteropedFunction {
    pub id: u32,
    pub name: &'static str,
    pub func: HandlerFn,
    pub price: i64,
}

/// A table handler. Runs with exclusive access to the context.
pub type HandlerFn = fn(&mut InteropContext, &mut Vm) -> VmResult<()>;

fn table(entries: Vec<(&'static str, HandlerFn, i64)>) -> Vec<InteropedFunction> {
    let mut functions: Vec<InteropedFunction> = entries
        .into_iter()
        .map(|(name, func, price)| InteropedFunction {
            id: interop_name_to_id(name.as_bytes()),
            name,
            func,
            price,
        })
        .collect();
    functions.sort_by_key(|f| f.id);
    functions
}

lazy_static! {
    /// The `System.*` namespace, sorted by id.
    pub static ref SYSTEM_INTEROPS: Vec<InteropedFunction> = table(vec![
        ("System.Block.GetTransaction", chain_ops::block_get_transaction as HandlerFn, 1),
        ("System.Block.GetTransactionCount", chain_ops::block_get_transaction_count, 1),
        ("System.Block.GetTransactions", chain_ops::block_get_transactions, 1),
        ("System.Blockchain.GetBlock", chain_ops::bc_get_block, 200),
        ("System.Blockchain.GetContract", chain_ops::bc_get_contract, 100),
        ("System.Blockchain.GetHeader", chain_ops::bc_get_header, 100),
        ("System.Blockchain.GetHeight", chain_ops::bc_get_height, 1),
        ("System.Blockchain.GetTransaction", chain_ops::bc_get_transaction, 200),
        ("System.Blockchain.GetTransactionHeight", chain_ops::bc_get_transaction_height, 100),
        ("System.Contract.Destroy", contract_ops::contract_destroy, 1),
        ("System.Contract.GetStorageContext", contract_ops::contract_get_storage_context, 1),
        ("System.ExecutionEngine.GetCallingScriptHash", chain_ops::engine_get_calling_script_hash, 1),
        ("System.ExecutionEngine.GetEntryScriptHash", chain_ops::engine_get_entry_script_hash, 1),
        ("System.ExecutionEngine.GetExecutingScriptHash", chain_ops::engine_get_executing_script_hash, 1),
        ("System.ExecutionEngine.GetScriptContainer", chain_ops::engine_get_script_container, 1),
        ("System.Header.GetHash", chain_ops::header_get_hash, 1),
        ("System.Header.GetIndex", chain_ops::header_get_index, 1),
        ("System.Header.GetPrevHash", chain_ops::header_get_prev_hash, 1),
        ("System.Header.GetTimestamp", chain_ops::header_get_timestamp, 1),
        ("System.Runtime.CheckWitness", runtime_ops::check_witness, 200),
        ("System.Runtime.Deserialize", runtime_ops::deserialize, 1),
        ("System.Runtime.GetTime", runtime_ops::get_time, 1),
        ("System.Runtime.GetTrigger", runtime_ops::get_trigger, 1),
        ("System.Runtime.Log", runtime_ops::log, 1),
        ("System.Runtime.Notify", runtime_ops::notify, 1),
        ("System.Runtime.Platform", runtime_ops::platform, 1),
        ("System.Runtime.Serialize", runtime_ops::serialize, 1),
        ("System.Storage.Delete", storage_ops::delete, 100),
        ("System.Storage.Get", storage_ops::get, 100),
        ("System.Storage.GetContext", storage_ops::get_context, 1),
        ("System.Storage.GetReadOnlyContext", storage_ops::get_read_only_context, 1),
        ("System.Storage.Put", storage_ops::put, 0),
        ("System.Storage.PutEx", storage_ops::put_ex, 0),
        ("System.StorageContext.AsReadOnly", storage_ops::context_as_read_only, 1),
        ("System.Transaction.GetHash", chain_ops::tx_get_hash, 1),
    ]);

    /// The `Neo.*` namespace plus the `AntShares.*` compatibility aliases,
    /// sorted by id.
    pub static ref NEO_INTEROPS: Vec<InteropedFunction> = {
        let mut entries: Vec<(&'static str, HandlerFn, i64)> = vec![
            ("Neo.Account.GetBalance", chain_ops::account_get_balance as HandlerFn, 1),
            ("Neo.Account.GetScriptHash", chain_ops::account_get_script_hash, 1),
            ("Neo.Account.GetVotes", chain_ops::account_get_votes, 1),
            ("Neo.Account.IsStandard", chain_ops::account_is_standard, 100),
            ("Neo.Asset.Create", chain_ops::asset_create, 0),
            ("Neo.Asset.GetAdmin", chain_ops::asset_get_admin, 1),
            ("Neo.Asset.GetAmount", chain_ops::asset_get_amount, 1),
            ("Neo.Asset.GetAssetId", chain_ops::asset_get_asset_id, 1),
            ("Neo.Asset.GetAssetType", chain_ops::asset_get_asset_type, 1),
            ("Neo.Asset.GetAvailable", chain_ops::asset_get_available, 1),
            ("Neo.Asset.GetIssuer", chain_ops::asset_get_issuer, 1),
            ("Neo.Asset.GetOwner", chain_ops::asset_get_owner, 1),
            ("Neo.Asset.GetPrecision", chain_ops::asset_get_precision, 1),
            ("Neo.Asset.Renew", chain_ops::asset_renew, 0),
            ("Neo.Attribute.GetData", chain_ops::attribute_get_data, 1),
            ("Neo.Attribute.GetUsage", chain_ops::attribute_get_usage, 1),
            ("Neo.Block.GetTransaction", chain_ops::block_get_transaction, 1),
            ("Neo.Block.GetTransactionCount", chain_ops::block_get_transaction_count, 1),
            ("Neo.Block.GetTransactions", chain_ops::block_get_transactions, 1),
            ("Neo.Blockchain.GetAccount", chain_ops::bc_get_account, 100),
            ("Neo.Blockchain.GetAsset", chain_ops::bc_get_asset, 100),
            ("Neo.Blockchain.GetBlock", chain_ops::bc_get_block, 200),
            ("Neo.Blockchain.GetContract", chain_ops::bc_get_contract, 100),
            ("Neo.Blockchain.GetHeader", chain_ops::bc_get_header, 100),
            ("Neo.Blockchain.GetHeight", chain_ops::bc_get_height, 1),
            ("Neo.Blockchain.GetTransaction", chain_ops::bc_get_transaction, 100),
            ("Neo.Blockchain.GetTransactionHeight", chain_ops::bc_get_transaction_height, 100),
            ("Neo.Blockchain.GetValidators", chain_ops::bc_get_validators, 200),
            ("Neo.Contract.Create", contract_ops::contract_create, 0),
            ("Neo.Contract.Destroy", contract_ops::contract_destroy, 1),
            ("Neo.Contract.GetScript", contract_ops::contract_get_script, 1),
            ("Neo.Contract.GetStorageContext", contract_ops::contract_get_storage_context, 1),
            ("Neo.Contract.IsPayable", contract_ops::contract_is_payable, 1),
            ("Neo.Contract.Migrate", contract_ops::contract_migrate, 0),
            ("Neo.Crypto.ECDsaVerify", crypto_ops::ecdsa_verify, 1),
            ("Neo.Crypto.ECDsaCheckMultiSig", crypto_ops::ecdsa_check_multisig, 1),
            ("Neo.Enumerator.Concat", enumerator_ops::concat, 1),
            ("Neo.Enumerator.Create", enumerator_ops::create, 1),
            ("Neo.Enumerator.Next", enumerator_ops::next, 1),
            ("Neo.Enumerator.Value", enumerator_ops::value, 1),
            ("Neo.Header.GetConsensusData", chain_ops::header_get_consensus_data, 1),
            ("Neo.Header.GetHash", chain_ops::header_get_hash, 1),
            ("Neo.Header.GetIndex", chain_ops::header_get_index, 1),
            ("Neo.Header.GetMerkleRoot", chain_ops::header_get_merkle_root, 1),
            ("Neo.Header.GetNextConsensus", chain_ops::header_get_next_consensus, 1),
            ("Neo.Header.GetPrevHash", chain_ops::header_get_prev_hash, 1),
            ("Neo.Header.GetTimestamp", chain_ops::header_get_timestamp, 1),
            ("Neo.Header.GetVersion", chain_ops::header_get_version, 1),
            ("Neo.Input.GetHash", chain_ops::input_get_hash, 1),
            ("Neo.Input.GetIndex", chain_ops::input_get_index, 1),
            ("Neo.InvocationTransaction.GetScript", chain_ops::invocation_tx_get_script, 1),
            ("Neo.Iterator.Concat", enumerator_ops::iterator_concat, 1),
            ("Neo.Iterator.Create", enumerator_ops::iterator_create, 1),
            ("Neo.Iterator.Key", enumerator_ops::iterator_key, 1),
            ("Neo.Iterator.Keys", enumerator_ops::iterator_keys, 1),
            ("Neo.Iterator.Values", enumerator_ops::iterator_values, 1),
            ("Neo.Output.GetAssetId", chain_ops::output_get_asset_id, 1),
            ("Neo.Output.GetScriptHash", chain_ops::output_get_script_hash, 1),
            ("Neo.Output.GetValue", chain_ops::output_get_value, 1),
            ("Neo.Runtime.CheckWitness", runtime_ops::check_witness, 200),
            ("Neo.Runtime.Deserialize", runtime_ops::deserialize, 1),
            ("Neo.Runtime.GetTime", runtime_ops::get_time, 1),
            ("Neo.Runtime.GetTrigger", runtime_ops::get_trigger, 1),
            ("Neo.Runtime.Log", runtime_ops::log, 1),
            ("Neo.Runtime.Notify", runtime_ops::notify, 1),
            ("Neo.Runtime.Serialize", runtime_ops::serialize, 1),
            ("Neo.Storage.Delete", storage_ops::delete, 100),
            ("Neo.Storage.Find", storage_ops::find, 1),
            ("Neo.Storage.Get", storage_ops::get, 100),
            ("Neo.Storage.GetContext", storage_ops::get_context, 1),
            ("Neo.Storage.GetReadOnlyContext", storage_ops::get_read_only_context, 1),
            ("Neo.Storage.Put", storage_ops::put, 0),
            ("Neo.StorageContext.AsReadOnly", storage_ops::context_as_read_only, 1),
            ("Neo.Transaction.GetAttributes", chain_ops::tx_get_attributes, 1),
            ("Neo.Transaction.GetHash", chain_ops::tx_get_hash, 1),
            ("Neo.Transaction.GetInputs", chain_ops::tx_get_inputs, 1),
            ("Neo.Transaction.GetOutputs", chain_ops::tx_get_outputs, 1),
            ("Neo.Transaction.GetReferences", chain_ops::tx_get_references, 200),
            ("Neo.Transaction.GetType", chain_ops::tx_get_type, 1),
            ("Neo.Transaction.GetUnspentCoins", chain_ops::tx_get_unspent_coins, 200),
            ("Neo.Transaction.GetWitnesses", chain_ops::tx_get_witnesses, 200),
            ("Neo.Witness.GetVerificationScript", chain_ops::witness_get_verification_script, 100),
            // Iterator aliases for the enumerator pair.
            ("Neo.Iterator.Next", enumerator_ops::next, 1),
            ("Neo.Iterator.Value", enumerator_ops::value, 1),
        ];
        // Old compatibility namespace, same handlers.
        entries.extend_from_slice(&[
            ("AntShares.Account.GetBalance", chain_ops::account_get_balance as HandlerFn, 1),
            ("AntShares.Account.GetScriptHash", chain_ops::account_get_script_hash, 1),
            ("AntShares.Account.GetVotes", chain_ops::account_get_votes, 1),
            ("AntShares.Asset.Create", chain_ops::asset_create, 0),
            ("AntShares.Asset.GetAdmin", chain_ops::asset_get_admin, 1),
            ("AntShares.Asset.GetAmount", chain_ops::asset_get_amount, 1),
            ("AntShares.Asset.GetAssetId", chain_ops::asset_get_asset_id, 1),
            ("AntShares.Asset.GetAssetType", chain_ops::asset_get_asset_type, 1),
            ("AntShares.Asset.GetAvailable", chain_ops::asset_get_available, 1),
            ("AntShares.Asset.GetIssuer", chain_ops::asset_get_issuer, 1),
            ("AntShares.Asset.GetOwner", chain_ops::asset_get_owner, 1),
            ("AntShares.Asset.GetPrecision", chain_ops::asset_get_precision, 1),
            ("AntShares.Asset.Renew", chain_ops::asset_renew, 0),
            ("AntShares.Attribute.GetData", chain_ops::attribute_get_data, 1),
            ("AntShares.Attribute.GetUsage", chain_ops::attribute_get_usage, 1),
            ("AntShares.Block.GetTransaction", chain_ops::block_get_transaction, 1),
            ("AntShares.Block.GetTransactionCount", chain_ops::block_get_transaction_count, 1),
            ("AntShares.Block.GetTransactions", chain_ops::block_get_transactions, 1),
            ("AntShares.Blockchain.GetAccount", chain_ops::bc_get_account, 100),
            ("AntShares.Blockchain.GetAsset", chain_ops::bc_get_asset, 100),
            ("AntShares.Blockchain.GetBlock", chain_ops::bc_get_block, 200),
            ("AntShares.Blockchain.GetContract", chain_ops::bc_get_contract, 100),
            ("AntShares.Blockchain.GetHeader", chain_ops::bc_get_header, 100),
            ("AntShares.Blockchain.GetHeight", chain_ops::bc_get_height, 1),
            ("AntShares.Blockchain.GetTransaction", chain_ops::bc_get_transaction, 100),
            ("AntShares.Blockchain.GetValidators", chain_ops::bc_get_validators, 200),
            ("AntShares.Contract.Create", contract_ops::contract_create, 0),
            ("AntShares.Contract.Destroy", contract_ops::contract_destroy, 1),
            ("AntShares.Contract.GetScript", contract_ops::contract_get_script, 1),
            ("AntShares.Contract.GetStorageContext", contract_ops::contract_get_storage_context, 1),
            ("AntShares.Contract.Migrate", contract_ops::contract_migrate, 0),
            ("AntShares.Header.GetConsensusData", chain_ops::header_get_consensus_data, 1),
            ("AntShares.Header.GetHash", chain_ops::header_get_hash, 1),
            ("AntShares.Header.GetMerkleRoot", chain_ops::header_get_merkle_root, 1),
            ("AntShares.Header.GetNextConsensus", chain_ops::header_get_next_consensus, 1),
            ("AntShares.Header.GetPrevHash", chain_ops::header_get_prev_hash, 1),
            ("AntShares.Header.GetTimestamp", chain_ops::header_get_timestamp, 1),
            ("AntShares.Header.GetVersion", chain_ops::header_get_version, 1),
            ("AntShares.Input.GetHash", chain_ops::input_get_hash, 1),
            ("AntShares.Input.GetIndex", chain_ops::input_get_index, 1),
            ("AntShares.Output.GetAssetId", chain_ops::output_get_asset_id, 1),
            ("AntShares.Output.GetScriptHash", chain_ops::output_get_script_hash, 1),
            ("AntShares.Output.GetValue", chain_ops::output_get_value, 1),
            ("AntShares.Runtime.CheckWitness", runtime_ops::check_witness, 200),
            ("AntShares.Runtime.Log", runtime_ops::log, 1),
            ("AntShares.Runtime.Notify", runtime_ops::notify, 1),
            ("AntShares.Storage.Delete", storage_ops::delete, 100),
            ("AntShares.Storage.Get", storage_ops::get, 100),
            ("AntShares.Storage.GetContext", storage_ops::get_context, 1),
            ("AntShares.Storage.Put", storage_ops::put, 0),
            ("AntShares.Transaction.GetAttributes", chain_ops::tx_get_attributes, 1),
            ("AntShares.Transaction.GetHash", chain_ops::tx_get_hash, 1),
            ("AntShares.Transaction.GetInputs", chain_ops::tx_get_inputs, 1),
            ("AntShares.Transaction.GetOutputs", chain_ops::tx_get_outputs, 1),
            ("AntShares.Transaction.GetReferences", chain_ops::tx_get_references, 200),
            ("AntShares.Transaction.GetType", chain_ops::tx_get_type, 1),
        ]);
        table(entries)
    };
}

fn getter_from_table(
    ic: Rc<RefCell<InteropContext>>,
    functions: &'static [InteropedFunction],
) -> InteropGetter {
    Box::new(move |id| {
        let index = functions.binary_search_by_key(&id, |f| f.id).ok()?;
        let entry = &functions[index];
        let ic = ic.clone();
        let func = entry.func;
        Some(InteropFuncPrice {
            func: Rc::new(move |vm: &mut Vm| func(&mut ic.borrow_mut(), vm)),
            price: entry.price,
        })
    })
}

/// The `System.*` getter for a context.
pub fn get_system_interop(ic: Rc<RefCell<InteropContext>>) -> InteropGetter {
    getter_from_table(ic, &SYSTEM_INTEROPS)
}

/// The `Neo.*`/`AntShares.*` getter for a context.
pub fn get_neo_interop(ic: Rc<RefCell<InteropContext>>) -> InteropGetter {
    getter_from_table(ic, &NEO_INTEROPS)
}

/// Returns a VM wired to the context: contract script resolution plus the
/// two interop namespaces. Native contracts are registered separately by
/// the applier.
pub fn spawn_vm(ic: &Rc<RefCell<InteropContext>>) -> Vm {
    let mut vm = Vm::new();
    let getter_ic = ic.clone();
    vm.set_script_getter(Box::new(move |hash| {
        let ic = getter_ic.borrow();
        let contract = ic.dao.get_contract(hash).ok()?;
        let dynamic = contract.has_dynamic_invoke();
        Some((contract.script, dynamic))
    }));
    vm.register_interop_getter(get_system_interop(ic.clone()));
    vm.register_interop_getter(get_neo_interop(ic.clone()));
    vm
}

// -- shared argument helpers

/// Pops a 20-byte big-endian script hash from the stack.
pub fn pop_uint160(vm: &mut Vm) -> VmResult<UInt160> {
    let bytes = vm.pop_bytes()?;
    UInt160::from_bytes_be(&bytes).map_err(|e| VmError::InvalidConversion(e.to_string()))
}

/// Pops a 32-byte big-endian hash from the stack.
pub fn pop_uint256(vm: &mut Vm) -> VmResult<neo_core::UInt256> {
    let bytes = vm.pop_bytes()?;
    neo_core::UInt256::from_bytes_be(&bytes).map_err(|e| VmError::InvalidConversion(e.to_string()))
}

/// Pops an interop item and clones the wrapped `T` out of it.
pub fn pop_interop<T: std::any::Any + Clone>(vm: &mut Vm, what: &str) -> VmResult<T> {
    let item = vm.pop()?;
    let StackItem::Interop(value) = item else {
        return Err(VmError::InvalidConversion(format!(
            "expected an interop {what}"
        )));
    };
    let borrowed = value.borrow();
    borrowed
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| VmError::InvalidConversion(format!("interop item is not a {what}")))
}

/// Pops a header from either a header or a block interop item.
pub fn pop_header(vm: &mut Vm) -> VmResult<Header> {
    let item = vm.pop()?;
    let StackItem::Interop(value) = item else {
        return Err(VmError::InvalidConversion("expected a header".into()));
    };
    let borrowed = value.borrow();
    if let Some(header) = borrowed.downcast_ref::<Header>() {
        return Ok(header.clone());
    }
    if let Some(block) = borrowed.downcast_ref::<Block>() {
        return Ok(block.header.clone());
    }
    Err(VmError::InvalidConversion(
        "interop item is neither a header nor a block".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_sorted_by_id() {
        for functions in [&*SYSTEM_INTEROPS, &*NEO_INTEROPS] {
            for pair in functions.windows(2) {
                assert!(pair[0].id < pair[1].id, "{} >= {}", pair[0].name, pair[1].name);
            }
        }
    }

    #[test]
    fn aliases_share_ids_with_nothing() {
        // Every name must hash to a distinct id within its table.
        let mut ids: Vec<u32> = NEO_INTEROPS.iter().map(|f| f.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), NEO_INTEROPS.len());
    }
}
