//! Interop-layer scenarios: contract lifecycle, storage, enumerators and
//! runtime services driven through real invocations.

use neo_config::ProtocolSettings;
use neo_core::{Attribute, AttributeUsage, Fixed8, Transaction, UInt160, UInt256, Witness};
use neo_ledger::block::{Block, Header};
use neo_ledger::Blockchain;
use neo_persistence::MemoryStore;
use neo_vm::{OpCode, ScriptBuilder};
use std::sync::Arc;

fn test_chain() -> Blockchain {
    let mut config = ProtocolSettings::default();
    config.verify_blocks = false;
    config.verify_transactions = false;
    Blockchain::new(Arc::new(MemoryStore::new()), config).unwrap()
}

fn next_block(chain: &Blockchain, txs: Vec<Transaction>) -> Block {
    let index = chain.block_height() + 1;
    let prev_header = chain.get_header(chain.block_height()).unwrap();
    let mut transactions = vec![Transaction::new_miner(index)];
    transactions.extend(txs);
    let mut block = Block::new(
        Header {
            version: 0,
            prev_hash: chain.current_block_hash(),
            merkle_root: UInt256::zero(),
            timestamp: prev_header.timestamp + 15,
            index,
            consensus_data: u64::from(index),
            next_consensus: prev_header.next_consensus,
            witness: Witness::new(Vec::new(), vec![0x51]),
        },
        transactions,
    );
    block.rebuild_merkle_root();
    block
}

fn apply_script(chain: &Blockchain, script: Vec<u8>) -> neo_ledger::state::AppExecResult {
    let tx = Transaction::new_invocation(script, Fixed8::ZERO);
    let hash = tx.hash();
    chain.add_block(&next_block(chain, vec![tx])).unwrap();
    chain.get_app_exec_result(hash).unwrap()
}

/// A contract whose body writes `value` under `key` in its own storage.
fn storage_writer_contract() -> Vec<u8> {
    let mut body = ScriptBuilder::new();
    body.emit_string("stored value");
    body.emit_string("key");
    body.emit_syscall("Neo.Storage.GetContext");
    body.emit_syscall("Neo.Storage.Put");
    body.emit(OpCode::Push1);
    body.emit(OpCode::Ret);
    body.into_bytes()
}

fn deploy_script(contract_script: &[u8], needs_storage: bool) -> Vec<u8> {
    let mut b = ScriptBuilder::new();
    // Arguments are popped script-first, so push in reverse.
    b.emit_string("a storage test contract"); // description
    b.emit_string("dev@example.org"); // email
    b.emit_string("dev"); // author
    b.emit_string("1.0"); // code version
    b.emit_string("storage-writer"); // name
    b.emit_int(if needs_storage { 0x01 } else { 0x00 }); // properties
    b.emit_int(0x05); // return type: byte array
    b.emit_bytes(&[0x05]); // parameter list
    b.emit_bytes(contract_script);
    b.emit_syscall("Neo.Contract.Create");
    b.emit(OpCode::Drop);
    b.into_bytes()
}

#[test]
fn contract_create_then_storage_put_through_appcall() {
    let chain = test_chain();
    let contract_script = storage_writer_contract();
    let contract_hash = UInt160::from_script(&contract_script);

    let result = apply_script(&chain, deploy_script(&contract_script, true));
    assert_eq!(result.vm_state, "HALT");

    let stored = chain.dao().get_contract(contract_hash).unwrap();
    assert!(stored.has_storage());
    assert_eq!(stored.name, "storage-writer");

    // Invoke the deployed contract; it writes through its own context.
    let mut b = ScriptBuilder::new();
    b.emit_appcall(contract_hash, false);
    let result = apply_script(&chain, b.into_bytes());
    assert_eq!(result.vm_state, "HALT");

    let item = chain
        .dao()
        .get_storage_item(contract_hash, b"key")
        .expect("the contract must have written its key");
    assert_eq!(item.value, b"stored value");
    assert!(!item.is_constant);
}

#[test]
fn storage_writes_require_the_storage_capability() {
    let chain = test_chain();
    let contract_script = storage_writer_contract();
    let contract_hash = UInt160::from_script(&contract_script);

    // Deployed without storage: the write faults and nothing lands.
    let result = apply_script(&chain, deploy_script(&contract_script, false));
    assert_eq!(result.vm_state, "HALT");

    let mut b = ScriptBuilder::new();
    b.emit_appcall(contract_hash, false);
    let result = apply_script(&chain, b.into_bytes());
    assert_eq!(result.vm_state, "FAULT");
    assert!(chain
        .dao()
        .get_storage_item(contract_hash, b"key")
        .is_none());
}

#[test]
fn enumerator_walks_array_values() {
    let chain = test_chain();
    let mut b = ScriptBuilder::new();
    b.emit_int(1).emit_int(2).emit_int(3);
    b.emit_int(3).emit(OpCode::Pack);
    b.emit_syscall("Neo.Enumerator.Create");
    b.emit(OpCode::Dup);
    b.emit_syscall("Neo.Enumerator.Next");
    b.emit(OpCode::ThrowIfNot);
    b.emit(OpCode::Dup);
    b.emit_syscall("Neo.Enumerator.Value");
    b.emit(OpCode::Nip); // drop the enumerator, keep the value

    let result = apply_script(&chain, b.into_bytes());
    assert_eq!(result.vm_state, "HALT");
    let stack = result.stack_items().unwrap();
    assert_eq!(stack.len(), 1);
    // PACK puts the top of the stack first, so the first value is 3.
    assert_eq!(stack[0].to_bigint().unwrap(), num_bigint::BigInt::from(3));
}

#[test]
fn runtime_serialize_round_trips_through_the_vm() {
    let chain = test_chain();
    let mut b = ScriptBuilder::new();
    b.emit_int(42);
    b.emit_syscall("Neo.Runtime.Serialize");
    b.emit_syscall("Neo.Runtime.Deserialize");

    let result = apply_script(&chain, b.into_bytes());
    assert_eq!(result.vm_state, "HALT");
    let stack = result.stack_items().unwrap();
    assert_eq!(stack[0].to_bigint().unwrap(), num_bigint::BigInt::from(42));
}

#[test]
fn get_validators_returns_the_sorted_standby_committee() {
    let chain = test_chain();
    let mut b = ScriptBuilder::new();
    b.emit_int(0).emit(OpCode::Pack); // no arguments
    b.emit_string("getValidators");
    b.emit_appcall(chain.neo_token().hash(), false);

    let result = apply_script(&chain, b.into_bytes());
    assert_eq!(result.vm_state, "HALT");
    let stack = result.stack_items().unwrap();
    let keys = stack[0].to_vec().unwrap();

    let mut expected: Vec<Vec<u8>> = chain
        .chain_state()
        .standby_validators
        .iter()
        .map(|k| k.to_bytes())
        .collect();
    expected.sort();
    let returned: Vec<Vec<u8>> = keys.iter().map(|k| k.to_bytes().unwrap()).collect();
    assert_eq!(returned, expected);
}

#[test]
fn check_witness_sees_script_attributes() {
    let chain = test_chain();
    let witnessed = UInt160::from_script(b"the witnessed account");

    let mut b = ScriptBuilder::new();
    b.emit_bytes(&witnessed.to_array_be());
    b.emit_syscall("Neo.Runtime.CheckWitness");

    let mut tx = Transaction::new_invocation(b.into_bytes(), Fixed8::ZERO);
    tx.attributes.push(Attribute::new(
        AttributeUsage::Script,
        witnessed.to_array_be().to_vec(),
    ));
    let hash = tx.hash();
    chain.add_block(&next_block(&chain, vec![tx])).unwrap();

    let result = chain.get_app_exec_result(hash).unwrap();
    assert_eq!(result.vm_state, "HALT");
    assert!(result.stack_items().unwrap()[0].to_bool());
}

#[test]
fn overdraft_native_transfer_reports_false_and_changes_nothing() {
    let chain = test_chain();
    let poor = UInt160::from_script(b"poor account");
    let rich = UInt160::from_script(b"some destination");

    let mut b = ScriptBuilder::new();
    b.emit_int(5)
        .emit_bytes(&rich.to_array_be())
        .emit_bytes(&poor.to_array_be())
        .emit_int(3)
        .emit(OpCode::Pack)
        .emit_string("transfer")
        .emit_appcall(chain.neo_token().hash(), false);

    let result = apply_script(&chain, b.into_bytes());
    assert_eq!(result.vm_state, "HALT");
    assert!(!result.stack_items().unwrap()[0].to_bool());

    // Balances stay non-negative and untouched.
    assert_eq!(chain.dao().get_account_or_new(poor).unwrap().neo.balance, 0);
    assert_eq!(chain.dao().get_account_or_new(rich).unwrap().neo.balance, 0);
}

#[test]
fn legacy_namespace_aliases_resolve_to_the_same_handlers() {
    let chain = test_chain();
    let mut b = ScriptBuilder::new();
    b.emit_syscall("AntShares.Blockchain.GetHeight");
    b.emit_syscall("Neo.Blockchain.GetHeight");
    b.emit(OpCode::NumEqual);

    let result = apply_script(&chain, b.into_bytes());
    assert_eq!(result.vm_state, "HALT");
    assert!(result.stack_items().unwrap()[0].to_bool());
}
