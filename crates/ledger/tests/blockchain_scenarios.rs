//! End-to-end scenarios driving the applier through real blocks.

use neo_config::ProtocolSettings;
use neo_core::{Fixed8, Input, Output, Transaction, TransactionData, UInt256, Witness};
use neo_ledger::block::{Block, Header};
use neo_ledger::native::NativeContract;
use neo_ledger::state::CoinState;
use neo_ledger::{Blockchain, LedgerError};
use neo_persistence::{MemoryStore, Store};
use neo_smart_contract::{ContractParameterType, MethodDescriptor, Parameter};
use neo_vm::{OpCode, ScriptBuilder, StackItem, VmError};
use parking_lot::Mutex;
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

/// A test native with a `sum(a, b)` method and an observable per-block
/// hook.
fn sum_native(blocks: Arc<Mutex<Vec<u32>>>) -> NativeContract {
    let mut contract = NativeContract::new("Test.Native.Sum");
    contract.add_method(
        MethodDescriptor::new(
            "sum",
            ContractParameterType::Integer,
            vec![
                Parameter::new("addend1", ContractParameterType::Integer),
                Parameter::new("addend2", ContractParameterType::Integer),
            ],
        ),
        1,
        true,
        Box::new(|_ic, args| {
            if args.len() != 2 {
                return Err(VmError::InteropFault("sum takes 2 arguments".into()));
            }
            let a = args[0].to_bigint()?;
            let b = args[1].to_bigint()?;
            Ok(StackItem::Integer(a + b))
        }),
    );
    contract.on_persist = Some(Box::new(move |ic| {
        if let Some(block) = &ic.block {
            blocks.lock().push(block.index());
        }
        Ok(())
    }));
    contract
}

#[test]
fn native_invocation_through_a_block() {
    let mut chain = test_chain();
    let observed = Arc::new(Mutex::new(Vec::new()));
    let native = sum_native(observed.clone());
    let native_hash = native.hash;
    chain.register_native(native).unwrap();

    let mut builder = ScriptBuilder::new();
    builder
        .emit_int(14)
        .emit_int(28)
        .emit_int(2)
        .emit(OpCode::Pack)
        .emit_string("sum")
        .emit_appcall(native_hash, false);
    let tx = Transaction::new_invocation(builder.into_bytes(), Fixed8::ZERO);
    let tx_hash = tx.hash();

    let block = next_block(&chain, vec![tx]);
    chain.add_block(&block).unwrap();

    let result = chain.get_app_exec_result(tx_hash).unwrap();
    assert_eq!(result.vm_state, "HALT");
    let stack = result.stack_items().unwrap();
    assert_eq!(stack.len(), 1);
    assert_eq!(stack[0].to_bigint().unwrap(), num_bigint::BigInt::from(42));

    // The hook observed exactly this block.
    assert_eq!(observed.lock().as_slice(), &[1]);

    chain.add_block(&next_block(&chain, vec![])).unwrap();
    assert_eq!(observed.lock().as_slice(), &[1, 2]);
}

#[test]
fn faulting_invocation_keeps_the_fee_and_drops_writes() {
    let chain = test_chain();

    let mut builder = ScriptBuilder::new();
    builder.emit(OpCode::Throw);
    let tx = Transaction::new_invocation(builder.into_bytes(), Fixed8::ZERO);
    let tx_hash = tx.hash();

    let block = next_block(&chain, vec![tx]);
    chain.add_block(&block).unwrap();
    assert_eq!(chain.block_height(), 1);

    let result = chain.get_app_exec_result(tx_hash).unwrap();
    assert_eq!(result.vm_state, "FAULT");
    assert!(result.notifications.is_empty());
}

#[test]
fn double_spend_block_is_rejected_and_anchors_untouched() {
    let chain = test_chain();
    let genesis = chain.get_block(chain.current_block_hash()).unwrap();
    let issue_hash = genesis.transactions[3].hash();
    let before = chain.dao().get_current_block().unwrap();

    let spend = |nonce: u8| {
        let mut tx = Transaction::new(TransactionData::Contract, nonce);
        tx.inputs.push(Input::new(issue_hash, 0));
        tx.outputs.push(Output::new(
            chain.governing_token_id(),
            Fixed8::from_raw(100_000_000 * 100_000_000),
            neo_core::UInt160::from_script(&[nonce]),
        ));
        tx
    };
    let block = next_block(&chain, vec![spend(1), spend(2)]);

    let err = chain.add_block(&block).unwrap_err();
    assert!(matches!(err, LedgerError::InvalidBlock(_)));
    assert_eq!(chain.block_height(), 0);
    assert_eq!(chain.dao().get_current_block().unwrap(), before);
}

#[test]
fn utxo_spend_moves_balances_and_marks_outputs() {
    let chain = test_chain();
    let genesis = chain.get_block(chain.current_block_hash()).unwrap();
    let issue = &genesis.transactions[3];
    let committee = issue.outputs[0].script_hash;
    let destination = neo_core::UInt160::from_script(b"recipient");
    let amount = issue.outputs[0].amount;

    let mut tx = Transaction::new(TransactionData::Contract, 0);
    tx.inputs.push(Input::new(issue.hash(), 0));
    tx.outputs
        .push(Output::new(chain.governing_token_id(), amount, destination));

    let tx_hash = tx.hash();
    chain.add_block(&next_block(&chain, vec![tx])).unwrap();

    let coin = chain.dao().get_unspent_coin(issue.hash()).unwrap();
    assert!(coin.states[0].state.contains(CoinState::SPENT));
    assert_eq!(coin.states[0].spend_height, 1);

    let sender = chain.dao().get_account(committee).unwrap();
    assert_eq!(sender.balance_of(&chain.governing_token_id()), Fixed8::ZERO);
    let receiver = chain.dao().get_account(destination).unwrap();
    assert_eq!(receiver.balance_of(&chain.governing_token_id()), amount);

    let fresh = chain.dao().get_unspent_coin(tx_hash).unwrap();
    assert!(fresh.states[0].state.is_empty());
}

#[test]
fn native_transfer_distributes_claimable_gas() {
    let chain = test_chain();
    let neo = chain.neo_token();
    let gas = chain.gas_token();
    let genesis = chain.get_block(chain.current_block_hash()).unwrap();
    let committee = genesis.transactions[3].outputs[0].script_hash;
    let destination = neo_core::UInt160::from_script(b"holder");

    let gas_before = {
        let committee_account = chain.dao().get_account(committee).unwrap();
        assert_eq!(committee_account.neo.balance, 100_000_000);
        committee_account.gas_balance
    };

    let mut builder = ScriptBuilder::new();
    builder
        .emit_int(10)
        .emit_bytes(&destination.to_array_be())
        .emit_bytes(&committee.to_array_be())
        .emit_int(3)
        .emit(OpCode::Pack)
        .emit_string("transfer")
        .emit_appcall(neo.hash(), false);
    let tx = Transaction::new_invocation(builder.into_bytes(), Fixed8::ZERO);
    let tx_hash = tx.hash();

    chain.add_block(&next_block(&chain, vec![tx])).unwrap();

    let result = chain.get_app_exec_result(tx_hash).unwrap();
    assert_eq!(result.vm_state, "HALT");
    let stack = result.stack_items().unwrap();
    assert!(stack[0].to_bool(), "transfer must report success");

    let sender = chain.dao().get_account(committee).unwrap();
    let receiver = chain.dao().get_account(destination).unwrap();
    assert_eq!(sender.neo.balance, 100_000_000 - 10);
    assert_eq!(receiver.neo.balance, 10);
    // Claimable gas for 100M NEO over one block at generation 8.
    assert_eq!(sender.gas_balance - gas_before, 100_000_000 * 8);

    // Conservation: the sum of balances equals the total supply.
    assert_eq!(
        sender.neo.balance + receiver.neo.balance,
        100_000_000
    );

    // The transfer landed in both accounts' NEP-5 logs.
    let log = chain
        .dao()
        .get_nep5_transfer_log(destination, 0)
        .unwrap();
    assert_eq!(log.len(), 1);
    let transfer = log.transfers().unwrap()[0];
    assert_eq!(transfer.amount, 10);
    assert_eq!(transfer.asset, neo.hash());
    assert_eq!(transfer.tx, tx_hash);

    let balances = chain.dao().get_nep5_balances(destination).unwrap();
    assert_eq!(balances.trackers[&neo.hash()].balance, 10);

    // GAS supply grew by exactly the distributed amount.
    assert!(gas.factor() == 100_000_000);
}

#[test]
fn enrollment_registers_a_validator() {
    let chain = test_chain();
    let key = neo_cryptography::PublicKey::from_hex(
        "031ee4e73a17d8f76dc02532e2620bcb12425b33c0c9f9694cc2caa8226b68cad4",
    )
    .unwrap();
    let tx = Transaction::new(
        TransactionData::Enrollment {
            public_key: key.clone(),
        },
        0,
    );
    chain.add_block(&next_block(&chain, vec![tx])).unwrap();

    let validator = chain.dao().get_validator(&key).unwrap();
    assert!(validator.registered);
    assert_eq!(validator.votes, Fixed8::ZERO);
}

#[test]
fn headers_extend_ahead_of_blocks() {
    let chain = test_chain();
    let block1 = next_block(&chain, vec![]);

    let mut header2 = Header {
        version: 0,
        prev_hash: block1.hash(),
        merkle_root: UInt256::from_data(b"pending"),
        timestamp: block1.header.timestamp + 15,
        index: 2,
        consensus_data: 2,
        next_consensus: block1.header.next_consensus,
        witness: Witness::new(Vec::new(), vec![0x51]),
    };

    chain.add_headers(&[block1.header.clone()]).unwrap();
    assert_eq!(chain.header_height(), 1);
    assert_eq!(chain.block_height(), 0);

    chain.add_headers(std::slice::from_ref(&header2)).unwrap();
    assert_eq!(chain.header_height(), 2);

    // A header that does not link is rejected.
    header2.index = 3;
    header2.prev_hash = UInt256::from_data(b"unrelated");
    assert!(chain.add_headers(&[header2]).is_err());

    // The full block for height 1 still applies.
    chain.add_block(&block1).unwrap();
    assert_eq!(chain.block_height(), 1);
}

#[test]
fn deterministic_state_across_independent_nodes() {
    let build = || {
        let store = Arc::new(MemoryStore::new());
        let mut config = ProtocolSettings::default();
        config.verify_blocks = false;
        let chain = Blockchain::new(store.clone(), config).unwrap();
        let tx = Transaction::new_invocation(vec![OpCode::Push1 as u8], Fixed8::ZERO);
        let block = next_block(&chain, vec![tx]);
        chain.add_block(&block).unwrap();
        store
    };

    let (a, b) = (build(), build());
    let mut dump_a = Vec::new();
    a.seek(&[], &mut |k, v| dump_a.push((k.to_vec(), v.to_vec())));
    let mut dump_b = Vec::new();
    b.seek(&[], &mut |k, v| dump_b.push((k.to_vec(), v.to_vec())));
    assert_eq!(dump_a, dump_b, "persisted state must be byte-identical");
    assert!(!dump_a.is_empty());
}
