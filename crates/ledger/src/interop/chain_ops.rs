//! Blockchain query handlers and the block/transaction field accessors.
//!
//! Hashes cross the evaluation stack in big-endian form; little-endian is
//! reserved for script operands and storage keys.

use super::{pop_header, pop_interop, pop_uint160, pop_uint256, InteropContext};
use crate::block::Block;
use crate::state::{Asset, UnspentCoin};
use crate::{LedgerError, Result};
use neo_core::{
    Attribute, Fixed8, Input, Output, Transaction, TransactionData, TransactionType, UInt256,
    Witness,
};
use neo_cryptography::PublicKey;
use neo_vm::{StackItem, Vm, VmError, VmResult};
use num_traits::ToPrimitive;

fn fault<E: std::fmt::Display>(err: E) -> VmError {
    VmError::InteropFault(err.to_string())
}

impl InteropContext {
    /// Loads a full block: the trimmed record plus its transactions.
    pub fn get_block_by_hash(&self, hash: UInt256) -> Result<Block> {
        let (trimmed, _) = self.dao.get_block(hash)?;
        let mut transactions = Vec::with_capacity(trimmed.tx_hashes.len());
        for tx_hash in &trimmed.tx_hashes {
            let (tx, _) = self.dao.get_transaction(*tx_hash)?;
            transactions.push(tx);
        }
        Ok(Block::new(trimmed.header, transactions))
    }

    fn resolve_block_hash(&self, argument: &[u8]) -> Result<UInt256> {
        if argument.len() == 32 {
            return UInt256::from_bytes_be(argument).map_err(LedgerError::from);
        }
        if argument.len() <= 4 {
            let mut padded = [0u8; 4];
            padded[..argument.len()].copy_from_slice(argument);
            let index = u32::from_le_bytes(padded);
            return self
                .chain
                .header_hash(index)
                .ok_or_else(|| LedgerError::Verification(format!("no header at {index}")));
        }
        Err(LedgerError::Verification(
            "block argument must be a hash or an index".into(),
        ))
    }
}

// -- Blockchain.*

/// `Blockchain.GetHeight`: the current full-block height.
pub fn bc_get_height(ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    vm.push(StackItem::integer(ic.chain.block_height()))
}

/// `Blockchain.GetHeader`: a header by hash or index.
pub fn bc_get_header(ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let argument = vm.pop_bytes()?;
    let hash = ic.resolve_block_hash(&argument).map_err(fault)?;
    let (trimmed, _) = ic.dao.get_block(hash).map_err(fault)?;
    vm.push(StackItem::interop(trimmed.header))
}

/// `Blockchain.GetBlock`: a full block by hash or index.
pub fn bc_get_block(ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let argument = vm.pop_bytes()?;
    let hash = ic.resolve_block_hash(&argument).map_err(fault)?;
    let block = ic.get_block_by_hash(hash).map_err(fault)?;
    vm.push(StackItem::interop(block))
}

/// `Blockchain.GetTransaction`: a transaction by hash.
pub fn bc_get_transaction(ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let hash = pop_uint256(vm)?;
    let (tx, _) = ic.dao.get_transaction(hash).map_err(fault)?;
    vm.push(StackItem::interop(tx))
}

/// `Blockchain.GetTransactionHeight`: the height a transaction was
/// confirmed at.
pub fn bc_get_transaction_height(ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let hash = pop_uint256(vm)?;
    let (_, height) = ic.dao.get_transaction(hash).map_err(fault)?;
    vm.push(StackItem::integer(height))
}

/// `Blockchain.GetContract`: a deployed contract by script hash.
pub fn bc_get_contract(ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    super::contract_ops::push_contract_by_hash(ic, vm)
}

/// `Blockchain.GetAccount`: an account by script hash; absent accounts
/// read as fresh ones.
pub fn bc_get_account(ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let hash = pop_uint160(vm)?;
    let account = ic.dao.get_account_or_new(hash).map_err(fault)?;
    vm.push(StackItem::interop(account))
}

/// `Blockchain.GetAsset`: an asset registration by id.
pub fn bc_get_asset(ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let id = pop_uint256(vm)?;
    let asset = ic.dao.get_asset(id).map_err(fault)?;
    vm.push(StackItem::interop(asset))
}

/// `Blockchain.GetValidators`: the registered validator keys, in key
/// order.
pub fn bc_get_validators(ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let keys: Vec<StackItem> = ic
        .dao
        .get_validators()
        .into_iter()
        .filter(|v| v.registered)
        .map(|v| StackItem::byte_array(v.public_key.to_bytes()))
        .collect();
    vm.push(StackItem::array(keys))
}

// -- ExecutionEngine.*

/// `ExecutionEngine.GetExecutingScriptHash`.
pub fn engine_get_executing_script_hash(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let hash = vm
        .current_script_hash()
        .ok_or_else(|| VmError::InteropFault("no executing script".into()))?;
    vm.push(StackItem::byte_array(hash.to_array_be().to_vec()))
}

/// `ExecutionEngine.GetCallingScriptHash`.
pub fn engine_get_calling_script_hash(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let hash = vm
        .script_hash_at(1)
        .ok_or_else(|| VmError::InteropFault("no calling script".into()))?;
    vm.push(StackItem::byte_array(hash.to_array_be().to_vec()))
}

/// `ExecutionEngine.GetEntryScriptHash`.
pub fn engine_get_entry_script_hash(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let hash = vm
        .entry_script_hash()
        .ok_or_else(|| VmError::InteropFault("no entry script".into()))?;
    vm.push(StackItem::byte_array(hash.to_array_be().to_vec()))
}

/// `ExecutionEngine.GetScriptContainer`: the transaction being executed.
pub fn engine_get_script_container(ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let tx = ic
        .tx
        .clone()
        .ok_or_else(|| VmError::InteropFault("no script container".into()))?;
    vm.push(StackItem::interop(tx))
}

// -- Header.* / Block.*

/// `Header.GetHash`.
pub fn header_get_hash(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let header = pop_header(vm)?;
    vm.push(StackItem::byte_array(header.hash().to_array_be().to_vec()))
}

/// `Header.GetVersion`.
pub fn header_get_version(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let header = pop_header(vm)?;
    vm.push(StackItem::integer(header.version))
}

/// `Header.GetPrevHash`.
pub fn header_get_prev_hash(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let header = pop_header(vm)?;
    vm.push(StackItem::byte_array(
        header.prev_hash.to_array_be().to_vec(),
    ))
}

/// `Header.GetMerkleRoot`.
pub fn header_get_merkle_root(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let header = pop_header(vm)?;
    vm.push(StackItem::byte_array(
        header.merkle_root.to_array_be().to_vec(),
    ))
}

/// `Header.GetTimestamp`.
pub fn header_get_timestamp(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let header = pop_header(vm)?;
    vm.push(StackItem::integer(header.timestamp))
}

/// `Header.GetIndex`.
pub fn header_get_index(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let header = pop_header(vm)?;
    vm.push(StackItem::integer(header.index))
}

/// `Header.GetConsensusData`.
pub fn header_get_consensus_data(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let header = pop_header(vm)?;
    vm.push(StackItem::integer(header.consensus_data))
}

/// `Header.GetNextConsensus`.
pub fn header_get_next_consensus(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let header = pop_header(vm)?;
    vm.push(StackItem::byte_array(
        header.next_consensus.to_array_be().to_vec(),
    ))
}

/// `Block.GetTransactionCount`.
pub fn block_get_transaction_count(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let block: Block = pop_interop(vm, "block")?;
    vm.push(StackItem::integer(block.transactions.len() as u64))
}

/// `Block.GetTransactions`.
pub fn block_get_transactions(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let block: Block = pop_interop(vm, "block")?;
    let transactions = block
        .transactions
        .into_iter()
        .map(StackItem::interop)
        .collect();
    vm.push(StackItem::array(transactions))
}

/// `Block.GetTransaction`: a transaction by in-block index.
pub fn block_get_transaction(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let block: Block = pop_interop(vm, "block")?;
    let index = vm.pop_index()?;
    let tx = usize::try_from(index)
        .ok()
        .and_then(|i| block.transactions.get(i))
        .ok_or_else(|| VmError::InteropFault("transaction index out of range".into()))?
        .clone();
    vm.push(StackItem::interop(tx))
}

// -- Transaction.*

/// `Transaction.GetHash`.
pub fn tx_get_hash(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let tx: Transaction = pop_interop(vm, "transaction")?;
    vm.push(StackItem::byte_array(tx.hash().to_array_be().to_vec()))
}

/// `Transaction.GetType`.
pub fn tx_get_type(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let tx: Transaction = pop_interop(vm, "transaction")?;
    vm.push(StackItem::integer(tx.tx_type() as u8))
}

/// `Transaction.GetAttributes`.
pub fn tx_get_attributes(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let tx: Transaction = pop_interop(vm, "transaction")?;
    let attributes = tx.attributes.into_iter().map(StackItem::interop).collect();
    vm.push(StackItem::array(attributes))
}

/// `Transaction.GetInputs`.
pub fn tx_get_inputs(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let tx: Transaction = pop_interop(vm, "transaction")?;
    let inputs = tx.inputs.into_iter().map(StackItem::interop).collect();
    vm.push(StackItem::array(inputs))
}

/// `Transaction.GetOutputs`.
pub fn tx_get_outputs(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let tx: Transaction = pop_interop(vm, "transaction")?;
    let outputs = tx.outputs.into_iter().map(StackItem::interop).collect();
    vm.push(StackItem::array(outputs))
}

/// `Transaction.GetReferences`: the outputs this transaction spends.
pub fn tx_get_references(ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let tx: Transaction = pop_interop(vm, "transaction")?;
    let mut references = Vec::with_capacity(tx.inputs.len());
    for input in &tx.inputs {
        let unspent = ic.dao.get_unspent_coin(input.prev_hash).map_err(fault)?;
        let state = unspent
            .states
            .get(input.prev_index as usize)
            .ok_or_else(|| VmError::InteropFault("reference out of range".into()))?;
        references.push(StackItem::interop(state.output));
    }
    vm.push(StackItem::array(references))
}

/// `Transaction.GetUnspentCoins`: this transaction's still-spendable
/// outputs.
pub fn tx_get_unspent_coins(ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let tx: Transaction = pop_interop(vm, "transaction")?;
    let unspent: UnspentCoin = ic.dao.get_unspent_coin(tx.hash()).map_err(fault)?;
    let outputs = unspent
        .states
        .iter()
        .filter(|s| s.state.is_empty())
        .map(|s| StackItem::interop(s.output))
        .collect();
    vm.push(StackItem::array(outputs))
}

/// `Transaction.GetWitnesses`.
pub fn tx_get_witnesses(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let tx: Transaction = pop_interop(vm, "transaction")?;
    let witnesses = tx.witnesses.into_iter().map(StackItem::interop).collect();
    vm.push(StackItem::array(witnesses))
}

/// `InvocationTransaction.GetScript`.
pub fn invocation_tx_get_script(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let tx: Transaction = pop_interop(vm, "transaction")?;
    let TransactionData::Invocation { script, .. } = tx.data else {
        return Err(VmError::InteropFault(
            "not an invocation transaction".into(),
        ));
    };
    vm.push(StackItem::ByteArray(script))
}

// -- Input.* / Output.* / Attribute.* / Witness.*

/// `Input.GetHash`.
pub fn input_get_hash(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let input: Input = pop_interop(vm, "input")?;
    vm.push(StackItem::byte_array(
        input.prev_hash.to_array_be().to_vec(),
    ))
}

/// `Input.GetIndex`.
pub fn input_get_index(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let input: Input = pop_interop(vm, "input")?;
    vm.push(StackItem::integer(input.prev_index))
}

/// `Output.GetAssetId`.
pub fn output_get_asset_id(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let output: Output = pop_interop(vm, "output")?;
    vm.push(StackItem::byte_array(
        output.asset_id.to_array_be().to_vec(),
    ))
}

/// `Output.GetValue`.
pub fn output_get_value(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let output: Output = pop_interop(vm, "output")?;
    vm.push(StackItem::integer(output.amount.raw()))
}

/// `Output.GetScriptHash`.
pub fn output_get_script_hash(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let output: Output = pop_interop(vm, "output")?;
    vm.push(StackItem::byte_array(
        output.script_hash.to_array_be().to_vec(),
    ))
}

/// `Attribute.GetUsage`.
pub fn attribute_get_usage(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let attribute: Attribute = pop_interop(vm, "attribute")?;
    vm.push(StackItem::integer(attribute.usage as u8))
}

/// `Attribute.GetData`.
pub fn attribute_get_data(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let attribute: Attribute = pop_interop(vm, "attribute")?;
    vm.push(StackItem::ByteArray(attribute.data))
}

/// `Witness.GetVerificationScript`.
pub fn witness_get_verification_script(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let witness: Witness = pop_interop(vm, "witness")?;
    vm.push(StackItem::ByteArray(witness.verification_script))
}

// -- Account.*

/// `Account.GetScriptHash`.
pub fn account_get_script_hash(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let account: crate::state::Account = pop_interop(vm, "account")?;
    vm.push(StackItem::byte_array(
        account.script_hash.to_array_be().to_vec(),
    ))
}

/// `Account.GetVotes`.
pub fn account_get_votes(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let account: crate::state::Account = pop_interop(vm, "account")?;
    let votes = account
        .votes
        .iter()
        .map(|key| StackItem::byte_array(key.to_bytes()))
        .collect();
    vm.push(StackItem::array(votes))
}

/// `Account.GetBalance`: the account's balance in a UTXO asset, as a raw
/// fixed-point integer.
pub fn account_get_balance(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let account: crate::state::Account = pop_interop(vm, "account")?;
    let asset_id = pop_uint256(vm)?;
    vm.push(StackItem::integer(account.balance_of(&asset_id).raw()))
}

/// `Account.IsStandard`: whether the account's script is a standard
/// signature or multi-signature contract (or not deployed at all).
pub fn account_is_standard(ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let hash = pop_uint160(vm)?;
    let standard = match ic.dao.get_contract(hash) {
        Ok(contract) => is_signature_script(&contract.script) || is_multisig_script(&contract.script),
        Err(_) => true,
    };
    vm.push(StackItem::Bool(standard))
}

fn is_signature_script(script: &[u8]) -> bool {
    script.len() == 35 && script[0] == 0x21 && script[34] == 0xac
}

fn is_multisig_script(script: &[u8]) -> bool {
    // m <keys> n CHECKMULTISIG with 33-byte key pushes.
    if script.len() < 37 || *script.last().unwrap_or(&0) != 0xae {
        return false;
    }
    let body = &script[1..script.len() - 2];
    body.chunks(34).all(|c| c.len() == 34 && c[0] == 0x21)
}

// -- Asset.*

/// `Asset.Create`: register a UTXO asset keyed by the current transaction.
pub fn asset_create(ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let tx_hash = ic
        .tx
        .as_ref()
        .map(Transaction::hash)
        .ok_or_else(|| VmError::InteropFault("no containing transaction".into()))?;
    let asset_type = neo_core::AssetType::from_byte(vm.pop_index()? as u8)
        .ok_or_else(|| VmError::InvalidConversion("bad asset type".into()))?;
    let name = String::from_utf8_lossy(&vm.pop_bytes()?).into_owned();
    let amount = Fixed8::from_raw(vm.pop_index()?);
    let precision = vm.pop_index()? as u8;
    let owner = PublicKey::from_bytes(&vm.pop_bytes()?)
        .map_err(|e| VmError::InvalidConversion(e.to_string()))?;
    let admin = pop_uint160(vm)?;
    let issuer = pop_uint160(vm)?;

    let asset = Asset {
        id: tx_hash,
        asset_type,
        name,
        amount,
        available: Fixed8::ZERO,
        precision,
        owner,
        admin,
        issuer,
        expiration: ic.chain.block_height() + 1 + 2_000_000,
        is_frozen: false,
    };
    ic.dao.put_asset(&asset).map_err(fault)?;
    vm.push(StackItem::interop(asset))
}

/// `Asset.Renew`: extend an asset's expiration by whole years.
pub fn asset_renew(ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let asset: Asset = pop_interop(vm, "asset")?;
    let years = vm
        .pop_bigint()?
        .to_u32()
        .ok_or_else(|| VmError::InvalidConversion("bad renewal term".into()))?;
    let mut asset = ic.dao.get_asset(asset.id).map_err(fault)?;
    let height = ic.chain.block_height() + 1;
    if asset.expiration < height {
        asset.expiration = height;
    }
    asset.expiration = asset
        .expiration
        .saturating_add(years.saturating_mul(2_000_000));
    ic.dao.put_asset(&asset).map_err(fault)?;
    vm.push(StackItem::integer(asset.expiration))
}

/// `Asset.GetAssetId`.
pub fn asset_get_asset_id(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let asset: Asset = pop_interop(vm, "asset")?;
    vm.push(StackItem::byte_array(asset.id.to_array_be().to_vec()))
}

/// `Asset.GetAssetType`.
pub fn asset_get_asset_type(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let asset: Asset = pop_interop(vm, "asset")?;
    vm.push(StackItem::integer(asset.asset_type as u8))
}

/// `Asset.GetAmount`.
pub fn asset_get_amount(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let asset: Asset = pop_interop(vm, "asset")?;
    vm.push(StackItem::integer(asset.amount.raw()))
}

/// `Asset.GetAvailable`.
pub fn asset_get_available(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let asset: Asset = pop_interop(vm, "asset")?;
    vm.push(StackItem::integer(asset.available.raw()))
}

/// `Asset.GetPrecision`.
pub fn asset_get_precision(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let asset: Asset = pop_interop(vm, "asset")?;
    vm.push(StackItem::integer(asset.precision))
}

/// `Asset.GetOwner`.
pub fn asset_get_owner(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let asset: Asset = pop_interop(vm, "asset")?;
    vm.push(StackItem::byte_array(asset.owner.to_bytes()))
}

/// `Asset.GetAdmin`.
pub fn asset_get_admin(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let asset: Asset = pop_interop(vm, "asset")?;
    vm.push(StackItem::byte_array(asset.admin.to_array_be().to_vec()))
}

/// `Asset.GetIssuer`.
pub fn asset_get_issuer(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let asset: Asset = pop_interop(vm, "asset")?;
    vm.push(StackItem::byte_array(asset.issuer.to_array_be().to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_script_shapes() {
        let mut sig = vec![0x21];
        sig.extend_from_slice(&[0u8; 33]);
        sig.push(0xac);
        assert!(is_signature_script(&sig));
        assert!(!is_multisig_script(&sig));

        let mut multisig = vec![0x51];
        for _ in 0..2 {
            multisig.push(0x21);
            multisig.extend_from_slice(&[0u8; 33]);
        }
        multisig.push(0x52);
        multisig.push(0xae);
        assert!(is_multisig_script(&multisig));
        assert!(!is_signature_script(&multisig));
    }

    #[test]
    fn tx_type_values_match_the_wire_tags() {
        assert_eq!(TransactionType::Invocation as u8, 0xd1);
        assert_eq!(TransactionType::Claim as u8, 0x02);
    }
}
