//! `Contract.*` handlers: deployment lifecycle.

use super::storage_ops::StorageContext;
use super::{pop_interop, pop_uint160, InteropContext};
use crate::state::ContractState;
use neo_smart_contract::ContractPropertyState;
use neo_vm::{StackItem, Vm, VmError, VmResult};

fn pop_contract_fields(vm: &mut Vm) -> VmResult<ContractState> {
    let script = vm.pop_bytes()?;
    if script.len() > 1 << 20 {
        return Err(VmError::ItemTooLarge);
    }
    let param_list = vm.pop_bytes()?;
    let return_type = vm.pop_index()? as u8;
    let properties = ContractPropertyState::from_bits_truncate(vm.pop_index()? as u8);
    let name = String::from_utf8_lossy(&vm.pop_bytes()?).into_owned();
    let code_version = String::from_utf8_lossy(&vm.pop_bytes()?).into_owned();
    let author = String::from_utf8_lossy(&vm.pop_bytes()?).into_owned();
    let email = String::from_utf8_lossy(&vm.pop_bytes()?).into_owned();
    let description = String::from_utf8_lossy(&vm.pop_bytes()?).into_owned();
    Ok(ContractState {
        script,
        param_list,
        return_type,
        properties,
        name,
        code_version,
        author,
        email,
        description,
    })
}

/// `Contract.Create`: deploy a contract; idempotent for an existing hash.
pub fn contract_create(ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let contract = pop_contract_fields(vm)?;
    let hash = contract.script_hash();
    match ic.dao.get_contract(hash) {
        Ok(existing) => vm.push(StackItem::interop(existing)),
        Err(_) => {
            ic.dao
                .put_contract(&contract)
                .map_err(|e| VmError::InteropFault(e.to_string()))?;
            vm.push(StackItem::interop(contract))
        }
    }
}

/// `Contract.Migrate`: deploy a replacement and move the storage of the
/// executing contract to it.
pub fn contract_migrate(ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let contract = pop_contract_fields(vm)?;
    let new_hash = contract.script_hash();
    let old_hash = vm
        .current_script_hash()
        .ok_or_else(|| VmError::InteropFault("no executing script".into()))?;

    if ic.dao.get_contract(new_hash).is_err() {
        ic.dao
            .put_contract(&contract)
            .map_err(|e| VmError::InteropFault(e.to_string()))?;
        if contract.has_storage() {
            for (key, item) in ic.dao.find_storage_items(old_hash, &[]) {
                ic.dao
                    .put_storage_item(new_hash, &key, &item)
                    .map_err(|e| VmError::InteropFault(e.to_string()))?;
            }
        }
    }
    destroy_internal(ic, old_hash)?;
    vm.push(StackItem::interop(contract))
}

fn destroy_internal(ic: &mut InteropContext, hash: neo_core::UInt160) -> VmResult<()> {
    let Ok(contract) = ic.dao.get_contract(hash) else {
        return Ok(());
    };
    ic.dao
        .delete_contract(hash)
        .map_err(|e| VmError::InteropFault(e.to_string()))?;
    if contract.has_storage() {
        for (key, _) in ic.dao.find_storage_items(hash, &[]) {
            ic.dao
                .delete_storage_item(hash, &key)
                .map_err(|e| VmError::InteropFault(e.to_string()))?;
        }
    }
    Ok(())
}

/// `Contract.Destroy`: remove the executing contract and its storage.
pub fn contract_destroy(ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let hash = vm
        .current_script_hash()
        .ok_or_else(|| VmError::InteropFault("no executing script".into()))?;
    destroy_internal(ic, hash)
}

/// `Contract.GetScript`: the script of a contract interop item.
pub fn contract_get_script(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let contract: ContractState = pop_interop(vm, "contract")?;
    vm.push(StackItem::ByteArray(contract.script))
}

/// `Contract.IsPayable`: the payable flag of a contract interop item.
pub fn contract_is_payable(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let contract: ContractState = pop_interop(vm, "contract")?;
    vm.push(StackItem::Bool(contract.is_payable()))
}

/// `Contract.GetStorageContext`: a writable storage handle for a contract
/// interop item. Only the contract itself may request it.
pub fn contract_get_storage_context(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let contract: ContractState = pop_interop(vm, "contract")?;
    let hash = contract.script_hash();
    if vm.current_script_hash() != Some(hash) {
        return Err(VmError::InteropFault(
            "storage context requested by a foreign script".into(),
        ));
    }
    vm.push(StackItem::interop(StorageContext {
        script_hash: hash,
        read_only: false,
    }))
}

/// Resolves a popped script hash to a contract interop item; used by the
/// `Blockchain.GetContract` family.
pub fn push_contract_by_hash(ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let hash = pop_uint160(vm)?;
    let contract = ic
        .dao
        .get_contract(hash)
        .map_err(|e| VmError::InteropFault(e.to_string()))?;
    vm.push(StackItem::interop(contract))
}
