//! `Storage.*` handlers and the storage context item.

use super::enumerator_ops::IteratorInterop;
use super::{pop_interop, InteropContext};
use crate::state::StorageItem;
use neo_core::UInt160;
use neo_vm::{StackItem, Vm, VmError, VmResult};

/// Largest accepted user key.
pub const MAX_STORAGE_KEY_LEN: usize = 1024;

/// A capability handle for one contract's storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageContext {
    pub script_hash: UInt160,
    pub read_only: bool,
}

fn check_storage_context(ic: &InteropContext, context: &StorageContext) -> VmResult<()> {
    let contract = ic
        .dao
        .get_contract(context.script_hash)
        .map_err(|_| VmError::InteropFault("no contract for storage context".into()))?;
    if !contract.has_storage() {
        return Err(VmError::InteropFault(
            "contract has no storage capability".into(),
        ));
    }
    Ok(())
}

/// `Storage.GetContext`: a writable handle for the executing script.
pub fn get_context(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let script_hash = vm
        .current_script_hash()
        .ok_or_else(|| VmError::InteropFault("no executing script".into()))?;
    vm.push(StackItem::interop(StorageContext {
        script_hash,
        read_only: false,
    }))
}

/// `Storage.GetReadOnlyContext`: a read-only handle for the executing
/// script.
pub fn get_read_only_context(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let script_hash = vm
        .current_script_hash()
        .ok_or_else(|| VmError::InteropFault("no executing script".into()))?;
    vm.push(StackItem::interop(StorageContext {
        script_hash,
        read_only: true,
    }))
}

/// `StorageContext.AsReadOnly`: downgrade a handle.
pub fn context_as_read_only(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let mut context: StorageContext = pop_interop(vm, "storage context")?;
    context.read_only = true;
    vm.push(StackItem::interop(context))
}

/// `Storage.Get`: read a value; absent keys read as empty bytes.
pub fn get(ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let context: StorageContext = pop_interop(vm, "storage context")?;
    check_storage_context(ic, &context)?;
    let key = vm.pop_bytes()?;
    let value = ic
        .dao
        .get_storage_item(context.script_hash, &key)
        .map(|item| item.value)
        .unwrap_or_default();
    vm.push(StackItem::ByteArray(value))
}

fn put_internal(
    ic: &mut InteropContext,
    context: StorageContext,
    key: Vec<u8>,
    value: Vec<u8>,
    constant: bool,
) -> VmResult<()> {
    if context.read_only {
        return Err(VmError::InteropFault(
            "cannot write through a read-only context".into(),
        ));
    }
    if key.len() > MAX_STORAGE_KEY_LEN {
        return Err(VmError::InteropFault("storage key too long".into()));
    }
    check_storage_context(ic, &context)?;
    if let Some(existing) = ic.dao.get_storage_item(context.script_hash, &key) {
        if existing.is_constant {
            return Err(VmError::InteropFault("storage item is constant".into()));
        }
    }
    ic.dao
        .put_storage_item(context.script_hash, &key, &StorageItem::new(value, constant))
        .map_err(|e| VmError::InteropFault(e.to_string()))
}

/// `Storage.Put`: write a value.
pub fn put(ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let context: StorageContext = pop_interop(vm, "storage context")?;
    let key = vm.pop_bytes()?;
    let value = vm.pop_bytes()?;
    put_internal(ic, context, key, value, false)
}

/// `Storage.PutEx`: write a value with flags; bit 0 marks it constant.
pub fn put_ex(ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let context: StorageContext = pop_interop(vm, "storage context")?;
    let key = vm.pop_bytes()?;
    let value = vm.pop_bytes()?;
    let flags = vm.pop_index()?;
    put_internal(ic, context, key, value, flags & 0x01 != 0)
}

/// `Storage.Delete`: remove a key; constant items refuse deletion.
pub fn delete(ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let context: StorageContext = pop_interop(vm, "storage context")?;
    if context.read_only {
        return Err(VmError::InteropFault(
            "cannot delete through a read-only context".into(),
        ));
    }
    check_storage_context(ic, &context)?;
    let key = vm.pop_bytes()?;
    if let Some(existing) = ic.dao.get_storage_item(context.script_hash, &key) {
        if existing.is_constant {
            return Err(VmError::InteropFault("storage item is constant".into()));
        }
    }
    ic.dao
        .delete_storage_item(context.script_hash, &key)
        .map_err(|e| VmError::InteropFault(e.to_string()))
}

/// `Storage.Find`: iterate key/value pairs under a key prefix.
pub fn find(ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let context: StorageContext = pop_interop(vm, "storage context")?;
    check_storage_context(ic, &context)?;
    let prefix = vm.pop_bytes()?;
    let pairs = ic
        .dao
        .find_storage_items(context.script_hash, &prefix)
        .into_iter()
        .map(|(key, item)| (StackItem::ByteArray(key), StackItem::ByteArray(item.value)))
        .collect();
    vm.push(StackItem::interop(IteratorInterop::new(pairs)))
}
