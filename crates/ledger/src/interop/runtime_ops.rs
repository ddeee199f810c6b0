//! `Runtime.*` handlers.

use super::InteropContext;
use crate::state::NotificationEvent;
use neo_core::UInt160;
use neo_io::{BinaryWriter, MemoryReader};
use neo_vm::{deserialize_item, serialize_item, StackItem, Vm, VmError, VmResult};
use tracing::debug;

/// `Runtime.Platform`: the fixed platform identifier.
pub fn platform(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    vm.push(StackItem::byte_array(b"NEO".to_vec()))
}

/// `Runtime.GetTrigger`: the execution trigger as an integer.
pub fn get_trigger(ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    vm.push(StackItem::integer(ic.trigger as u8))
}

/// `Runtime.GetTime`: the timestamp of the persisting block, or of the
/// current chain tip plus the block interval when executing outside one.
pub fn get_time(ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let time = if let Some(block) = &ic.block {
        block.header.timestamp
    } else {
        let interval = ic.chain.config.seconds_per_block;
        match ic
            .chain
            .current_block_hash()
            .and_then(|hash| ic.dao.get_block(hash).ok())
        {
            Some((tip, _)) => tip.header.timestamp + interval,
            None => 0,
        }
    };
    vm.push(StackItem::integer(time))
}

/// `Runtime.CheckWitness`: whether the given script hash (or public key)
/// has witnessed the current transaction.
pub fn check_witness(ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let argument = vm.pop_bytes()?;
    let hash = match argument.len() {
        20 => UInt160::from_bytes_be(&argument)
            .map_err(|e| VmError::InvalidConversion(e.to_string()))?,
        33 => {
            let key = neo_cryptography::PublicKey::from_bytes(&argument)
                .map_err(|e| VmError::InvalidConversion(e.to_string()))?;
            UInt160::from_script(&neo_smart_contract::create_signature_redeem_script(&key))
        }
        other => {
            return Err(VmError::InvalidConversion(format!(
                "witness argument of {other} bytes"
            )))
        }
    };
    let witnessed = ic
        .verifying_hashes()
        .map_err(|e| VmError::InteropFault(e.to_string()))?
        .contains(&hash);
    vm.push(StackItem::Bool(witnessed))
}

/// `Runtime.Notify`: record a notification from the executing script.
pub fn notify(ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let item = vm.pop()?;
    let script_hash = vm
        .current_script_hash()
        .ok_or_else(|| VmError::InteropFault("no executing script".into()))?;
    let event = NotificationEvent::from_item(script_hash, &item)
        .map_err(|e| VmError::InteropFault(e.to_string()))?;
    ic.notifications.push(event);
    Ok(())
}

/// `Runtime.Log`: log a UTF-8 message from the executing script.
pub fn log(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let message = vm.pop_bytes()?;
    let message = String::from_utf8_lossy(&message).into_owned();
    debug!(target: "runtime", %message, "script log");
    Ok(())
}

/// `Runtime.Serialize`: serialize the top item to bytes.
pub fn serialize(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let item = vm.pop()?;
    let mut writer = BinaryWriter::new();
    serialize_item(&item, &mut writer);
    let bytes = writer
        .into_bytes()
        .map_err(|e| VmError::InteropFault(e.to_string()))?;
    vm.push(StackItem::ByteArray(bytes))
}

/// `Runtime.Deserialize`: rebuild an item from serialized bytes.
pub fn deserialize(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let bytes = vm.pop_bytes()?;
    let mut reader = MemoryReader::new(&bytes);
    let item = deserialize_item(&mut reader);
    if let Some(err) = reader.error() {
        return Err(VmError::InteropFault(err.to_string()));
    }
    vm.push(item)
}
