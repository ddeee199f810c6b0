//! `Neo.Crypto.*` handlers.

use super::InteropContext;
use neo_cryptography::{sha256, PublicKey};
use neo_vm::{check_multisig, StackItem, Vm, VmError, VmResult};

/// `Neo.Crypto.ECDsaVerify`: verify a signature over the SHA256 of a
/// message popped from the stack.
pub fn ecdsa_verify(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let message = vm.pop_bytes()?;
    let digest = sha256(&message);
    let key_bytes = vm.pop_bytes()?;
    let signature = vm.pop_bytes()?;
    let key = PublicKey::from_bytes(&key_bytes)
        .map_err(|e| VmError::InvalidConversion(e.to_string()))?;
    vm.push(StackItem::Bool(key.verify(&signature, &digest)))
}

/// `Neo.Crypto.ECDsaCheckMultiSig`: verify a set of signatures against a
/// set of keys, in order, over the SHA256 of a popped message.
pub fn ecdsa_check_multisig(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let message = vm.pop_bytes()?;
    let digest = sha256(&message);
    let key_bytes = vm.pop_sig_elements()?;
    let signatures = vm.pop_sig_elements()?;

    let mut keys = Vec::with_capacity(key_bytes.len());
    for bytes in &key_bytes {
        keys.push(
            PublicKey::from_bytes(bytes).map_err(|e| VmError::InvalidConversion(e.to_string()))?,
        );
    }
    vm.set_checked_hash(digest);
    let result = check_multisig(&digest, &keys, &signatures)?;
    vm.push(StackItem::Bool(result))
}
