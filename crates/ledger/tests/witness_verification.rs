//! Signature and multi-signature verification with real keys.

use neo_cryptography::PublicKey;
use neo_vm::{check_multisig, OpCode, ScriptBuilder, StackItem, Vm, VmError, VmState};
use p256::ecdsa::signature::hazmat::PrehashSigner;
use p256::ecdsa::{Signature, SigningKey};

fn keypair(seed: u8) -> (SigningKey, PublicKey) {
    let mut secret = [0u8; 32];
    secret[31] = seed;
    let signing = SigningKey::from_bytes(&secret.into()).unwrap();
    let encoded = signing.verifying_key().to_encoded_point(true);
    let public = PublicKey::from_bytes(encoded.as_bytes()).unwrap();
    (signing, public)
}

fn sign(key: &SigningKey, digest: &[u8; 32]) -> Vec<u8> {
    let signature: Signature = key.sign_prehash(digest).unwrap();
    signature.to_bytes().to_vec()
}

#[test]
fn signatures_in_key_order_are_accepted() {
    let digest = neo_cryptography::sha256(b"signed message");
    let pairs: Vec<_> = (1..=3).map(keypair).collect();
    let keys: Vec<PublicKey> = pairs.iter().map(|(_, p)| p.clone()).collect();

    let signatures = vec![sign(&pairs[0].0, &digest), sign(&pairs[2].0, &digest)];
    assert_eq!(check_multisig(&digest, &keys, &signatures), Ok(true));
}

#[test]
fn reversed_signature_order_is_rejected() {
    let digest = neo_cryptography::sha256(b"signed message");
    let pairs: Vec<_> = (1..=3).map(keypair).collect();
    let keys: Vec<PublicKey> = pairs.iter().map(|(_, p)| p.clone()).collect();

    let signatures = vec![sign(&pairs[2].0, &digest), sign(&pairs[0].0, &digest)];
    assert_eq!(check_multisig(&digest, &keys, &signatures), Ok(false));
}

#[test]
fn more_signatures_than_keys_is_an_error() {
    let digest = neo_cryptography::sha256(b"signed message");
    let pairs: Vec<_> = (1..=3).map(keypair).collect();
    let keys: Vec<PublicKey> = pairs.iter().map(|(_, p)| p.clone()).collect();

    let signatures: Vec<Vec<u8>> = (0..4).map(|i| sign(&pairs[i % 3].0, &digest)).collect();
    assert_eq!(
        check_multisig(&digest, &keys, &signatures),
        Err(VmError::TooManySignatures)
    );
}

#[test]
fn checksig_opcode_verifies_against_the_checked_hash() {
    let digest = neo_cryptography::sha256(b"transaction data");
    let (signing, public) = keypair(7);
    let signature = sign(&signing, &digest);

    let mut builder = ScriptBuilder::new();
    builder.emit_bytes(&signature);
    builder.emit_bytes(&public.to_bytes());
    builder.emit(OpCode::CheckSig);

    let mut vm = Vm::new();
    vm.set_checked_hash(digest);
    vm.load_script(builder.into_bytes(), true);
    vm.execute();
    assert_eq!(vm.state(), VmState::Halt);
    assert!(vm.estack()[0].to_bool());

    // A wrong message hash fails the check but does not fault.
    let mut builder = ScriptBuilder::new();
    builder.emit_bytes(&signature);
    builder.emit_bytes(&public.to_bytes());
    builder.emit(OpCode::CheckSig);
    let mut vm = Vm::new();
    vm.set_checked_hash(neo_cryptography::sha256(b"different data"));
    vm.load_script(builder.into_bytes(), true);
    vm.execute();
    assert_eq!(vm.state(), VmState::Halt);
    assert!(!vm.estack()[0].to_bool());
}

#[test]
fn checkmultisig_opcode_runs_a_standard_redeem_script() {
    let digest = neo_cryptography::sha256(b"block data");
    let pairs: Vec<_> = (10..=12).map(keypair).collect();
    let mut keys: Vec<PublicKey> = pairs.iter().map(|(_, p)| p.clone()).collect();
    keys.sort();

    let redeem = neo_smart_contract::create_multisig_redeem_script(2, &keys).unwrap();

    // Signatures from the first two keys in sorted order.
    let signer_for = |key: &PublicKey| {
        pairs
            .iter()
            .find(|(_, p)| p == key)
            .map(|(s, _)| s)
            .unwrap()
    };
    let mut invocation = ScriptBuilder::new();
    invocation.emit_bytes(&sign(signer_for(&keys[0]), &digest));
    invocation.emit_bytes(&sign(signer_for(&keys[1]), &digest));

    let mut vm = Vm::new();
    vm.set_checked_hash(digest);
    vm.load_script(redeem, false);
    vm.load_script(invocation.into_bytes(), false);
    vm.execute();

    assert_eq!(vm.state(), VmState::Halt);
    assert_eq!(vm.estack().len(), 1);
    assert!(vm.estack()[0].to_bool());
}

#[test]
fn checkmultisig_with_too_few_valid_signatures_fails() {
    let digest = neo_cryptography::sha256(b"block data");
    let pairs: Vec<_> = (10..=12).map(keypair).collect();
    let mut keys: Vec<PublicKey> = pairs.iter().map(|(_, p)| p.clone()).collect();
    keys.sort();

    let redeem = neo_smart_contract::create_multisig_redeem_script(2, &keys).unwrap();

    let mut invocation = ScriptBuilder::new();
    invocation.emit_bytes(&sign(
        pairs.iter().map(|(s, _)| s).next().unwrap(),
        &digest,
    ));
    invocation.emit_bytes(&vec![0u8; 64]);

    let mut vm = Vm::new();
    vm.set_checked_hash(digest);
    vm.load_script(redeem, false);
    vm.load_script(invocation.into_bytes(), false);
    vm.execute();

    assert!(
        vm.state() == VmState::Fault
            || (vm.state() == VmState::Halt && !vm.estack()[0].to_bool())
    );
}

#[test]
fn checksig_uses_stack_items() {
    // CheckSig pushes a plain boolean item.
    let digest = neo_cryptography::sha256(b"x");
    let mut vm = Vm::new();
    vm.set_checked_hash(digest);
    let mut builder = ScriptBuilder::new();
    builder.emit_bytes(&[0u8; 64]);
    builder.emit_bytes(&[0x02; 33]);
    builder.emit(OpCode::CheckSig);
    vm.load_script(builder.into_bytes(), true);
    vm.execute();
    assert_eq!(vm.state(), VmState::Halt);
    assert!(matches!(vm.estack()[0], StackItem::Bool(false)));
}
