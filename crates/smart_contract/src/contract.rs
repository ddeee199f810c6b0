//! Standard verification scripts.

use crate::{Error, Result};
use neo_cryptography::PublicKey;
use neo_vm::{OpCode, ScriptBuilder};

/// Largest committee a multi-signature script may cover.
pub const MAX_MULTISIG_KEYS: usize = 1024;

/// Builds the canonical single-signature verification script:
/// `PUSHBYTES33 <key> CHECKSIG`.
pub fn create_signature_redeem_script(key: &PublicKey) -> Vec<u8> {
    let mut builder = ScriptBuilder::new();
    builder.emit_bytes(&key.to_bytes());
    builder.emit(OpCode::CheckSig);
    builder.into_bytes()
}

/// Builds the canonical `m`-of-`n` multi-signature verification script:
/// `m <keys sorted ascending> n CHECKMULTISIG`.
pub fn create_multisig_redeem_script(m: usize, keys: &[PublicKey]) -> Result<Vec<u8>> {
    let n = keys.len();
    if m == 0 || m > n || n > MAX_MULTISIG_KEYS {
        return Err(Error::InvalidMultisig(format!(
            "{m} of {n} is not a valid signing threshold"
        )));
    }

    let mut sorted = keys.to_vec();
    sorted.sort();

    let mut builder = ScriptBuilder::new();
    builder.emit_int(m as i64);
    for key in &sorted {
        builder.emit_bytes(&key.to_bytes());
    }
    builder.emit_int(n as i64);
    builder.emit(OpCode::CheckMultisig);
    Ok(builder.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> Vec<PublicKey> {
        [
            "02b3622bf4017bdfe317c58aed5f4c753f206b7db896046fa7d774bbc4bf7f8dc2",
            "02103a7f7dd016558597f7960d27c516a4394fd968b9e65155eb4b013e4040406e",
            "03d90c07df63e690ce77912e10ab51acc944b66860237b608c4f8f8309e71ee699",
        ]
        .iter()
        .map(|h| PublicKey::from_hex(h).unwrap())
        .collect()
    }

    #[test]
    fn signature_script_shape() {
        let key = &keys()[0];
        let script = create_signature_redeem_script(key);
        assert_eq!(script.len(), 35);
        assert_eq!(script[0], 0x21);
        assert_eq!(&script[1..34], key.to_bytes().as_slice());
        assert_eq!(script[34], OpCode::CheckSig as u8);
    }

    #[test]
    fn multisig_script_is_sorted_and_bounded() {
        let keys = keys();
        let script = create_multisig_redeem_script(2, &keys).unwrap();
        assert_eq!(script[0], OpCode::Push2 as u8);
        assert_eq!(*script.last().unwrap(), OpCode::CheckMultisig as u8);
        assert_eq!(script[script.len() - 2], OpCode::Push3 as u8);

        // Key order in the input must not matter.
        let mut reversed = keys.clone();
        reversed.reverse();
        assert_eq!(script, create_multisig_redeem_script(2, &reversed).unwrap());
    }

    #[test]
    fn invalid_thresholds_are_rejected() {
        let keys = keys();
        assert!(create_multisig_redeem_script(0, &keys).is_err());
        assert!(create_multisig_redeem_script(4, &keys).is_err());
    }
}
