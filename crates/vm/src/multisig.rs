//! Multi-signature verification.

use crate::{VmError, VmResult};
use neo_cryptography::PublicKey;

/// Verifies `signatures` against `public_keys` over `message_hash`.
///
/// Signatures must appear in the same relative order as the keys that
/// produced them: the check walks both lists once, consuming a key per
/// matched signature, and succeeds iff every signature matches some key not
/// yet consumed. Supplying more signatures than keys is a caller error
/// rather than a plain `false`.
pub fn check_multisig(
    message_hash: &[u8],
    public_keys: &[PublicKey],
    signatures: &[Vec<u8>],
) -> VmResult<bool> {
    if signatures.is_empty() || public_keys.is_empty() {
        return Err(VmError::InvalidOperation(
            "multisig check requires at least one key and one signature".into(),
        ));
    }
    let (m, n) = (signatures.len(), public_keys.len());
    if m > n {
        return Err(VmError::TooManySignatures);
    }

    let mut sig = 0;
    let mut key = 0;
    while sig < m && key < n {
        if public_keys[key].verify(&signatures[sig], message_hash) {
            sig += 1;
        }
        key += 1;
        // Fewer keys left than signatures still unmatched: cannot succeed.
        if m - sig > n - key {
            return Ok(false);
        }
    }
    Ok(sig == m)
}
