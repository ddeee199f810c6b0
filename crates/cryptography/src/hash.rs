//! Digest helpers used throughout the ledger.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// SHA256 of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// RIPEMD160 of `data`.
pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(data).into()
}

/// Double SHA256, used for block, transaction and checksum hashing.
pub fn hash256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// RIPEMD160 of SHA256, used for script hashes.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    ripemd160(&sha256(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_empty_vector() {
        assert_eq!(
            hex::encode(sha256(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn hash160_of_hello() {
        // ripemd160(sha256("hello"))
        assert_eq!(
            hex::encode(hash160(b"hello")),
            "b6a9c8c230722b7c748331a8b450f05566dc7d0f"
        );
    }

    #[test]
    fn hash256_is_double_sha() {
        assert_eq!(hash256(b"abc"), sha256(&sha256(b"abc")));
    }
}
