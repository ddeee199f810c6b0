//! Hashing, secp256r1 public keys and Base58Check encoding.
//!
//! The primitives here are consumed as black boxes by the rest of the
//! ledger: digests for hashing scripts and transactions, ECDSA verification
//! for witnesses, Base58Check for the textual address form.

pub mod base58;
pub mod ecc;
pub mod hash;

pub use base58::{base58_check_decode, base58_check_encode};
pub use ecc::PublicKey;
pub use hash::{hash160, hash256, ripemd160, sha256};

/// Error types for cryptographic operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid public key: {0}")]
    InvalidKey(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("invalid base58 string: {0}")]
    InvalidBase58(String),

    #[error("checksum mismatch")]
    ChecksumMismatch,
}

/// Result type for cryptographic operations.
pub type Result<T> = std::result::Result<T, Error>;
