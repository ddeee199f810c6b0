//! The ledger execution engine.
//!
//! Ties the lower layers together: typed state records persisted through the
//! DAO, the interop layer bridging scripts to chain state, the native
//! contract framework and the block applier that commits one block
//! atomically end to end.

pub mod block;
pub mod dao;
pub mod interop;
pub mod mempool;
pub mod native;
pub mod state;

mod blockchain;

pub use block::{Block, Header, TrimmedBlock};
pub use blockchain::{Blockchain, ChainState};
pub use dao::Dao;
pub use interop::InteropContext;
pub use mempool::MemPool;
pub use native::{GasToken, NativeContract, NativeRegistry, NeoToken};

/// Error types for ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Storage failure, including the distinguishable key-not-found case.
    #[error(transparent)]
    Store(#[from] neo_persistence::Error),

    /// Malformed persisted or wire bytes.
    #[error("decode error: {0}")]
    Decode(neo_io::Error),

    /// A consensus rule was violated; state is untouched.
    #[error("verification failed: {0}")]
    Verification(String),

    /// A block failed its pre-conditions; state is untouched.
    #[error("invalid block: {0}")]
    InvalidBlock(String),

    /// Contained VM failure.
    #[error("vm fault: {0}")]
    Vm(#[from] neo_vm::VmError),

    /// Core-type failure (hashes, amounts, transactions).
    #[error(transparent)]
    Core(#[from] neo_core::CoreError),

    /// Cryptographic material failure.
    #[error(transparent)]
    Crypto(#[from] neo_cryptography::Error),

    /// The mempool rejected a transaction.
    #[error("pool rejection: {0}")]
    Pool(String),
}

impl From<neo_io::Error> for LedgerError {
    fn from(err: neo_io::Error) -> Self {
        LedgerError::Decode(err)
    }
}

impl LedgerError {
    /// Indicates the distinguishable key-not-found storage case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::Store(neo_persistence::Error::NotFound))
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
