//! Contract metadata shared by the ledger and the native framework:
//! parameter types, property flags, triggers, the contract manifest and the
//! standard signature/multi-signature verification scripts.

pub mod contract;
pub mod manifest;
pub mod param_type;
pub mod property_state;
pub mod trigger;

pub use contract::{create_multisig_redeem_script, create_signature_redeem_script};
pub use manifest::{Abi, EventDescriptor, Manifest, MethodDescriptor, Parameter};
pub use param_type::ContractParameterType;
pub use property_state::ContractPropertyState;
pub use trigger::TriggerType;

/// Error types for contract metadata operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid multisig parameters: {0}")]
    InvalidMultisig(String),

    #[error("invalid manifest: {0}")]
    InvalidManifest(String),
}

/// Result type for contract metadata operations.
pub type Result<T> = std::result::Result<T, Error>;
