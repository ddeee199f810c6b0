//! Stack-based virtual machine for Neo contract scripts.
//!
//! The VM interprets the Neo 2 bytecode: an evaluation stack, an alternative
//! stack and an invocation stack of call frames, with interop calls
//! dispatched through registered getters by a 32-bit identifier. Execution
//! is metered against a gas limit and bounded by stack-depth and item-size
//! caps; any script-raised fault is contained and surfaces as the `FAULT`
//! terminal state, never as a panic out of [`Vm::execute`].

pub mod context;
pub mod multisig;
pub mod opcode;
pub mod script_builder;
pub mod stack_item;
pub mod vm;

pub use context::ExecutionContext;
pub use multisig::check_multisig;
pub use opcode::OpCode;
pub use script_builder::ScriptBuilder;
pub use stack_item::{
    bigint_to_bytes, bigint_to_i64, bytes_to_bigint, deserialize_item, serialize_item, MapKey,
    StackItem,
};
pub use vm::{InteropFuncPrice, InteropGetter, ScriptGetter, Vm, VmState};

use neo_cryptography::sha256;

/// Hard cap on the combined depth of the evaluation and alternative stacks.
pub const MAX_STACK_SIZE: usize = 2 * 1024;

/// Hard cap on the invocation stack depth.
pub const MAX_INVOCATION_STACK_SIZE: usize = 1024;

/// Largest byte-array item the VM will produce.
pub const MAX_ITEM_SIZE: usize = 1024 * 1024;

/// Widest integer the VM will operate on, in bytes.
pub const MAX_BIGINT_BYTES: usize = 32;

/// Largest array or map the VM will build.
pub const MAX_ARRAY_SIZE: usize = 1024;

/// Fixed-point units charged per unit of opcode price.
pub const GAS_RATIO: i64 = 100_000;

/// Error types for VM operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VmError {
    #[error("invalid opcode {opcode:#04x}")]
    InvalidOpcode { opcode: u8 },

    #[error("stack underflow")]
    StackUnderflow,

    #[error("stack overflow: limit {limit}")]
    StackOverflow { limit: usize },

    #[error("invalid type conversion: {0}")]
    InvalidConversion(String),

    #[error("item size limit exceeded")]
    ItemTooLarge,

    #[error("integer width limit exceeded")]
    IntegerTooWide,

    #[error("gas limit exceeded")]
    GasLimitExceeded,

    #[error("bad script offset {0}")]
    BadOffset(isize),

    #[error("unknown script hash")]
    UnknownScript,

    #[error("dynamic invocation is not allowed for this script")]
    DynamicInvokeForbidden,

    #[error("unknown interop {id:#010x}")]
    UnknownInterop { id: u32 },

    #[error("interop fault: {0}")]
    InteropFault(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("THROW")]
    Throw,

    #[error("no checked hash set for signature verification")]
    NoCheckedHash,

    #[error("more signatures than public keys")]
    TooManySignatures,

    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

/// Result type for VM operations.
pub type VmResult<T> = std::result::Result<T, VmError>;

/// Maps an interop name to its 32-bit dispatch identifier: the little-endian
/// word formed by the first four bytes of the name's SHA256.
pub fn interop_name_to_id(name: &[u8]) -> u32 {
    let digest = sha256(name);
    u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
}
