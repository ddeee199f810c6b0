// Copyright (C) 2015-2025 The Neo Project.
//
// lib.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Core ledger types: fixed-size hashes, fixed-point amounts, witnesses and
//! the transaction model.

pub mod address;
pub mod fixed8;
pub mod transaction;
pub mod uint160;
pub mod uint256;
pub mod witness;

pub use fixed8::Fixed8;
pub use transaction::{
    group_inputs_by_prev_hash, AssetType, Attribute, AttributeUsage, Input, Output, PublishData,
    RegisterData, Transaction, TransactionData, TransactionType,
};
pub use uint160::UInt160;
pub use uint256::UInt256;
pub use witness::Witness;

/// Core module errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Malformed binary or textual representation.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// A rule of the transaction model was violated.
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    /// Arithmetic overflow in a fixed-point operation.
    #[error("fixed-point overflow in {0}")]
    Overflow(&'static str),

    /// Serialization failure bubbled up from the IO layer.
    #[error(transparent)]
    Io(#[from] neo_io::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
