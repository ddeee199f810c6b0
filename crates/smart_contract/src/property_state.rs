//! Contract property flags.

use bitflags::bitflags;

bitflags! {
    /// Capabilities a deployed contract was published with.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ContractPropertyState: u8 {
        /// The contract owns persistent storage.
        const HAS_STORAGE = 0x01;
        /// The contract may call targets supplied at run time.
        const HAS_DYNAMIC_INVOKE = 0x02;
        /// The contract accepts asset transfers.
        const IS_PAYABLE = 0x04;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_combine() {
        let props = ContractPropertyState::HAS_STORAGE | ContractPropertyState::IS_PAYABLE;
        assert!(props.contains(ContractPropertyState::HAS_STORAGE));
        assert!(!props.contains(ContractPropertyState::HAS_DYNAMIC_INVOKE));
        assert_eq!(props.bits(), 0x05);
    }
}
