//! Contract manifests.
//!
//! A manifest describes a contract's ABI (entry point, methods, events) and
//! marks which methods are safe to call without side effects. Native
//! contracts build theirs programmatically; deployed contracts exchange
//! them as JSON.

use crate::ContractParameterType;
use neo_core::UInt160;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Maximum serialized size of a valid manifest.
pub const MAX_MANIFEST_SIZE: usize = 2048;

/// A named, typed parameter of a method or event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ContractParameterType,
}

impl Parameter {
    /// Creates a parameter descriptor.
    pub fn new(name: &str, param_type: ContractParameterType) -> Self {
        Self {
            name: name.to_string(),
            param_type,
        }
    }
}

/// Describes a single callable method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDescriptor {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub return_type: ContractParameterType,
}

impl MethodDescriptor {
    /// Creates a method descriptor.
    pub fn new(name: &str, return_type: ContractParameterType, parameters: Vec<Parameter>) -> Self {
        Self {
            name: name.to_string(),
            parameters,
            return_type,
        }
    }

    /// The conventional `Main(operation, args)` entry point.
    pub fn default_entry_point() -> Self {
        Self::new(
            "Main",
            ContractParameterType::Any,
            vec![
                Parameter::new("operation", ContractParameterType::String),
                Parameter::new("args", ContractParameterType::Array),
            ],
        )
    }
}

/// Describes a single notification event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDescriptor {
    pub name: String,
    pub parameters: Vec<Parameter>,
}

/// A contract's application binary interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Abi {
    pub hash: UInt160,
    pub entry_point: MethodDescriptor,
    pub methods: Vec<MethodDescriptor>,
    pub events: Vec<EventDescriptor>,
}

/// Contract metadata: the ABI plus the set of safe methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub abi: Abi,
    pub safe_methods: BTreeSet<String>,
}

impl Manifest {
    /// Creates a manifest with the default entry point and no methods.
    pub fn new(hash: UInt160) -> Self {
        Self {
            abi: Abi {
                hash,
                entry_point: MethodDescriptor::default_entry_point(),
                methods: Vec::new(),
                events: Vec::new(),
            },
            safe_methods: BTreeSet::new(),
        }
    }

    /// Looks up a method descriptor by name.
    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.abi.methods.iter().find(|m| m.name == name)
    }

    /// Indicates whether `name` is marked safe (side-effect free).
    pub fn is_safe_method(&self, name: &str) -> bool {
        self.safe_methods.contains(name)
    }

    /// Adds a method to the ABI, optionally marking it safe.
    pub fn add_method(&mut self, descriptor: MethodDescriptor, safe: bool) {
        if safe {
            self.safe_methods.insert(descriptor.name.clone());
        }
        self.abi.methods.push(descriptor);
    }

    /// Adds an event to the ABI.
    pub fn add_event(&mut self, name: &str, parameters: Vec<Parameter>) {
        self.abi.events.push(EventDescriptor {
            name: name.to_string(),
            parameters,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Manifest {
        let mut manifest = Manifest::new(UInt160::from_script(b"contract"));
        manifest.add_method(
            MethodDescriptor::new(
                "balanceOf",
                ContractParameterType::Integer,
                vec![Parameter::new("account", ContractParameterType::Hash160)],
            ),
            true,
        );
        manifest.add_method(
            MethodDescriptor::new(
                "transfer",
                ContractParameterType::Boolean,
                vec![
                    Parameter::new("from", ContractParameterType::Hash160),
                    Parameter::new("to", ContractParameterType::Hash160),
                    Parameter::new("amount", ContractParameterType::Integer),
                ],
            ),
            false,
        );
        manifest.add_event(
            "Transfer",
            vec![
                Parameter::new("from", ContractParameterType::Hash160),
                Parameter::new("to", ContractParameterType::Hash160),
                Parameter::new("amount", ContractParameterType::Integer),
            ],
        );
        manifest
    }

    #[test]
    fn method_lookup_and_safety() {
        let manifest = sample();
        assert!(manifest.method("balanceOf").is_some());
        assert!(manifest.is_safe_method("balanceOf"));
        assert!(!manifest.is_safe_method("transfer"));
        assert!(manifest.method("mint").is_none());
    }

    #[test]
    fn json_round_trip() {
        let manifest = sample();
        let json = serde_json::to_string(&manifest).unwrap();
        assert!(json.len() <= MAX_MANIFEST_SIZE);
        let back: Manifest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, manifest);
    }

    #[test]
    fn entry_point_is_main() {
        let manifest = Manifest::new(UInt160::zero());
        assert_eq!(manifest.abi.entry_point.name, "Main");
        assert_eq!(manifest.abi.entry_point.parameters.len(), 2);
    }
}
