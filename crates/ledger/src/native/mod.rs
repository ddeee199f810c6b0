//! The native-contract framework.
//!
//! A native contract is host code addressable from bytecode as if it were
//! deployed: its script is a single `SYSCALL <service name>`, its hash is
//! the hash of that script, and its dispatch id is the interop hash of the
//! name. Dispatch reads `(method name, args array)` from the evaluation
//! stack and refuses invocation when the executing script is not the
//! native's own stub.

pub mod gas_token;
pub mod neo_token;
pub mod nep5_token;

pub use gas_token::GasToken;
pub use neo_token::NeoToken;
pub use nep5_token::{Nep5Api, Nep5Token};

use crate::interop::InteropContext;
use crate::state::ContractState;
use crate::{Dao, Result};
use neo_core::UInt160;
use neo_smart_contract::{ContractPropertyState, Manifest, MethodDescriptor, Parameter};
use neo_vm::{
    interop_name_to_id, InteropFuncPrice, InteropGetter, ScriptBuilder, StackItem, Vm, VmError,
    VmResult,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

/// A native method handler.
pub type NativeMethodFn =
    Box<dyn Fn(&mut InteropContext, Vec<StackItem>) -> VmResult<StackItem> + Send + Sync>;

/// The per-block hook of a native contract.
pub type OnPersistFn = Box<dyn Fn(&mut InteropContext) -> Result<()> + Send + Sync>;

/// A native method descriptor: the handler plus its price.
pub struct MethodMd {
    pub func: NativeMethodFn,
    pub price: i64,
}

/// A registered native contract.
pub struct NativeContract {
    pub manifest: Manifest,
    pub service_name: String,
    pub service_id: u32,
    pub script: Vec<u8>,
    pub hash: UInt160,
    pub methods: HashMap<String, MethodMd>,
    pub on_persist: Option<OnPersistFn>,
}

impl NativeContract {
    /// Creates an empty native contract for `service_name`.
    pub fn new(service_name: &str) -> Self {
        let service_id = interop_name_to_id(service_name.as_bytes());
        let mut builder = ScriptBuilder::new();
        builder.emit_syscall(service_name);
        let script = builder.into_bytes();
        let hash = UInt160::from_script(&script);
        Self {
            manifest: Manifest::new(hash),
            service_name: service_name.to_string(),
            service_id,
            script,
            hash,
            methods: HashMap::new(),
            on_persist: None,
        }
    }

    /// Adds a method: its manifest descriptor, price, safety flag and
    /// handler.
    pub fn add_method(
        &mut self,
        descriptor: MethodDescriptor,
        price: i64,
        safe: bool,
        func: NativeMethodFn,
    ) {
        self.methods
            .insert(descriptor.name.clone(), MethodMd { func, price });
        self.manifest.add_method(descriptor, safe);
    }

    /// Adds an event to the manifest.
    pub fn add_event(&mut self, name: &str, parameters: Vec<Parameter>) {
        self.manifest.add_event(name, parameters);
    }

    /// The contract-state stub that makes the native resolvable by
    /// `APPCALL`.
    pub fn contract_state(&self) -> ContractState {
        ContractState {
            script: self.script.clone(),
            param_list: Vec::new(),
            return_type: 0xff,
            properties: ContractPropertyState::empty(),
            name: self.service_name.clone(),
            code_version: "native".to_string(),
            author: String::new(),
            email: String::new(),
            description: String::new(),
        }
    }
}

/// The set of registered natives, indexed by dispatch id and script hash.
/// Registration order fixes the `OnPersist` order.
#[derive(Default, Clone)]
pub struct NativeRegistry {
    contracts: Vec<Arc<NativeContract>>,
    by_id: HashMap<u32, usize>,
    by_hash: HashMap<UInt160, usize>,
}

impl NativeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a native contract.
    pub fn register(&mut self, contract: NativeContract) {
        let index = self.contracts.len();
        self.by_id.insert(contract.service_id, index);
        self.by_hash.insert(contract.hash, index);
        self.contracts.push(Arc::new(contract));
    }

    /// The registered contracts, in registration order.
    pub fn contracts(&self) -> &[Arc<NativeContract>] {
        &self.contracts
    }

    /// Looks a native up by its dispatch id.
    pub fn by_id(&self, id: u32) -> Option<&Arc<NativeContract>> {
        self.by_id.get(&id).map(|&i| &self.contracts[i])
    }

    /// Looks a native up by its script hash.
    pub fn by_hash(&self, hash: &UInt160) -> Option<&Arc<NativeContract>> {
        self.by_hash.get(hash).map(|&i| &self.contracts[i])
    }

    /// Writes every native's contract-state stub so `APPCALL` can resolve
    /// them. Idempotent.
    pub fn store_contract_stubs(&self, dao: &Dao) -> Result<()> {
        for contract in &self.contracts {
            if dao.get_contract(contract.hash).is_err() {
                dao.put_contract(&contract.contract_state())?;
            }
        }
        Ok(())
    }

    /// An interop getter dispatching native invocations for `ic`.
    pub fn interop_getter(
        registry: &Arc<NativeRegistry>,
        ic: Rc<RefCell<InteropContext>>,
    ) -> InteropGetter {
        let registry = registry.clone();
        Box::new(move |id| {
            let contract = registry.by_id(id)?.clone();
            let ic = ic.clone();
            Some(InteropFuncPrice {
                func: Rc::new(move |vm: &mut Vm| {
                    dispatch_native(&contract, &mut ic.borrow_mut(), vm)
                }),
                price: 0,
            })
        })
    }
}

/// Invokes a native method: `(name, args)` are read from the evaluation
/// stack; the executing script must be the native's own stub.
fn dispatch_native(
    contract: &NativeContract,
    ic: &mut InteropContext,
    vm: &mut Vm,
) -> VmResult<()> {
    let caller = vm
        .current_script_hash()
        .ok_or_else(|| VmError::InteropFault("no executing script".into()))?;
    if caller != contract.hash {
        return Err(VmError::InteropFault(
            "native contracts cannot be invoked across contracts".into(),
        ));
    }
    let name_bytes = vm.pop_bytes()?;
    let name = String::from_utf8(name_bytes)
        .map_err(|_| VmError::InvalidConversion("method name is not UTF-8".into()))?;
    let args = vm.pop()?.to_vec()?;
    let method = contract
        .methods
        .get(&name)
        .ok_or_else(|| VmError::InteropFault(format!("method {name} not found")))?;
    let result = (method.func)(ic, args)?;
    vm.push(result)
}

// -- argument conversions shared by the concrete natives

/// Converts a stack argument to a big-endian script hash.
pub(crate) fn arg_to_uint160(item: &StackItem) -> VmResult<UInt160> {
    let bytes = item.to_bytes()?;
    UInt160::from_bytes_be(&bytes).map_err(|e| VmError::InvalidConversion(e.to_string()))
}

/// Converts a stack argument to an `i64` amount.
pub(crate) fn arg_to_i64(item: &StackItem) -> VmResult<i64> {
    neo_vm::bigint_to_i64(&item.to_bigint()?)
}

/// Converts a stack argument to a public key.
pub(crate) fn arg_to_public_key(item: &StackItem) -> VmResult<neo_cryptography::PublicKey> {
    let bytes = item.to_bytes()?;
    neo_cryptography::PublicKey::from_bytes(&bytes)
        .map_err(|e| VmError::InvalidConversion(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_identity_is_derived_from_the_service_name() {
        let contract = NativeContract::new("Test.Native.Sum");
        assert_eq!(
            contract.service_id,
            interop_name_to_id(b"Test.Native.Sum")
        );
        // SYSCALL + length-prefixed name.
        assert_eq!(contract.script[0], 0x68);
        assert_eq!(contract.script[1] as usize, "Test.Native.Sum".len());
        assert_eq!(contract.hash, UInt160::from_script(&contract.script));
    }

    #[test]
    fn registry_indexes_by_id_and_hash() {
        let mut registry = NativeRegistry::new();
        let contract = NativeContract::new("Test.Native.A");
        let id = contract.service_id;
        let hash = contract.hash;
        registry.register(contract);

        assert!(registry.by_id(id).is_some());
        assert!(registry.by_hash(&hash).is_some());
        assert!(registry.by_id(id ^ 1).is_none());
        assert_eq!(registry.contracts().len(), 1);
    }
}
