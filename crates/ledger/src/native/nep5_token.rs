//! The NEP-5 fungible-token template shared by the native tokens.

use super::{arg_to_i64, arg_to_uint160, NativeContract};
use crate::interop::InteropContext;
use crate::state::{Account, NotificationEvent};
use neo_core::UInt160;
use neo_smart_contract::{ContractParameterType, MethodDescriptor, Parameter};
use neo_vm::{bigint_to_bytes, bytes_to_bigint, StackItem, VmError, VmResult};
use num_bigint::BigInt;
use parking_lot::RwLock;

/// Shared token fields: identity plus the in-memory total supply, which is
/// rebuilt from the store on startup.
pub struct Nep5Token {
    pub name: &'static str,
    pub symbol: &'static str,
    pub decimals: i64,
    pub factor: i64,
    pub service_name: &'static str,
    pub hash: UInt160,
    total_supply: RwLock<i64>,
}

/// The behavior a concrete token supplies on top of the template: where
/// the balance lives in the account record and how it changes.
pub trait Nep5Api: Send + Sync {
    /// The shared template fields.
    fn token(&self) -> &Nep5Token;

    /// The token balance recorded in `account`.
    fn balance(&self, account: &Account) -> i64;

    /// Applies `amount` (possibly negative) to `account`'s balance,
    /// rejecting overdrafts. The governance token also settles claimable
    /// gas here before the balance moves.
    fn inc_balance(
        &self,
        ic: &mut InteropContext,
        account: &mut Account,
        amount: i64,
    ) -> VmResult<()>;
}

impl Nep5Token {
    /// Creates the template; the hash must be the native's script hash.
    pub fn new(
        name: &'static str,
        symbol: &'static str,
        decimals: i64,
        service_name: &'static str,
        hash: UInt160,
    ) -> Self {
        Self {
            name,
            symbol,
            decimals,
            factor: 10i64.pow(decimals as u32),
            service_name,
            hash,
            total_supply: RwLock::new(0),
        }
    }

    /// The current total supply, in fractional units.
    pub fn total_supply(&self) -> i64 {
        *self.total_supply.read()
    }

    /// Write access to the supply counter, for token-internal accounting.
    pub(crate) fn total_supply_mut(&self) -> parking_lot::RwLockWriteGuard<'_, i64> {
        self.total_supply.write()
    }

    /// Emits a mint-shaped `Transfer` notification (null origin).
    pub(crate) fn emit_mint_event(&self, ic: &mut InteropContext, to: UInt160, amount: i64) {
        self.emit_transfer(ic, None, Some(to), amount);
    }

    /// The serialized private state: the total supply as a minimal
    /// little-endian integer.
    pub fn serialize_state(&self) -> Vec<u8> {
        bigint_to_bytes(&BigInt::from(self.total_supply()))
    }

    /// Restores the private state written by [`Nep5Token::serialize_state`].
    pub fn init_from_store(&self, data: &[u8]) -> VmResult<()> {
        let supply = neo_vm::bigint_to_i64(&bytes_to_bigint(data))?;
        *self.total_supply.write() = supply;
        Ok(())
    }

    fn emit_transfer(
        &self,
        ic: &mut InteropContext,
        from: Option<UInt160>,
        to: Option<UInt160>,
        amount: i64,
    ) {
        let endpoint = |hash: Option<UInt160>| match hash {
            Some(hash) => StackItem::byte_array(hash.to_array_be().to_vec()),
            None => StackItem::byte_array(Vec::new()),
        };
        let item = StackItem::array(vec![
            StackItem::byte_array(b"Transfer".to_vec()),
            endpoint(from),
            endpoint(to),
            StackItem::integer(amount),
        ]);
        if let Ok(event) = NotificationEvent::from_item(self.hash, &item) {
            ic.notifications.push(event);
        }
    }

    /// The `transfer` semantics of the template. A transfer to self or of
    /// zero collapses to a zero-delta touch of `from` only, which still
    /// settles gas for the governance token.
    pub fn transfer(
        api: &dyn Nep5Api,
        ic: &mut InteropContext,
        from: UInt160,
        to: UInt160,
        amount: i64,
    ) -> VmResult<()> {
        if amount < 0 {
            return Err(VmError::InteropFault("negative transfer amount".into()));
        }
        let token = api.token();

        let mut account_from = ic
            .dao
            .get_account_or_new(from)
            .map_err(|e| VmError::InteropFault(e.to_string()))?;
        let is_empty = from == to || amount == 0;
        let delta = if is_empty { 0 } else { amount };
        api.inc_balance(ic, &mut account_from, -delta)?;
        ic.dao
            .put_account(&account_from)
            .map_err(|e| VmError::InteropFault(e.to_string()))?;

        if !is_empty {
            let mut account_to = ic
                .dao
                .get_account_or_new(to)
                .map_err(|e| VmError::InteropFault(e.to_string()))?;
            api.inc_balance(ic, &mut account_to, amount)?;
            ic.dao
                .put_account(&account_to)
                .map_err(|e| VmError::InteropFault(e.to_string()))?;
        }

        token.emit_transfer(ic, Some(from), Some(to), amount);
        Ok(())
    }

    /// Mints `amount` to `hash`, growing the total supply. Zero is a
    /// no-op; negative amounts abort the invocation.
    pub fn mint(
        api: &dyn Nep5Api,
        ic: &mut InteropContext,
        hash: UInt160,
        amount: i64,
    ) -> VmResult<()> {
        if amount < 0 {
            return Err(VmError::InteropFault("negative mint amount".into()));
        }
        if amount == 0 {
            return Ok(());
        }
        let mut account = ic
            .dao
            .get_account_or_new(hash)
            .map_err(|e| VmError::InteropFault(e.to_string()))?;
        api.inc_balance(ic, &mut account, amount)?;
        ic.dao
            .put_account(&account)
            .map_err(|e| VmError::InteropFault(e.to_string()))?;

        let token = api.token();
        *token.total_supply.write() += amount;
        token.emit_transfer(ic, None, Some(hash), amount);
        Ok(())
    }

    /// Burns `amount` from `hash`, shrinking the total supply. Zero is a
    /// no-op; negative amounts abort the invocation.
    pub fn burn(
        api: &dyn Nep5Api,
        ic: &mut InteropContext,
        hash: UInt160,
        amount: i64,
    ) -> VmResult<()> {
        if amount < 0 {
            return Err(VmError::InteropFault("negative burn amount".into()));
        }
        if amount == 0 {
            return Ok(());
        }
        let mut account = ic
            .dao
            .get_account_or_new(hash)
            .map_err(|e| VmError::InteropFault(e.to_string()))?;
        api.inc_balance(ic, &mut account, -amount)?;
        ic.dao
            .put_account(&account)
            .map_err(|e| VmError::InteropFault(e.to_string()))?;

        let token = api.token();
        *token.total_supply.write() -= amount;
        token.emit_transfer(ic, Some(hash), None, amount);
        Ok(())
    }

    /// Wires the five standard NEP-5 methods and the `Transfer` event into
    /// `contract`, dispatching through `api`.
    pub fn install_methods(contract: &mut NativeContract, api: std::sync::Arc<dyn Nep5Api>) {
        let api_name = api.clone();
        contract.add_method(
            MethodDescriptor::new("name", ContractParameterType::String, vec![]),
            1,
            true,
            Box::new(move |_ic, _args| {
                Ok(StackItem::byte_array(api_name.token().name.as_bytes().to_vec()))
            }),
        );

        let api_symbol = api.clone();
        contract.add_method(
            MethodDescriptor::new("symbol", ContractParameterType::String, vec![]),
            1,
            true,
            Box::new(move |_ic, _args| {
                Ok(StackItem::byte_array(
                    api_symbol.token().symbol.as_bytes().to_vec(),
                ))
            }),
        );

        let api_decimals = api.clone();
        contract.add_method(
            MethodDescriptor::new("decimals", ContractParameterType::Integer, vec![]),
            1,
            true,
            Box::new(move |_ic, _args| Ok(StackItem::integer(api_decimals.token().decimals))),
        );

        let api_balance = api.clone();
        contract.add_method(
            MethodDescriptor::new(
                "balanceOf",
                ContractParameterType::Integer,
                vec![Parameter::new("account", ContractParameterType::Hash160)],
            ),
            1,
            true,
            Box::new(move |ic, args| {
                let hash = arg_to_uint160(
                    args.first()
                        .ok_or_else(|| VmError::InteropFault("missing account".into()))?,
                )?;
                let account = ic
                    .dao
                    .get_account_or_new(hash)
                    .map_err(|e| VmError::InteropFault(e.to_string()))?;
                Ok(StackItem::integer(api_balance.balance(&account)))
            }),
        );

        let transfer_params = vec![
            Parameter::new("from", ContractParameterType::Hash160),
            Parameter::new("to", ContractParameterType::Hash160),
            Parameter::new("amount", ContractParameterType::Integer),
        ];
        let api_transfer = api.clone();
        contract.add_method(
            MethodDescriptor::new(
                "transfer",
                ContractParameterType::Boolean,
                transfer_params.clone(),
            ),
            1,
            false,
            Box::new(move |ic, args| {
                if args.len() != 3 {
                    return Err(VmError::InteropFault("transfer takes 3 arguments".into()));
                }
                let from = arg_to_uint160(&args[0])?;
                let to = arg_to_uint160(&args[1])?;
                let amount = arg_to_i64(&args[2])?;
                let ok =
                    Nep5Token::transfer(api_transfer.as_ref(), ic, from, to, amount).is_ok();
                Ok(StackItem::Bool(ok))
            }),
        );
        contract.add_event("Transfer", transfer_params);
    }
}
