//! The native utility token.

use super::nep5_token::{Nep5Api, Nep5Token};
use super::{arg_to_i64, NativeContract};
use crate::interop::InteropContext;
use crate::state::Account;
use crate::Result;
use neo_core::UInt160;
use neo_smart_contract::{ContractParameterType, MethodDescriptor, Parameter};
use neo_vm::{ScriptBuilder, StackItem, VmError, VmResult};
use std::sync::Arc;

/// The service name the utility token answers to.
pub const GAS_SERVICE_NAME: &str = "Neo.Native.Tokens.GAS";

/// Genesis supply, in whole tokens.
const GENESIS_SUPPLY: i64 = 30_000_000;

/// The native utility token: eight decimals, minted to the standby
/// committee at genesis and thereafter through claimable-gas distribution.
pub struct GasToken {
    token: Nep5Token,
}

impl Default for GasToken {
    fn default() -> Self {
        Self::new()
    }
}

impl GasToken {
    /// Creates the token with its derived script hash.
    pub fn new() -> Self {
        let hash = native_hash(GAS_SERVICE_NAME);
        Self {
            token: Nep5Token::new("GAS", "gas", 8, GAS_SERVICE_NAME, hash),
        }
    }

    /// The token's script hash.
    pub fn hash(&self) -> UInt160 {
        self.token.hash
    }

    /// The fractional-unit factor (10^8).
    pub fn factor(&self) -> i64 {
        self.token.factor
    }

    /// First-run initialization: mint the genesis supply to the standby
    /// multisig account. On later runs the supply is restored from the
    /// stored state blob.
    pub fn initialize(self: &Arc<Self>, ic: &mut InteropContext) -> Result<()> {
        match ic.dao.get_native_state(self.hash()) {
            Ok(data) => {
                self.token.init_from_store(&data)?;
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                let committee = standby_multisig_hash(ic)?;
                Nep5Token::mint(
                    self.as_ref(),
                    ic,
                    committee,
                    GENESIS_SUPPLY * self.token.factor,
                )?;
                ic.dao
                    .put_native_state(self.hash(), &self.token.serialize_state())
            }
            Err(err) => Err(err),
        }
    }

    /// Mints claimable gas directly into an already-loaded account,
    /// used by the governance token's balance hook.
    pub fn mint_into_account(
        &self,
        ic: &mut InteropContext,
        account: &mut Account,
        amount: i64,
    ) -> VmResult<()> {
        if amount < 0 {
            return Err(VmError::InteropFault("negative mint amount".into()));
        }
        if amount == 0 {
            return Ok(());
        }
        account.gas_balance += amount;
        *self.token_supply_mut() += amount;
        self.emit_mint(ic, account.script_hash, amount);
        Ok(())
    }

    fn token_supply_mut(&self) -> parking_lot::RwLockWriteGuard<'_, i64> {
        self.token.total_supply_mut()
    }

    fn emit_mint(&self, ic: &mut InteropContext, to: UInt160, amount: i64) {
        self.token.emit_mint_event(ic, to, amount);
    }

    /// Builds the registrable native contract for this token.
    pub fn to_native_contract(self: &Arc<Self>) -> NativeContract {
        let mut contract = NativeContract::new(GAS_SERVICE_NAME);
        Nep5Token::install_methods(&mut contract, self.clone() as Arc<dyn Nep5Api>);

        let this = self.clone();
        contract.add_method(
            MethodDescriptor::new(
                "getSysFeeAmount",
                ContractParameterType::Integer,
                vec![Parameter::new("index", ContractParameterType::Integer)],
            ),
            1,
            true,
            Box::new(move |ic, args| this.get_sys_fee_amount(ic, &args)),
        );

        let this = self.clone();
        contract.on_persist = Some(Box::new(move |ic| {
            ic.dao
                .put_native_state(this.hash(), &this.token.serialize_state())
        }));
        contract
    }

    /// `getSysFeeAmount(index)`: the cumulative system-fee counter stored
    /// with the block at `index`, in whole units.
    fn get_sys_fee_amount(
        &self,
        ic: &mut InteropContext,
        args: &[StackItem],
    ) -> VmResult<StackItem> {
        let index = arg_to_i64(
            args.first()
                .ok_or_else(|| VmError::InteropFault("missing index".into()))?,
        )?;
        let index = u32::try_from(index)
            .map_err(|_| VmError::InvalidConversion("negative block index".into()))?;
        let hash = ic
            .chain
            .header_hash(index)
            .ok_or_else(|| VmError::InteropFault(format!("no block at {index}")))?;
        let (_, sys_fee) = ic
            .dao
            .get_block(hash)
            .map_err(|e| VmError::InteropFault(e.to_string()))?;
        Ok(StackItem::integer(sys_fee))
    }
}

impl Nep5Api for GasToken {
    fn token(&self) -> &Nep5Token {
        &self.token
    }

    fn balance(&self, account: &Account) -> i64 {
        account.gas_balance
    }

    fn inc_balance(
        &self,
        _ic: &mut InteropContext,
        account: &mut Account,
        amount: i64,
    ) -> VmResult<()> {
        if amount == 0 {
            return Ok(());
        }
        if amount < 0 && account.gas_balance < -amount {
            return Err(VmError::InteropFault("insufficient funds".into()));
        }
        account.gas_balance += amount;
        Ok(())
    }
}

/// The multisig account of the standby committee, with the conventional
/// majority threshold.
pub fn standby_multisig_hash(ic: &InteropContext) -> Result<UInt160> {
    let validators = &ic.chain.standby_validators;
    let threshold = validators.len() / 2 + 1;
    let script = neo_smart_contract::create_multisig_redeem_script(threshold, validators)
        .map_err(|e| crate::LedgerError::Verification(e.to_string()))?;
    Ok(UInt160::from_script(&script))
}

/// The script hash of a native contract: the hash of its `SYSCALL` stub.
pub fn native_hash(service_name: &str) -> UInt160 {
    let mut builder = ScriptBuilder::new();
    builder.emit_syscall(service_name);
    UInt160::from_script(&builder.into_bytes())
}
