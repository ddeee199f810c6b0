//! The native governance token.

use super::gas_token::{standby_multisig_hash, native_hash, GasToken};
use super::nep5_token::{Nep5Api, Nep5Token};
use super::{arg_to_i64, arg_to_public_key, arg_to_uint160, NativeContract};
use crate::interop::InteropContext;
use crate::state::{Account, Validator};
use crate::Result;
use neo_core::{Fixed8, UInt160};
use neo_cryptography::PublicKey;
use neo_smart_contract::{ContractParameterType, MethodDescriptor, Parameter};
use neo_vm::{StackItem, VmError, VmResult};
use std::sync::Arc;

/// The service name the governance token answers to.
pub const NEO_SERVICE_NAME: &str = "Neo.Native.Tokens.NEO";

/// Genesis supply, in whole tokens (zero decimals).
const GENESIS_SUPPLY: i64 = 100_000_000;

/// The native governance token: zero decimals, on-chain validator
/// registration and voting, and claimable-gas accrual for its holders.
///
/// Holds a plain back-reference to the utility token for gas distribution;
/// both are owned by the chain's native registry.
pub struct NeoToken {
    token: Nep5Token,
    gas: Arc<GasToken>,
}

impl NeoToken {
    /// Creates the token wired to the utility token it mints gas on.
    pub fn new(gas: Arc<GasToken>) -> Self {
        let hash = native_hash(NEO_SERVICE_NAME);
        Self {
            token: Nep5Token::new("NEO", "neo", 0, NEO_SERVICE_NAME, hash),
            gas,
        }
    }

    /// The token's script hash.
    pub fn hash(&self) -> UInt160 {
        self.token.hash
    }

    /// First-run initialization: mint the genesis supply to the standby
    /// multisig account and register the standby validators. On later runs
    /// the supply is restored from the stored state blob.
    pub fn initialize(self: &Arc<Self>, ic: &mut InteropContext) -> Result<()> {
        match ic.dao.get_native_state(self.hash()) {
            Ok(data) => {
                self.token.init_from_store(&data)?;
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                let committee = standby_multisig_hash(ic)?;
                Nep5Token::mint(self.as_ref(), ic, committee, GENESIS_SUPPLY)?;
                for key in ic.chain.standby_validators.clone() {
                    self.register_validator_internal(ic, &key)?;
                }
                ic.dao
                    .put_native_state(self.hash(), &self.token.serialize_state())
            }
            Err(err) => Err(err),
        }
    }

    fn distribute_gas(&self, ic: &mut InteropContext, account: &mut Account) -> VmResult<()> {
        let Some(block) = ic.block.clone() else {
            return Ok(());
        };
        let claimable = ic
            .chain
            .calculate_claimable(
                &ic.dao,
                account.neo.balance,
                account.neo.balance_height,
                block.index(),
            )
            .map_err(|e| VmError::InteropFault(e.to_string()))?;
        account.neo.balance_height = block.index();
        self.gas.mint_into_account(ic, account, claimable.raw())
    }

    fn register_validator_internal(
        &self,
        ic: &mut InteropContext,
        key: &PublicKey,
    ) -> VmResult<()> {
        let mut validator = ic
            .dao
            .get_validator_or_new(key)
            .map_err(|e| VmError::InteropFault(e.to_string()))?;
        if validator.registered {
            // Double registration is a no-op.
            return Ok(());
        }
        validator.registered = true;
        ic.dao
            .put_validator(&validator)
            .map_err(|e| VmError::InteropFault(e.to_string()))
    }

    fn vote_internal(
        &self,
        ic: &mut InteropContext,
        account_hash: UInt160,
        keys: Vec<PublicKey>,
    ) -> VmResult<()> {
        let witnessed = ic
            .verifying_hashes()
            .map_err(|e| VmError::InteropFault(e.to_string()))?
            .contains(&account_hash);
        if !witnessed {
            return Err(VmError::InteropFault("account witness missing".into()));
        }

        let mut account = ic
            .dao
            .get_account_or_new(account_hash)
            .map_err(|e| VmError::InteropFault(e.to_string()))?;
        let weight = Fixed8::from_raw(account.neo.balance);
        let mut counts = ic
            .dao
            .get_validators_count()
            .map_err(|e| VmError::InteropFault(e.to_string()))?;

        // Deduct the account's weight from its previous vote set.
        for key in &account.votes {
            let mut validator = ic
                .dao
                .get_validator_or_new(key)
                .map_err(|e| VmError::InteropFault(e.to_string()))?;
            validator.votes = Fixed8::from_raw(validator.votes.raw() - weight.raw());
            if validator.is_empty() {
                ic.dao
                    .delete_validator(key)
                    .map_err(|e| VmError::InteropFault(e.to_string()))?;
            } else {
                ic.dao
                    .put_validator(&validator)
                    .map_err(|e| VmError::InteropFault(e.to_string()))?;
            }
        }
        if !account.votes.is_empty() {
            counts.adjust(account.votes.len(), -weight);
        }

        // Replace the vote set and credit the new targets.
        let mut keys = keys;
        keys.sort();
        keys.dedup();
        for key in &keys {
            let mut validator = ic
                .dao
                .get_validator_or_new(key)
                .map_err(|e| VmError::InteropFault(e.to_string()))?;
            validator.votes = Fixed8::from_raw(validator.votes.raw() + weight.raw());
            ic.dao
                .put_validator(&validator)
                .map_err(|e| VmError::InteropFault(e.to_string()))?;
        }
        if !keys.is_empty() {
            counts.adjust(keys.len(), weight);
        }
        account.votes = keys;

        ic.dao
            .put_account(&account)
            .map_err(|e| VmError::InteropFault(e.to_string()))?;
        ic.dao
            .put_validators_count(&counts)
            .map_err(|e| VmError::InteropFault(e.to_string()))
    }

    /// The committee for the next blocks: registered validators ordered by
    /// votes, topped up from the standby set, final order by public key.
    pub fn get_validators_internal(&self, ic: &InteropContext) -> VmResult<Vec<PublicKey>> {
        let counts = ic
            .dao
            .get_validators_count()
            .map_err(|e| VmError::InteropFault(e.to_string()))?;
        let standby = &ic.chain.standby_validators;
        if counts.is_empty() {
            let mut result = standby.clone();
            result.sort();
            return Ok(result);
        }

        let mut validators = ic.dao.get_validators();
        validators.sort_by(|a, b| {
            // Unregistered entries go last, most-voted first, ties broken
            // by public key.
            b.registered
                .cmp(&a.registered)
                .then_with(|| b.votes.cmp(&a.votes))
                .then_with(|| a.public_key.cmp(&b.public_key))
        });

        let mut count = counts.weighted_average();
        if count < standby.len() {
            count = standby.len();
        }

        let mut unique_standby = standby.clone();
        unique_standby.sort();
        unique_standby.dedup();

        let mut result: Vec<PublicKey> = validators
            .iter()
            .filter(|v| v.registered_and_has_votes() || unique_standby.contains(&v.public_key))
            .map(|v| v.public_key.clone())
            .collect();

        if result.len() >= count {
            result.truncate(count);
        } else {
            for key in &unique_standby {
                if result.len() >= count {
                    break;
                }
                if !result.contains(key) {
                    result.push(key.clone());
                }
            }
        }
        result.sort();
        Ok(result)
    }

    /// Builds the registrable native contract for this token.
    pub fn to_native_contract(self: &Arc<Self>) -> NativeContract {
        let mut contract = NativeContract::new(NEO_SERVICE_NAME);
        Nep5Token::install_methods(&mut contract, self.clone() as Arc<dyn Nep5Api>);

        contract.add_method(
            MethodDescriptor::new(
                "unclaimedGas",
                ContractParameterType::Integer,
                vec![
                    Parameter::new("account", ContractParameterType::Hash160),
                    Parameter::new("end", ContractParameterType::Integer),
                ],
            ),
            1,
            true,
            Box::new(move |ic, args| {
                if args.len() != 2 {
                    return Err(VmError::InteropFault("unclaimedGas takes 2 arguments".into()));
                }
                let hash = arg_to_uint160(&args[0])?;
                let end = arg_to_i64(&args[1])?;
                let end = u32::try_from(end)
                    .map_err(|_| VmError::InvalidConversion("negative end height".into()))?;
                let account = ic
                    .dao
                    .get_account_or_new(hash)
                    .map_err(|e| VmError::InteropFault(e.to_string()))?;
                let claimable = ic
                    .chain
                    .calculate_claimable(
                        &ic.dao,
                        account.neo.balance,
                        account.neo.balance_height,
                        end,
                    )
                    .map_err(|e| VmError::InteropFault(e.to_string()))?;
                Ok(StackItem::integer(claimable.raw()))
            }),
        );

        let this = self.clone();
        contract.add_method(
            MethodDescriptor::new(
                "registerValidator",
                ContractParameterType::Boolean,
                vec![Parameter::new("pubkey", ContractParameterType::PublicKey)],
            ),
            1,
            false,
            Box::new(move |ic, args| {
                let key = arg_to_public_key(
                    args.first()
                        .ok_or_else(|| VmError::InteropFault("missing pubkey".into()))?,
                )?;
                let ok = this.register_validator_internal(ic, &key).is_ok();
                Ok(StackItem::Bool(ok))
            }),
        );

        let this = self.clone();
        contract.add_method(
            MethodDescriptor::new(
                "vote",
                ContractParameterType::Boolean,
                vec![
                    Parameter::new("account", ContractParameterType::Hash160),
                    Parameter::new("pubkeys", ContractParameterType::Array),
                ],
            ),
            1,
            false,
            Box::new(move |ic, args| {
                if args.len() != 2 {
                    return Err(VmError::InteropFault("vote takes 2 arguments".into()));
                }
                let account = arg_to_uint160(&args[0])?;
                let keys = args[1]
                    .to_vec()?
                    .iter()
                    .map(arg_to_public_key)
                    .collect::<VmResult<Vec<_>>>()?;
                let ok = this.vote_internal(ic, account, keys).is_ok();
                Ok(StackItem::Bool(ok))
            }),
        );

        contract.add_method(
            MethodDescriptor::new(
                "getRegisteredValidators",
                ContractParameterType::Array,
                vec![],
            ),
            1,
            true,
            Box::new(move |ic, _args| {
                let validators = ic.dao.get_validators();
                let items = validators
                    .into_iter()
                    .map(|validator: Validator| {
                        StackItem::struct_item(vec![
                            StackItem::byte_array(validator.public_key.to_bytes()),
                            StackItem::integer(validator.votes.raw()),
                        ])
                    })
                    .collect();
                Ok(StackItem::array(items))
            }),
        );

        let this = self.clone();
        contract.add_method(
            MethodDescriptor::new("getValidators", ContractParameterType::Array, vec![]),
            1,
            true,
            Box::new(move |ic, _args| {
                let keys = this.get_validators_internal(ic)?;
                Ok(keys_to_array(&keys))
            }),
        );

        let this = self.clone();
        contract.add_method(
            MethodDescriptor::new(
                "getNextBlockValidators",
                ContractParameterType::Array,
                vec![],
            ),
            1,
            true,
            Box::new(move |ic, _args| {
                let keys = this.get_validators_internal(ic)?;
                Ok(keys_to_array(&keys))
            }),
        );

        let this = self.clone();
        contract.on_persist = Some(Box::new(move |ic| {
            ic.dao
                .put_native_state(this.hash(), &this.token.serialize_state())
        }));
        contract
    }
}

fn keys_to_array(keys: &[PublicKey]) -> StackItem {
    StackItem::array(
        keys.iter()
            .map(|key| StackItem::byte_array(key.to_bytes()))
            .collect(),
    )
}

impl Nep5Api for NeoToken {
    fn token(&self) -> &Nep5Token {
        &self.token
    }

    fn balance(&self, account: &Account) -> i64 {
        account.neo.balance
    }

    fn inc_balance(
        &self,
        ic: &mut InteropContext,
        account: &mut Account,
        amount: i64,
    ) -> VmResult<()> {
        if amount < 0 && account.neo.balance < -amount {
            return Err(VmError::InteropFault("insufficient funds".into()));
        }
        // Settle claimable gas at the old balance before it changes.
        self.distribute_gas(ic, account)?;
        account.neo.balance += amount;
        Ok(())
    }
}
