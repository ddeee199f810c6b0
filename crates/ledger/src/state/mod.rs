//! Typed records held in the persistent store.

pub mod account;
pub mod app_exec_result;
pub mod asset;
pub mod contract_state;
pub mod nep5;
pub mod storage_item;
pub mod unspent_coin;
pub mod validator;

pub use account::Account;
pub use app_exec_result::{AppExecResult, NotificationEvent};
pub use asset::Asset;
pub use contract_state::ContractState;
pub use nep5::{Nep5Balances, Nep5Tracker, Nep5Transfer, Nep5TransferLog, TRANSFER_BATCH_SIZE};
pub use storage_item::StorageItem;
pub use unspent_coin::{CoinState, OutputState, UnspentCoin};
pub use validator::{Validator, ValidatorsCount, MAX_VALIDATORS};
