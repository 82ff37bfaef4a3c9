//! Account service - provisioning new ledger rows

use std::sync::Arc;

use rand::Rng;
use tracing::info;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, AccountId};
use crate::ports::AccountStore;

/// Bounds of a random starting balance, in minor units
pub const RANDOM_STARTING_BALANCE: std::ops::RangeInclusive<i64> = 1..=10_000;

/// Starting balance of a newly opened account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartingBalance {
    /// Explicit amount in minor units
    Amount(i64),
    /// Uniform in [`RANDOM_STARTING_BALANCE`]
    Random,
}

impl StartingBalance {
    fn resolve(self) -> i64 {
        match self {
            StartingBalance::Amount(amount) => amount,
            StartingBalance::Random => rand::thread_rng().gen_range(RANDOM_STARTING_BALANCE),
        }
    }
}

pub struct AccountService {
    store: Arc<dyn AccountStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Open an account, generating an id when none is given
    pub fn open_account(
        &self,
        id: Option<AccountId>,
        starting_balance: StartingBalance,
    ) -> Result<Account> {
        let account = Account::new(id.unwrap_or_else(AccountId::random), starting_balance.resolve());
        account.validate().map_err(Error::validation)?;

        self.store.insert_account(&account)?;
        info!(account_id = %account.id, "account opened");
        Ok(account)
    }
}
