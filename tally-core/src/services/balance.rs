//! Balance service - point reads outside any transfer scope

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::money::to_major;
use crate::domain::result::{Error, Result};
use crate::domain::AccountId;
use crate::ports::AccountStore;

/// Current balance of one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalance {
    pub account_id: AccountId,
    /// Minor units
    pub balance: i64,
}

impl AccountBalance {
    /// Balance in major units, as response bodies render it
    pub fn major(&self) -> Decimal {
        to_major(self.balance)
    }
}

pub struct BalanceService {
    store: Arc<dyn AccountStore>,
}

impl BalanceService {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Read the committed balance of an account
    ///
    /// Reflects every transfer committed before the read started.
    pub fn get_balance(&self, account_id: &AccountId) -> Result<AccountBalance> {
        let account = self
            .store
            .get_account(account_id)?
            .ok_or(Error::AccountNotFound(*account_id))?;

        Ok(AccountBalance {
            account_id: account.id,
            balance: account.balance,
        })
    }
}
