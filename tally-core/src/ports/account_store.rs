//! Account store port - the transactional contract the transfer engine needs

use thiserror::Error;

use crate::domain::{Account, AccountId};

/// Errors raised by an account store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Transient write-write conflict with a concurrent scope. The whole scope
    /// must be abandoned and retried from a fresh snapshot.
    #[error("transaction conflict: {0}")]
    Conflict(String),

    #[error("account already exists: {0}")]
    AlreadyExists(AccountId),

    /// A leg targeted a row that does not exist
    #[error("account row missing: {0}")]
    MissingRow(AccountId),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Store-wide aggregates used for auditing the ledger invariants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSummary {
    pub account_count: i64,
    pub total_balance: i64,
    pub negative_accounts: Vec<AccountId>,
}

/// Durable mapping from account id to balance
///
/// Implementations must provide snapshot (or stronger) isolation for scopes
/// returned by [`AccountStore::begin`]: two scopes that both write the same
/// row cannot both commit. The loser sees [`StoreError::Conflict`].
pub trait AccountStore: Send + Sync {
    /// Open a transactional scope
    fn begin(&self) -> StoreResult<Box<dyn StoreScope + '_>>;

    /// Point read of a single account, outside any scope
    fn get_account(&self, id: &AccountId) -> StoreResult<Option<Account>>;

    /// Insert a new account row
    fn insert_account(&self, account: &Account) -> StoreResult<()>;

    /// Aggregate view over all rows
    fn summary(&self) -> StoreResult<LedgerSummary>;
}

/// A unit of work over the store
///
/// Reads observe one consistent snapshot. Writes become visible to other
/// readers only after [`StoreScope::commit`]. Dropping a scope that was
/// neither committed nor aborted must roll it back.
pub trait StoreScope {
    /// Read an account row inside the scope
    fn read_account(&mut self, id: &AccountId) -> StoreResult<Option<Account>>;

    /// Atomically decrement a balance, but only if it stays non-negative
    ///
    /// Returns the new balance, or `None` when the row holds less than
    /// `amount` (nothing is written in that case).
    fn debit(&mut self, id: &AccountId, amount: i64) -> StoreResult<Option<i64>>;

    /// Atomically increment a balance and return the new value
    fn credit(&mut self, id: &AccountId, amount: i64) -> StoreResult<i64>;

    fn commit(self: Box<Self>) -> StoreResult<()>;

    fn abort(self: Box<Self>) -> StoreResult<()>;
}
