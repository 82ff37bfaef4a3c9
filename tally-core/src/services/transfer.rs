//! Transfer service - atomic balance transfer between two accounts
//!
//! One transfer is one store scope: read the actor, check funds, read the
//! recipient, apply a conditional debit and a credit, commit. Any failure
//! aborts the scope so neither leg is persisted. Write-write conflicts with
//! concurrent scopes are retried from a fresh snapshot under a
//! [`RetryPolicy`]; every other failure surfaces immediately.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::domain::money::parse_minor;
use crate::domain::{AccountId, TransferError, TransferReceipt};
use crate::ports::{AccountStore, StoreError, StoreScope};
use crate::services::RetryPolicy;

/// Default scope lifetime
pub const DEFAULT_SCOPE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Service for moving funds between accounts
pub struct TransferService {
    store: Arc<dyn AccountStore>,
    policy: RetryPolicy,
    scope_timeout: Duration,
}

impl TransferService {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self {
            store,
            policy: RetryPolicy::default(),
            scope_timeout: DEFAULT_SCOPE_TIMEOUT,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Bound the lifetime of each scope; a scope still open at the deadline
    /// is aborted and the transfer fails with `TransferTimeout`
    pub fn with_scope_timeout(mut self, timeout: Duration) -> Self {
        self.scope_timeout = timeout;
        self
    }

    /// Transfer from untyped input
    ///
    /// `amount` is an integer count of minor units, the unit balances are
    /// held in (`"1234"`). Validation runs in the same
    /// order as [`TransferService::transfer`]: amount, recipient, then
    /// self-transfer.
    pub fn transfer_raw(
        &self,
        actor: &AccountId,
        recipient: Option<&str>,
        amount: Option<&str>,
    ) -> Result<TransferReceipt, TransferError> {
        let amount = amount
            .and_then(parse_minor)
            .filter(|minor| *minor > 0)
            .ok_or(TransferError::InvalidAmount)?;

        let recipient = recipient
            .and_then(|raw| raw.parse::<AccountId>().ok())
            .ok_or(TransferError::InvalidRecipient)?;

        self.transfer(actor, &recipient, amount)
    }

    /// Move `amount` minor units from `actor` to `recipient`
    ///
    /// The actor id is trusted as already authenticated.
    pub fn transfer(
        &self,
        actor: &AccountId,
        recipient: &AccountId,
        amount: i64,
    ) -> Result<TransferReceipt, TransferError> {
        if amount <= 0 {
            return Err(TransferError::InvalidAmount);
        }
        if actor == recipient {
            return Err(TransferError::SelfTransferRejected);
        }

        let transfer_id = Uuid::new_v4();
        let span = info_span!("transfer", %transfer_id, %actor, %recipient);
        let _enter = span.enter();

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let deadline = Instant::now() + self.scope_timeout;

            match self.run_scope(actor, recipient, amount, deadline, attempt) {
                Ok(resulting_actor_balance) => {
                    info!(attempt, "transfer committed");
                    return Ok(TransferReceipt {
                        transfer_id,
                        actor: *actor,
                        recipient: *recipient,
                        applied_amount: amount,
                        resulting_actor_balance,
                        attempts: attempt,
                    });
                }
                Err(e) if e.is_retryable() && self.policy.should_retry(attempt) => {
                    let backoff = self.policy.delay_for(attempt);
                    debug!(
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "scope conflicted, retrying"
                    );
                    thread::sleep(backoff);
                }
                Err(e) => {
                    match &e {
                        TransferError::StorageUnavailable { detail } => {
                            warn!(attempt, code = e.code(), error = %detail, "transfer failed")
                        }
                        TransferError::TransferConflict { .. } | TransferError::TransferTimeout => {
                            warn!(attempt, code = e.code(), "transfer failed")
                        }
                        _ => info!(attempt, code = e.code(), "transfer rejected"),
                    }
                    return Err(e);
                }
            }
        }
    }

    /// One scope from begin to commit or abort
    fn run_scope(
        &self,
        actor: &AccountId,
        recipient: &AccountId,
        amount: i64,
        deadline: Instant,
        attempt: u32,
    ) -> Result<i64, TransferError> {
        let classify = |e: StoreError| classify_store_error(e, attempt);

        let mut scope = self.store.begin().map_err(classify)?;

        let outcome = apply_legs(scope.as_mut(), actor, recipient, amount, deadline, attempt)
            .and_then(|balance| check_deadline(deadline).map(|_| balance));

        match outcome {
            Ok(balance) => {
                scope.commit().map_err(classify)?;
                Ok(balance)
            }
            Err(e) => {
                if let Err(abort_err) = scope.abort() {
                    warn!(error = %abort_err, "failed to abort scope");
                }
                Err(e)
            }
        }
    }
}

/// Reads, checks and both legs, inside an open scope
fn apply_legs<S: StoreScope + ?Sized>(
    scope: &mut S,
    actor: &AccountId,
    recipient: &AccountId,
    amount: i64,
    deadline: Instant,
    attempt: u32,
) -> Result<i64, TransferError> {
    let classify = |e: StoreError| classify_store_error(e, attempt);

    check_deadline(deadline)?;
    let actor_account = scope
        .read_account(actor)
        .map_err(classify)?
        .ok_or(TransferError::ActorAccountNotFound)?;

    if actor_account.balance < amount {
        return Err(TransferError::InsufficientFunds {
            current_balance: actor_account.balance,
        });
    }

    check_deadline(deadline)?;
    let recipient_account = scope
        .read_account(recipient)
        .map_err(classify)?
        .ok_or(TransferError::RecipientAccountNotFound)?;

    if recipient_account.balance.checked_add(amount).is_none() {
        return Err(TransferError::InvalidAmount);
    }

    check_deadline(deadline)?;
    let resulting_actor_balance = match scope.debit(actor, amount).map_err(classify)? {
        Some(balance) => balance,
        None => {
            // The conditional debit refused: report what the scope sees now.
            let current_balance = scope
                .read_account(actor)
                .map_err(classify)?
                .map(|account| account.balance)
                .unwrap_or(0);
            return Err(TransferError::InsufficientFunds { current_balance });
        }
    };

    check_deadline(deadline)?;
    scope.credit(recipient, amount).map_err(classify)?;

    Ok(resulting_actor_balance)
}

fn check_deadline(deadline: Instant) -> Result<(), TransferError> {
    if Instant::now() >= deadline {
        Err(TransferError::TransferTimeout)
    } else {
        Ok(())
    }
}

fn classify_store_error(err: StoreError, attempt: u32) -> TransferError {
    if err.is_conflict() {
        TransferError::TransferConflict { attempts: attempt }
    } else {
        TransferError::storage(err.to_string())
    }
}
