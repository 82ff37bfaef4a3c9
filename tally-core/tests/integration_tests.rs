//! Integration tests for the ledger against a real DuckDB database
//!
//! Run with: cargo test --test integration_tests

use std::sync::Arc;

use proptest::prelude::*;
use tempfile::TempDir;

use tally_core::adapters::duckdb::DuckDbStore;
use tally_core::config::Config;
use tally_core::ports::AccountStore;
use tally_core::services::{BalanceService, RetryPolicy, StartingBalance, TransferService};
use tally_core::{Account, AccountId, ErrorResponse, TallyContext, TransferError, TransferResponse};

/// Helper to create a file-backed context in a temp directory
fn create_test_context(temp_dir: &TempDir) -> TallyContext {
    TallyContext::new(temp_dir.path()).unwrap()
}

fn open(ctx: &TallyContext, balance: i64) -> AccountId {
    ctx.account_service
        .open_account(None, StartingBalance::Amount(balance))
        .unwrap()
        .id
}

fn balance_of(ctx: &TallyContext, id: &AccountId) -> i64 {
    ctx.balance_service.get_balance(id).unwrap().balance
}

// ==================== Transfer outcomes ====================

#[test]
fn test_transfer_happy_path() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let alice = open(&ctx, 10_000);
    let bob = open(&ctx, 500);

    let receipt = ctx.transfer_service.transfer(&alice, &bob, 2_550).unwrap();
    assert_eq!(receipt.applied_amount, 2_550);
    assert_eq!(receipt.resulting_actor_balance, 7_450);

    // Read-after-commit reflects both legs
    assert_eq!(balance_of(&ctx, &alice), 7_450);
    assert_eq!(balance_of(&ctx, &bob), 3_050);

    let response = TransferResponse::from(&receipt);
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["message"], "Transfer successful");
    assert_eq!(json["amount"], "25.50");
    assert_eq!(json["newBalance"], "74.50");
}

#[test]
fn test_boundary_amounts() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let alice = open(&ctx, 100);
    let bob = open(&ctx, 0);

    assert_eq!(
        ctx.transfer_service.transfer(&alice, &bob, 0).unwrap_err(),
        TransferError::InvalidAmount
    );
    assert_eq!(
        ctx.transfer_service.transfer(&alice, &bob, -5).unwrap_err(),
        TransferError::InvalidAmount
    );

    // Exact balance drains the sender to zero
    let receipt = ctx.transfer_service.transfer(&alice, &bob, 100).unwrap();
    assert_eq!(receipt.resulting_actor_balance, 0);
    assert_eq!(balance_of(&ctx, &alice), 0);
    assert_eq!(balance_of(&ctx, &bob), 100);

    // A drained account cannot send even the smallest unit
    assert_eq!(
        ctx.transfer_service.transfer(&alice, &bob, 1).unwrap_err(),
        TransferError::InsufficientFunds { current_balance: 0 }
    );
}

#[test]
fn test_self_transfer_is_rejected_and_unchanged() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let alice = open(&ctx, 100);

    let err = ctx.transfer_service.transfer(&alice, &alice, 50).unwrap_err();
    assert_eq!(err, TransferError::SelfTransferRejected);
    assert_eq!(err.http_status(), 400);
    assert_eq!(balance_of(&ctx, &alice), 100);
}

#[test]
fn test_not_found_errors() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let alice = open(&ctx, 100);
    let ghost = AccountId::random();

    let err = ctx.transfer_service.transfer(&ghost, &alice, 10).unwrap_err();
    assert_eq!(err, TransferError::ActorAccountNotFound);
    assert_eq!(err.http_status(), 404);

    let err = ctx.transfer_service.transfer(&alice, &ghost, 10).unwrap_err();
    assert_eq!(err, TransferError::RecipientAccountNotFound);
    assert_eq!(err.http_status(), 404);

    assert_eq!(balance_of(&ctx, &alice), 100);
}

#[test]
fn test_insufficient_funds_response_body() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let alice = open(&ctx, 1_234);
    let bob = open(&ctx, 0);

    let err = ctx.transfer_service.transfer(&alice, &bob, 5_000).unwrap_err();
    assert_eq!(err.http_status(), 400);

    let body = serde_json::to_value(ErrorResponse::from(&err)).unwrap();
    assert_eq!(body["message"], "Insufficient balance");
    assert_eq!(body["code"], "INSUFFICIENT_FUNDS");
    assert_eq!(body["currentBalance"], "12.34");

    assert_eq!(balance_of(&ctx, &alice), 1_234);
    assert_eq!(balance_of(&ctx, &bob), 0);
}

#[test]
fn test_raw_transfer_input() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let alice = open(&ctx, 5_000);
    let bob = open(&ctx, 0);
    let bob_text = bob.to_string();

    assert_eq!(
        ctx.transfer_service
            .transfer_raw(&alice, None, None)
            .unwrap_err(),
        TransferError::InvalidAmount
    );
    assert_eq!(
        ctx.transfer_service
            .transfer_raw(&alice, Some("bob"), Some("100"))
            .unwrap_err(),
        TransferError::InvalidRecipient
    );

    let receipt = ctx
        .transfer_service
        .transfer_raw(&alice, Some(&bob_text), Some("1"))
        .unwrap();
    assert_eq!(receipt.applied_amount, 1);
    assert_eq!(balance_of(&ctx, &bob), 1);
}

// ==================== Persistence ====================

#[test]
fn test_balances_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let (alice, bob) = {
        let ctx = create_test_context(&temp_dir);
        let alice = open(&ctx, 900);
        let bob = open(&ctx, 100);
        ctx.transfer_service.transfer(&alice, &bob, 400).unwrap();
        (alice, bob)
    };

    // Open and close the database several times
    for _ in 0..3 {
        let ctx = create_test_context(&temp_dir);
        assert_eq!(balance_of(&ctx, &alice), 500);
        assert_eq!(balance_of(&ctx, &bob), 500);
        assert!(ctx.store.pending_migrations().unwrap().is_empty());
    }
}

#[test]
fn test_settings_file_is_honoured() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join("settings.json"),
        r#"{"database": {"file": "ledger.duckdb"}}"#,
    )
    .unwrap();

    let ctx = create_test_context(&temp_dir);
    open(&ctx, 1);
    assert!(temp_dir.path().join("ledger.duckdb").exists());
    assert!(!temp_dir.path().join("tally.duckdb").exists());
}

#[test]
fn test_doctor_on_healthy_ledger() {
    let ctx = TallyContext::in_memory(Config::default()).unwrap();
    let alice = open(&ctx, 700);
    let bob = open(&ctx, 300);
    ctx.transfer_service.transfer(&alice, &bob, 250).unwrap();

    let result = ctx.doctor_service.run_checks().unwrap();
    assert_eq!(result.summary.errors, 0);
    assert_eq!(result.summary.warnings, 0);
    assert_eq!(result.checks["total_supply"].message, "Total supply is 10.00");
}

#[test]
fn test_duplicate_account_id() {
    let ctx = TallyContext::in_memory(Config::default()).unwrap();
    let id = AccountId::random();
    ctx.account_service
        .open_account(Some(id), StartingBalance::Random)
        .unwrap();

    let err = ctx
        .account_service
        .open_account(Some(id), StartingBalance::Amount(1))
        .unwrap_err();
    assert_eq!(err.code(), "ACCOUNT_ALREADY_EXISTS");
}

// ==================== Conservation property ====================

fn seeded_store(balances: &[i64]) -> (Arc<DuckDbStore>, Vec<AccountId>) {
    let store = Arc::new(DuckDbStore::open_in_memory().unwrap());
    store.ensure_schema().unwrap();
    let ids = balances
        .iter()
        .map(|balance| {
            let account = Account::new(AccountId::random(), *balance);
            store.insert_account(&account).unwrap();
            account.id
        })
        .collect();
    (store, ids)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Any sequence of transfers, successful or not, preserves the total and
    /// never drives a balance negative. Each outcome matches a simple model.
    #[test]
    fn prop_transfers_conserve_money(
        balances in prop::collection::vec(0i64..5_000, 2..5),
        ops in prop::collection::vec((0usize..5, 0usize..5, -10i64..6_000), 1..20),
    ) {
        let (store, ids) = seeded_store(&balances);
        let service = TransferService::new(store.clone()).with_policy(RetryPolicy::none());
        let reader = BalanceService::new(store.clone());
        let mut model = balances.clone();

        for (from, to, amount) in ops {
            let (from, to) = (from % ids.len(), to % ids.len());
            let result = service.transfer(&ids[from], &ids[to], amount);

            if amount <= 0 {
                prop_assert_eq!(result, Err(TransferError::InvalidAmount));
            } else if from == to {
                prop_assert_eq!(result, Err(TransferError::SelfTransferRejected));
            } else if model[from] < amount {
                prop_assert_eq!(
                    result,
                    Err(TransferError::InsufficientFunds { current_balance: model[from] })
                );
            } else {
                let receipt = result.unwrap();
                model[from] -= amount;
                model[to] += amount;
                prop_assert_eq!(receipt.resulting_actor_balance, model[from]);
            }
        }

        let summary = store.summary().unwrap();
        prop_assert_eq!(summary.total_balance, balances.iter().sum::<i64>());
        prop_assert!(summary.negative_accounts.is_empty());
        for (id, expected) in ids.iter().zip(&model) {
            prop_assert_eq!(reader.get_balance(id).unwrap().balance, *expected);
        }
    }
}
