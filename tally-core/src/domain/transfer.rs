//! Transfer domain types
//!
//! Error kinds carry a stable machine code and an HTTP status suggestion so an
//! outer surface can map outcomes without inspecting messages.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::account::AccountId;
use super::money::to_major;

/// Outcome of a committed transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub transfer_id: Uuid,
    pub actor: AccountId,
    pub recipient: AccountId,
    /// Amount moved, in minor units
    pub applied_amount: i64,
    /// Actor balance after the debit, in minor units
    pub resulting_actor_balance: i64,
    /// Number of scopes opened before the commit succeeded
    pub attempts: u32,
}

/// Transfer error kinds
///
/// Messages are stable and never include storage error text. Only
/// `InsufficientFunds` reveals a balance.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    // === Caller input ===
    #[error("Invalid amount")]
    InvalidAmount,

    #[error("Invalid recipient")]
    InvalidRecipient,

    #[error("Cannot transfer to yourself")]
    SelfTransferRejected,

    // === Account state ===
    #[error("Sender account not found")]
    ActorAccountNotFound,

    #[error("Recipient account not found")]
    RecipientAccountNotFound,

    #[error("Insufficient balance")]
    InsufficientFunds { current_balance: i64 },

    // === Storage ===
    #[error("Transfer could not be completed due to concurrent activity")]
    TransferConflict { attempts: u32 },

    #[error("Transfer timed out")]
    TransferTimeout,

    #[error("Storage unavailable")]
    StorageUnavailable { detail: String },
}

impl TransferError {
    /// Machine-checkable error code
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::InvalidAmount => "INVALID_AMOUNT",
            TransferError::InvalidRecipient => "INVALID_RECIPIENT",
            TransferError::SelfTransferRejected => "SELF_TRANSFER_REJECTED",
            TransferError::ActorAccountNotFound => "ACTOR_ACCOUNT_NOT_FOUND",
            TransferError::RecipientAccountNotFound => "RECIPIENT_ACCOUNT_NOT_FOUND",
            TransferError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            TransferError::TransferConflict { .. } => "TRANSFER_CONFLICT",
            TransferError::TransferTimeout => "TRANSFER_TIMEOUT",
            TransferError::StorageUnavailable { .. } => "STORAGE_UNAVAILABLE",
        }
    }

    /// HTTP status suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            TransferError::InvalidAmount
            | TransferError::InvalidRecipient
            | TransferError::SelfTransferRejected
            | TransferError::InsufficientFunds { .. } => 400,
            TransferError::ActorAccountNotFound | TransferError::RecipientAccountNotFound => 404,
            TransferError::TransferConflict { .. }
            | TransferError::TransferTimeout
            | TransferError::StorageUnavailable { .. } => 500,
        }
    }

    /// Whether the engine may open a fresh scope and try again
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransferError::TransferConflict { .. })
    }

    pub(crate) fn storage(detail: impl Into<String>) -> Self {
        TransferError::StorageUnavailable {
            detail: detail.into(),
        }
    }
}

/// Success body: `{message, amount, newBalance}`, amounts in major units
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResponse {
    pub message: String,
    pub transfer_id: Uuid,
    pub amount: Decimal,
    pub new_balance: Decimal,
}

impl From<&TransferReceipt> for TransferResponse {
    fn from(receipt: &TransferReceipt) -> Self {
        Self {
            message: "Transfer successful".to_string(),
            transfer_id: receipt.transfer_id,
            amount: to_major(receipt.applied_amount),
            new_balance: to_major(receipt.resulting_actor_balance),
        }
    }
}

/// Failure body: `{message, code, currentBalance?}`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub message: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_balance: Option<Decimal>,
}

impl From<&TransferError> for ErrorResponse {
    fn from(err: &TransferError) -> Self {
        let current_balance = match err {
            TransferError::InsufficientFunds { current_balance } => Some(to_major(*current_balance)),
            _ => None,
        };
        Self {
            message: err.to_string(),
            code: err.code(),
            current_balance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(TransferError::InvalidAmount.code(), "INVALID_AMOUNT");
        assert_eq!(
            TransferError::SelfTransferRejected.code(),
            "SELF_TRANSFER_REJECTED"
        );
        assert_eq!(
            TransferError::InsufficientFunds { current_balance: 1 }.code(),
            "INSUFFICIENT_FUNDS"
        );
        assert_eq!(
            TransferError::TransferConflict { attempts: 3 }.code(),
            "TRANSFER_CONFLICT"
        );
    }

    #[test]
    fn test_http_status() {
        assert_eq!(TransferError::InvalidAmount.http_status(), 400);
        assert_eq!(TransferError::InvalidRecipient.http_status(), 400);
        assert_eq!(TransferError::SelfTransferRejected.http_status(), 400);
        assert_eq!(TransferError::ActorAccountNotFound.http_status(), 404);
        assert_eq!(TransferError::RecipientAccountNotFound.http_status(), 404);
        assert_eq!(
            TransferError::InsufficientFunds { current_balance: 0 }.http_status(),
            400
        );
        assert_eq!(TransferError::TransferTimeout.http_status(), 500);
        assert_eq!(TransferError::storage("boom").http_status(), 500);
    }

    #[test]
    fn test_only_conflicts_are_retryable() {
        assert!(TransferError::TransferConflict { attempts: 1 }.is_retryable());
        assert!(!TransferError::TransferTimeout.is_retryable());
        assert!(!TransferError::InsufficientFunds { current_balance: 5 }.is_retryable());
        assert!(!TransferError::storage("io").is_retryable());
    }

    #[test]
    fn test_storage_detail_is_not_displayed() {
        let err = TransferError::storage("IO Error: disk /var/lib/tally full");
        assert_eq!(err.to_string(), "Storage unavailable");

        let body = ErrorResponse::from(&err);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["message"], "Storage unavailable");
        assert_eq!(json["code"], "STORAGE_UNAVAILABLE");
        assert!(json.get("currentBalance").is_none());
    }

    #[test]
    fn test_insufficient_funds_body_carries_balance() {
        let err = TransferError::InsufficientFunds {
            current_balance: 1234,
        };
        let body = ErrorResponse::from(&err);
        assert_eq!(body.current_balance, Some(Decimal::new(1234, 2)));
        assert_eq!(body.message, "Insufficient balance");
    }

    #[test]
    fn test_success_body_in_major_units() {
        let receipt = TransferReceipt {
            transfer_id: Uuid::new_v4(),
            actor: AccountId::random(),
            recipient: AccountId::random(),
            applied_amount: 250,
            resulting_actor_balance: 9750,
            attempts: 1,
        };
        let body = TransferResponse::from(&receipt);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["message"], "Transfer successful");
        assert_eq!(json["amount"], "2.50");
        assert_eq!(json["newBalance"], "97.50");
    }
}
