//! Result and error types for the core library

use thiserror::Error;

use super::account::AccountId;
use crate::ports::StoreError;

/// Core library error type
///
/// The transfer engine reports through [`super::TransferError`]; this type
/// covers everything else (balance reads, provisioning, configuration).
#[derive(Error, Debug)]
pub enum Error {
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Account already exists: {0}")]
    AccountAlreadyExists(AccountId),

    #[error("Storage unavailable")]
    StorageUnavailable(#[source] StoreError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Machine-checkable error code
    pub fn code(&self) -> &'static str {
        match self {
            Error::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Error::AccountAlreadyExists(_) => "ACCOUNT_ALREADY_EXISTS",
            Error::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Io(_) => "IO_ERROR",
            Error::Json(_) => "JSON_ERROR",
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists(id) => Error::AccountAlreadyExists(id),
            other => Error::StorageUnavailable(other),
        }
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_are_not_leaked_in_display() {
        let err: Error = StoreError::Unavailable("IO Error: permission denied".into()).into();
        assert_eq!(err.to_string(), "Storage unavailable");
        assert_eq!(err.code(), "STORAGE_UNAVAILABLE");
    }

    #[test]
    fn test_duplicate_maps_to_already_exists() {
        let id = AccountId::random();
        let err: Error = StoreError::AlreadyExists(id).into();
        assert!(matches!(err, Error::AccountAlreadyExists(got) if got == id));
    }

    #[test]
    fn test_constructors() {
        assert!(Error::validation("bad").to_string().contains("Validation error"));
        assert_eq!(Error::config("zero").code(), "CONFIG_ERROR");
    }
}
