//! Core domain entities
//!
//! Pure data structures with validation logic - no I/O or external
//! dependencies.

mod account;
pub mod money;
pub mod result;
mod transfer;

pub use account::{Account, AccountId};
pub use transfer::{ErrorResponse, TransferError, TransferReceipt, TransferResponse};
