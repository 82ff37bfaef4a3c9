//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case.

mod account;
mod balance;
mod doctor;
pub mod migration;
mod retry;
mod transfer;

pub use account::{AccountService, StartingBalance, RANDOM_STARTING_BALANCE};
pub use balance::{AccountBalance, BalanceService};
pub use doctor::{CheckResult, DoctorResult, DoctorService, DoctorSummary};
pub use migration::{MigrationResult, MigrationService};
pub use retry::RetryPolicy;
pub use transfer::{TransferService, DEFAULT_SCOPE_TIMEOUT};
