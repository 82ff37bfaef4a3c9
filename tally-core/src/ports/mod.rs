//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The services depend
//! only on these traits, not on concrete implementations.

mod account_store;

pub use account_store::{AccountStore, LedgerSummary, StoreError, StoreResult, StoreScope};
