//! Tally Core - a minimal ledger with atomic balance transfers
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core entities (Account, TransferReceipt, errors, money)
//! - **ports**: Trait definitions for external dependencies (AccountStore)
//! - **services**: Business logic orchestration (transfers, balances, doctor)
//! - **adapters**: Concrete implementations (DuckDB)

pub mod domain;
pub mod ports;
pub mod services;
pub mod adapters;
pub mod config;
pub mod logging;
pub mod migrations;

use std::path::Path;
use std::sync::Arc;

use adapters::duckdb::DuckDbStore;
use config::Config;
use domain::result::Result;
use ports::AccountStore;
use services::*;

// Re-export commonly used types at crate root
pub use domain::{Account, AccountId, ErrorResponse, TransferError, TransferReceipt, TransferResponse};
pub use domain::result::Error;

/// Main context for Tally operations
///
/// Owns the store, the configuration and all services. There is no global
/// state: dropping the context closes the database.
pub struct TallyContext {
    pub config: Config,
    pub store: Arc<DuckDbStore>,
    pub transfer_service: TransferService,
    pub balance_service: BalanceService,
    pub account_service: AccountService,
    pub doctor_service: DoctorService,
}

impl TallyContext {
    /// Create a context backed by the database file in `tally_dir`
    ///
    /// On first run a settings.json with the defaults is written. Environment
    /// overrides are never persisted.
    pub fn new(tally_dir: &Path) -> Result<Self> {
        if !tally_dir.join(config::SETTINGS_FILE).exists() {
            Config::load_file(tally_dir)?.save(tally_dir)?;
        }
        let config = Config::load(tally_dir)?;
        let store = Arc::new(DuckDbStore::open(&config.database_path(tally_dir))?);
        Self::with_store(config, store)
    }

    /// Create a context over a private in-memory database
    pub fn in_memory(config: Config) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(DuckDbStore::open_in_memory()?);
        Self::with_store(config, store)
    }

    fn with_store(config: Config, store: Arc<DuckDbStore>) -> Result<Self> {
        // Initialize schema
        store.ensure_schema()?;

        let shared: Arc<dyn AccountStore> = store.clone();
        let transfer_service = TransferService::new(Arc::clone(&shared))
            .with_policy(config.retry_policy())
            .with_scope_timeout(config.scope_timeout());
        let balance_service = BalanceService::new(Arc::clone(&shared));
        let account_service = AccountService::new(shared);
        let doctor_service = DoctorService::new(Arc::clone(&store));

        Ok(Self {
            config,
            store,
            transfer_service,
            balance_service,
            account_service,
            doctor_service,
        })
    }
}
