//! DuckDB account store
//!
//! Each transactional scope runs on its own connection cloned from the
//! primary one, so concurrent transfers are isolated by DuckDB's MVCC rather
//! than by a process-wide lock. Two scopes that write the same row cannot both
//! commit: the later writer fails with a conflict error, which is surfaced as
//! [`StoreError::Conflict`].

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::{params, Connection};
use tracing::{debug, warn};

use crate::domain::{Account, AccountId};
use crate::ports::{AccountStore, LedgerSummary, StoreError, StoreResult, StoreScope};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of attempts when the database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const ACCOUNT_COLUMNS: &str =
    "account_id, balance, CAST(created_at AS VARCHAR), CAST(updated_at AS VARCHAR)";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_open_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
        || lower.contains("could not set lock on file")
}

/// Check if an error message reports a write-write conflict between transactions
fn is_conflict_error(err_msg: &str) -> bool {
    err_msg.to_lowercase().contains("conflict")
}

fn is_duplicate_key_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("duplicate key") || lower.contains("violates primary key")
}

/// Classify a DuckDB error for the store contract
pub(crate) fn map_duckdb_error(err: duckdb::Error) -> StoreError {
    let msg = err.to_string();
    if is_conflict_error(&msg) {
        StoreError::Conflict(msg)
    } else {
        StoreError::Unavailable(msg)
    }
}

/// DuckDB-backed account store
pub struct DuckDbStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbStore {
    /// Open (or create) a database file
    ///
    /// Retries with exponential backoff when the file is locked by another
    /// process, which happens when two CLI invocations start at once.
    pub fn open(db_path: &Path) -> StoreResult<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_open_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        warn!(
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt + 1,
                            max_attempts = MAX_RETRIES,
                            error = %err_msg,
                            "database busy, retrying open"
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(StoreError::Unavailable(err_msg));
                }
            }
        }

        Err(StoreError::Unavailable(
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| format!("failed to open database after {} attempts", MAX_RETRIES)),
        ))
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> StoreResult<Self> {
        let config = duckdb::Config::default()
            .enable_autoload_extension(false)
            .map_err(map_duckdb_error)?;
        let conn = Connection::open_in_memory_with_flags(config).map_err(map_duckdb_error)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> duckdb::Result<Connection> {
        // Extension autoloading stays off: cached extensions in ~/.duckdb may
        // not match the bundled engine.
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Connection::open_with_flags(db_path, config)
    }

    /// Apply pending schema migrations
    pub fn ensure_schema(&self) -> StoreResult<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Names of migrations not yet applied
    pub fn pending_migrations(&self) -> StoreResult<Vec<String>> {
        let conn = self.lock()?;
        MigrationService::new(&conn).get_pending()
    }

    /// Path of the database file, `None` for in-memory stores
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("connection lock poisoned: {}", e)))
    }
}

impl AccountStore for DuckDbStore {
    fn begin(&self) -> StoreResult<Box<dyn StoreScope + '_>> {
        // Hold the primary connection only long enough to clone it.
        let conn = self.lock()?.try_clone().map_err(map_duckdb_error)?;
        conn.execute_batch("BEGIN TRANSACTION")
            .map_err(map_duckdb_error)?;
        Ok(Box::new(DuckDbScope {
            conn,
            finished: false,
        }))
    }

    fn get_account(&self, id: &AccountId) -> StoreResult<Option<Account>> {
        let conn = self.lock()?;
        query_account(&conn, id)
    }

    fn insert_account(&self, account: &Account) -> StoreResult<()> {
        let conn = self.lock()?;
        let result = conn.execute(
            "INSERT INTO accounts (account_id, balance, created_at, updated_at)
             VALUES (?, ?, CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP))",
            params![
                account.id.to_string(),
                account.balance,
                sql_timestamp(&account.created_at),
                sql_timestamp(&account.updated_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key_error(&e.to_string()) => {
                Err(StoreError::AlreadyExists(account.id))
            }
            Err(e) => Err(map_duckdb_error(e)),
        }
    }

    fn summary(&self) -> StoreResult<LedgerSummary> {
        let conn = self.lock()?;

        // SUM over BIGINT yields HUGEINT; narrow it back for the i64 reader.
        let (account_count, total_balance): (i64, i64) = conn
            .query_row(
                "SELECT COUNT(*), CAST(COALESCE(SUM(balance), 0) AS BIGINT) FROM accounts",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(map_duckdb_error)?;

        let mut stmt = conn
            .prepare("SELECT account_id FROM accounts WHERE balance < 0 ORDER BY account_id")
            .map_err(map_duckdb_error)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(map_duckdb_error)?;

        let mut negative_accounts = Vec::new();
        for row in rows {
            let raw = row.map_err(map_duckdb_error)?;
            match raw.parse::<AccountId>() {
                Ok(id) => negative_accounts.push(id),
                Err(_) => warn!(account_id = %raw, "skipping malformed account id"),
            }
        }

        Ok(LedgerSummary {
            account_count,
            total_balance,
            negative_accounts,
        })
    }
}

/// A transaction on a dedicated connection
///
/// Rolled back on drop unless it was committed or aborted explicitly.
pub struct DuckDbScope {
    conn: Connection,
    finished: bool,
}

impl DuckDbScope {
    fn read_balance(&self, id: &AccountId) -> StoreResult<Option<i64>> {
        match self.conn.query_row(
            "SELECT balance FROM accounts WHERE account_id = ?",
            params![id.to_string()],
            |row| row.get::<_, i64>(0),
        ) {
            Ok(balance) => Ok(Some(balance)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(map_duckdb_error(e)),
        }
    }

    fn finish(&mut self, statement: &str) -> StoreResult<()> {
        self.finished = true;
        self.conn
            .execute_batch(statement)
            .map_err(map_duckdb_error)
    }
}

impl StoreScope for DuckDbScope {
    fn read_account(&mut self, id: &AccountId) -> StoreResult<Option<Account>> {
        query_account(&self.conn, id)
    }

    fn debit(&mut self, id: &AccountId, amount: i64) -> StoreResult<Option<i64>> {
        let changed = self
            .conn
            .execute(
                "UPDATE accounts
                 SET balance = balance - ?, updated_at = CAST(? AS TIMESTAMP)
                 WHERE account_id = ? AND balance >= ?",
                params![amount, sql_timestamp(&Utc::now()), id.to_string(), amount],
            )
            .map_err(map_duckdb_error)?;

        match self.read_balance(id)? {
            Some(_) if changed == 0 => Ok(None),
            Some(balance) => Ok(Some(balance)),
            None => Err(StoreError::MissingRow(*id)),
        }
    }

    fn credit(&mut self, id: &AccountId, amount: i64) -> StoreResult<i64> {
        let changed = self
            .conn
            .execute(
                "UPDATE accounts
                 SET balance = balance + ?, updated_at = CAST(? AS TIMESTAMP)
                 WHERE account_id = ?",
                params![amount, sql_timestamp(&Utc::now()), id.to_string()],
            )
            .map_err(map_duckdb_error)?;

        if changed == 0 {
            return Err(StoreError::MissingRow(*id));
        }
        self.read_balance(id)?.ok_or(StoreError::MissingRow(*id))
    }

    fn commit(mut self: Box<Self>) -> StoreResult<()> {
        let result = self.finish("COMMIT");
        if result.is_err() {
            // A failed COMMIT can leave the transaction open on some errors.
            let _ = self.conn.execute_batch("ROLLBACK");
        }
        result
    }

    fn abort(mut self: Box<Self>) -> StoreResult<()> {
        self.finish("ROLLBACK")
    }
}

impl Drop for DuckDbScope {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        match self.conn.execute_batch("ROLLBACK") {
            Ok(()) => debug!("rolled back unfinished scope"),
            Err(e) => warn!(error = %e, "failed to roll back unfinished scope"),
        }
    }
}

fn query_account(conn: &Connection, id: &AccountId) -> StoreResult<Option<Account>> {
    let sql = format!("SELECT {} FROM accounts WHERE account_id = ?", ACCOUNT_COLUMNS);
    match conn.query_row(&sql, params![id.to_string()], row_to_account) {
        Ok(account) => Ok(Some(account)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(map_duckdb_error(e)),
    }
}

fn row_to_account(row: &duckdb::Row<'_>) -> duckdb::Result<Account> {
    // Column order follows ACCOUNT_COLUMNS:
    // 0: account_id, 1: balance, 2: created_at, 3: updated_at
    let id_str: String = row.get(0)?;
    let id = id_str.parse::<AccountId>().map_err(|e| {
        duckdb::Error::FromSqlConversionFailure(0, duckdb::types::Type::Text, Box::new(e))
    })?;
    let created_str: String = row.get(2)?;
    let updated_str: String = row.get(3)?;

    Ok(Account {
        id,
        balance: row.get(1)?,
        created_at: parse_timestamp(&created_str),
        updated_at: parse_timestamp(&updated_str),
    })
}

// Helper functions

/// Format a timestamp the way DuckDB parses a `TIMESTAMP` literal
pub(crate) fn sql_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .unwrap_or_else(|_| Utc::now())
}
