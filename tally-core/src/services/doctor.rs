//! Doctor service - ledger health checks

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use crate::adapters::duckdb::DuckDbStore;
use crate::domain::money::format_minor;
use crate::domain::result::Result;
use crate::ports::AccountStore;

/// Doctor service for health checks
pub struct DoctorService {
    store: Arc<DuckDbStore>,
}

impl DoctorService {
    pub fn new(store: Arc<DuckDbStore>) -> Self {
        Self { store }
    }

    /// Run all health checks
    pub fn run_checks(&self) -> Result<DoctorResult> {
        let mut checks = HashMap::new();

        // Schema version
        let pending = self.store.pending_migrations()?;
        checks.insert(
            "schema_migrations".to_string(),
            CheckResult {
                status: if pending.is_empty() { "pass" } else { "warning" }.to_string(),
                message: if pending.is_empty() {
                    "Schema is up to date".to_string()
                } else {
                    format!("{} migration(s) not applied", pending.len())
                },
                details: if pending.is_empty() {
                    None
                } else {
                    Some(pending.iter().map(|name| json!({ "migration": name })).collect())
                },
            },
        );

        let summary = self.store.summary()?;

        // Accounts
        checks.insert(
            "accounts".to_string(),
            CheckResult {
                status: "pass".to_string(),
                message: format!("{} account(s) in ledger", summary.account_count),
                details: None,
            },
        );

        // Total supply - transfers conserve it, so it only moves with provisioning
        checks.insert(
            "total_supply".to_string(),
            CheckResult {
                status: if summary.total_balance >= 0 { "pass" } else { "error" }.to_string(),
                message: format!("Total supply is {}", format_minor(summary.total_balance)),
                details: Some(vec![json!({
                    "total_minor_units": summary.total_balance,
                    "account_count": summary.account_count
                })]),
            },
        );

        // Negative balances
        let negative = &summary.negative_accounts;
        checks.insert(
            "negative_balances".to_string(),
            CheckResult {
                status: if negative.is_empty() { "pass" } else { "error" }.to_string(),
                message: if negative.is_empty() {
                    "No account is overdrawn".to_string()
                } else {
                    format!("{} account(s) have a negative balance", negative.len())
                },
                details: if negative.is_empty() {
                    None
                } else {
                    Some(
                        negative
                            .iter()
                            .map(|id| json!({ "account_id": id.to_string() }))
                            .collect(),
                    )
                },
            },
        );

        // Calculate summary
        let passed = checks.values().filter(|c| c.status == "pass").count() as i64;
        let warnings = checks.values().filter(|c| c.status == "warning").count() as i64;
        let errors = checks.values().filter(|c| c.status == "error").count() as i64;

        Ok(DoctorResult {
            checks,
            summary: DoctorSummary {
                passed,
                warnings,
                errors,
            },
        })
    }
}

#[derive(Debug, Serialize)]
pub struct DoctorResult {
    pub checks: HashMap<String, CheckResult>,
    pub summary: DoctorSummary,
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
pub struct DoctorSummary {
    pub passed: i64,
    pub warnings: i64,
    pub errors: i64,
}
