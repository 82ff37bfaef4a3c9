//! Account command - provision ledger accounts

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;
use serde_json::json;
use tally_core::domain::money::{format_minor, parse_minor, to_major};
use tally_core::services::StartingBalance;

use super::{get_context, parse_account_id};
use crate::output;

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open a new account
    Open {
        /// Account ID (generated when omitted)
        #[arg(long)]
        id: Option<String>,
        /// Starting balance in minor units, e.g. 1234 (random when omitted)
        #[arg(long, conflicts_with = "random")]
        balance: Option<String>,
        /// Use a random starting balance between 1 and 10000 minor units
        #[arg(long)]
        random: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: AccountCommands) -> Result<()> {
    match command {
        AccountCommands::Open { id, balance, random, json } => {
            open(id.as_deref(), balance.as_deref(), random, json)
        }
    }
}

fn open(id: Option<&str>, balance: Option<&str>, random: bool, json: bool) -> Result<()> {
    let id = id.map(parse_account_id).transpose()?;

    let starting_balance = match balance {
        Some(raw) if !random => match parse_minor(raw) {
            Some(minor) if minor >= 0 => StartingBalance::Amount(minor),
            _ => bail!("Invalid balance: {}", raw),
        },
        _ => StartingBalance::Random,
    };

    let ctx = get_context()?;
    let account = ctx.account_service.open_account(id, starting_balance)?;

    if json {
        let body = json!({
            "accountId": account.id,
            "balance": to_major(account.balance),
            "createdAt": account.created_at,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    output::success("Account opened");
    println!("  {} {}", "ID:".dimmed(), account.id);
    println!("  {} {}", "Balance:".dimmed(), format_minor(account.balance));

    Ok(())
}
