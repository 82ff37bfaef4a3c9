//! Transfer command - move funds between two accounts

use anyhow::Result;
use colored::Colorize;
use dialoguer::Confirm;
use tally_core::{ErrorResponse, TransferError, TransferResponse};

use super::{get_context, parse_account_id};
use crate::output;

pub fn run(from: &str, to: &str, amount: &str, yes: bool, json: bool) -> Result<()> {
    let actor = parse_account_id(from)?;
    let ctx = get_context()?;

    // Confirm unless --yes, JSON mode or a non-interactive stdin
    if !yes && !json && atty::is(atty::Stream::Stdin) {
        println!(
            "\n{}",
            format!(
                "Transfer {} minor units from {} to {}?",
                amount.trim(),
                actor,
                to.trim()
            ).yellow()
        );

        if !Confirm::new()
            .with_prompt("Proceed?")
            .default(false)
            .interact()?
        {
            println!("{}\n", "Cancelled".dimmed());
            return Ok(());
        }
    }

    match ctx.transfer_service.transfer_raw(&actor, Some(to), Some(amount)) {
        Ok(receipt) => {
            let response = TransferResponse::from(&receipt);
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
                return Ok(());
            }

            output::success(&response.message);
            println!("  {} {}", "Transfer:".dimmed(), response.transfer_id);
            println!("  {} {}", "Amount:".dimmed(), output::format_amount(response.amount));
            println!(
                "  {} {}",
                "New balance:".dimmed(),
                output::format_amount(response.new_balance)
            );
            Ok(())
        }
        Err(err) => {
            report_failure(&err, json)?;
            std::process::exit(exit_code(&err));
        }
    }
}

fn report_failure(err: &TransferError, json: bool) -> Result<()> {
    let response = ErrorResponse::from(err);
    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    match response.current_balance {
        Some(balance) => output::error(&format!(
            "{} (current balance: {})",
            response.message,
            output::format_amount(balance)
        )),
        None => output::error(&response.message),
    }
    if err.is_retryable() || matches!(err, TransferError::TransferTimeout) {
        output::warning("No funds were moved. The transfer can be retried.");
    }
    Ok(())
}

/// Client errors exit with 2, server-side failures with 1
fn exit_code(err: &TransferError) -> i32 {
    if err.http_status() >= 500 {
        1
    } else {
        2
    }
}
