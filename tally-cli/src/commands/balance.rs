//! Balance command - read one account's committed balance

use anyhow::Result;
use colored::Colorize;
use comfy_table::Cell;
use serde_json::json;

use super::{get_context, parse_account_id};
use crate::output;

pub fn run(account_id: &str, json: bool) -> Result<()> {
    let id = parse_account_id(account_id)?;
    let ctx = get_context()?;
    let balance = ctx.balance_service.get_balance(&id)?;

    if json {
        let body = json!({
            "accountId": balance.account_id,
            "balance": balance.major(),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Account", "Balance"]);
    table.add_row(vec![
        Cell::new(balance.account_id.to_string()),
        Cell::new(output::format_amount(balance.major())),
    ]);

    println!("{}", "Account Balance".bold());
    println!("{}", table);

    Ok(())
}
