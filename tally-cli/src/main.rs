//! Tally CLI - a minimal ledger in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{account, balance, doctor, transfer};

/// Tally - a minimal ledger with atomic transfers
#[derive(Parser)]
#[command(name = "tally", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage accounts
    Account {
        #[command(subcommand)]
        command: account::AccountCommands,
    },

    /// Show the balance of an account
    Balance {
        /// Account ID
        account_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Transfer funds between two accounts
    Transfer {
        /// Sending account ID
        #[arg(long)]
        from: String,
        /// Receiving account ID
        #[arg(long)]
        to: String,
        /// Amount in minor units, e.g. 1234
        #[arg(long, allow_hyphen_values = true)]
        amount: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run ledger health checks
    Doctor {
        /// Show verbose output
        #[arg(long, short)]
        verbose: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    commands::init_logging();

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Account { command } => account::run(command),
        Commands::Balance { account_id, json } => balance::run(&account_id, json),
        Commands::Transfer { from, to, amount, yes, json } => {
            transfer::run(&from, &to, &amount, yes, json)
        }
        Commands::Doctor { verbose, json } => doctor::run(verbose, json),
    }
}
