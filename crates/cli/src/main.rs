//! OPS cost tracker CLI - the cost sheet from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Unlock (prompts on stdin without an argument)
//! ops-cli unlock 1234
//!
//! # Orders matching a search term
//! ops-cli list --search acme
//!
//! # One order in detail
//! ops-cli show OPS-1042
//!
//! # Set a cost and save the row
//! ops-cli set OPS-1042 dyeing 12500
//!
//! # Dashboard figures
//! ops-cli stats
//!
//! # Lock again
//! ops-cli lock
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::print_stdout)]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ops-cli")]
#[command(author, version, about = "OPS cost tracker CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Unlock with the PIN
    Unlock {
        /// Four-digit PIN (read from stdin if omitted)
        pin: Option<String>,
    },
    /// Clear the unlock flag
    Lock,
    /// List orders with their costs
    List {
        /// Case-insensitive match on OPS number, buyer name or buyer code
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show one order
    Show {
        /// OPS number
        ops_no: String,
    },
    /// Set one cost field and save the row
    Set {
        /// OPS number
        ops_no: String,
        /// Field name (`materialPurchase`, `dyeing`, `weaving`, `finishing`,
        /// `rework`, `packingLabels`, `shipping`)
        field: String,
        /// Amount; currency symbols and separators are ignored
        value: String,
    },
    /// Dashboard figures and category breakdown
    Stats,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Logs go to stderr so command output stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ops_cost_tracker=warn,ops_cli=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Unlock { pin } => commands::gate::unlock(pin).await?,
        Commands::Lock => commands::gate::lock().await?,
        Commands::List { search } => commands::costs::list(search.as_deref()).await?,
        Commands::Show { ops_no } => commands::costs::show(&ops_no).await?,
        Commands::Set {
            ops_no,
            field,
            value,
        } => commands::costs::set(&ops_no, &field, &value).await?,
        Commands::Stats => commands::costs::stats().await?,
    }
    Ok(())
}
