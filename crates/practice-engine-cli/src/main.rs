//! `practice` — scheduling and billing computations from the command line.
//!
//! Two subcommands mirroring the library's cores:
//!
//! - `practice rule` reads a JSON recurrence selection (file or stdin) and
//!   prints the canonical rule string
//! - `practice adjust` recomputes the fee/write-off/adjustment triple for a
//!   billing edit and prints it as JSON

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use practice_engine::{apply_billing_edit, build_rule, BillingEdit, BillingState, BuildRuleRequest};

#[derive(Parser)]
#[command(name = "practice", version, about = "Recurrence rules and billing adjustments")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a recurrence rule string from a JSON selection
    Rule {
        /// Path to the JSON selection; reads stdin when omitted
        input: Option<PathBuf>,
    },
    /// Recompute the billing triple for a fee/write-off edit
    Adjust {
        /// Current fee on the appointment
        #[arg(long)]
        fee: Decimal,
        /// Current write-off on the appointment
        #[arg(long)]
        write_off: Decimal,
        /// Current accumulated adjustment, if any
        #[arg(long)]
        adjustment: Option<Decimal>,
        /// Current service code
        #[arg(long, default_value = "")]
        service_id: String,
        /// Proposed fee
        #[arg(long)]
        new_fee: Decimal,
        /// Proposed write-off
        #[arg(long)]
        new_write_off: Decimal,
        /// Proposed service code
        #[arg(long)]
        new_service_id: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Rule { input } => {
            let text = read_input(input.as_deref())?;
            let request: BuildRuleRequest =
                serde_json::from_str(&text).context("invalid recurrence selection JSON")?;
            let selection = request.to_selection()?;
            println!("{}", build_rule(&selection));
        }
        Command::Adjust {
            fee,
            write_off,
            adjustment,
            service_id,
            new_fee,
            new_write_off,
            new_service_id,
        } => {
            let current = BillingState {
                fee,
                write_off,
                adjustment,
                service_id,
            };
            let edit = BillingEdit {
                fee: new_fee,
                write_off: new_write_off,
                service_id: new_service_id,
            };
            let outcome = apply_billing_edit(&current, &edit);
            let body = serde_json::json!({
                "appointment_fee": outcome.state.fee,
                "write_off": outcome.state.write_off,
                "adjustable_amount": outcome.state.adjustment,
                "service_id": outcome.state.service_id,
                "amounts_changed": outcome.amounts_changed,
                "service_changed": outcome.service_changed,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(())
}

fn read_input(path: Option<&std::path::Path>) -> Result<String> {
    match path {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("cannot read stdin")?;
            Ok(buf)
        }
    }
}
