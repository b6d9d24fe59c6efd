//! Operator CLI for reservations and inventory
//!
//! Prints one JSON document per command on stdout; logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use ticketing_core::common::{EventId, TicketingError, TransactionId};
use ticketing_core::config::Config;
use ticketing_core::domains::catalog::activities::recount_inventory;
use ticketing_core::domains::waitlist::activities::{expire_offer, expire_reservations};
use ticketing_core::kernel::{ServerDeps, WaitlistPolicy};

#[derive(Parser)]
#[command(name = "reservations_cli")]
#[command(about = "Reservation and inventory maintenance")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Expire every overdue offer and re-offer the seats
    Sweep,

    /// Expire one pending offer now
    Expire { transaction_id: TransactionId },

    /// Rebuild sold counters of an event from its tickets
    Recount { event_id: EventId },
}

#[derive(Serialize)]
struct Response<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<T>,
}

fn output<T: Serialize>(outcome: Result<T, TicketingError>) -> Result<()> {
    let response = match outcome {
        Ok(result) => Response {
            success: true,
            code: None,
            message: None,
            result: Some(result),
        },
        Err(e) => Response {
            success: false,
            code: Some(e.kind().code()),
            message: Some(e.to_string()),
            result: None,
        },
    };

    println!(
        "{}",
        serde_json::to_string(&response).context("Failed to encode response")?
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,ticketing_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let deps = get_deps().await?;

    match cli.command {
        Commands::Sweep => output(expire_reservations(&deps).await),
        Commands::Expire { transaction_id } => output(expire_offer(transaction_id, &deps).await),
        Commands::Recount { event_id } => output(recount_inventory(event_id, &deps).await),
    }
}

async fn get_deps() -> Result<ServerDeps> {
    let config = Config::from_env()?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    Ok(ServerDeps::new(pool, WaitlistPolicy::from_config(&config)))
}
