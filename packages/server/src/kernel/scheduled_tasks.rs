//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! ```text
//! Scheduler (every 2 minutes by default)
//!     │
//!     └─► expire_reservations()
//!             └─► For each expired offer → tear down → re-offer the seat
//! ```
//!
//! The scheduler is meant to run as a single instance. A second instance only
//! duplicates scans: offers are claimed with `SKIP LOCKED`.

use anyhow::{Context, Result};
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::domains::waitlist::activities::expire_reservations;
use crate::kernel::ServerDeps;

/// Start the reservation sweep on `sweep_cron` (6-field cron expression).
pub async fn start_scheduler(deps: ServerDeps, sweep_cron: &str) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let sweep_job = Job::new_async(sweep_cron, move |_uuid, _lock| {
        let deps = deps.clone();
        Box::pin(async move {
            if let Err(e) = expire_reservations(&deps).await {
                tracing::error!("Reservation sweep failed: {}", e);
            }
        })
    })
    .with_context(|| format!("Invalid reservation sweep schedule: {}", sweep_cron))?;

    scheduler.add(sweep_job).await?;
    scheduler.start().await?;

    tracing::info!(schedule = %sweep_cron, "Scheduled tasks started (reservation sweep)");
    Ok(scheduler)
}
