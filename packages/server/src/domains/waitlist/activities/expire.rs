//! Expiring offers nobody answered in time.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info};

use super::assign_next::cascade_offers;
use super::offers::{LockedOffer, Offer};
use crate::common::{TicketingResult, TransactionId, WaitlistEntryId};
use crate::domains::transactions::models::{Transaction, TransactionStatus};
use crate::domains::waitlist::models::WaitlistEntry;
use crate::kernel::ServerDeps;

/// Upper bound on entries handled by one sweep; the rest wait for the next run.
pub const SWEEP_BATCH_SIZE: i64 = 500;

/// Result of one reservation sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Expired entries found by the scan.
    pub examined: usize,
    /// Offers torn down.
    pub expired: usize,
    /// Follow-up offers made by the cascades.
    pub reoffered: usize,
    /// Entries another worker held or had already resolved.
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpiredOffer {
    pub transaction: Transaction,
    pub next_offers: Vec<Offer>,
}

/// Expire every offer whose deadline has passed and re-offer the seats.
///
/// Each entry runs in its own database transaction so one failure does not
/// roll back the others.
pub async fn expire_reservations(deps: &ServerDeps) -> TicketingResult<SweepReport> {
    let now = Utc::now();
    let ids = WaitlistEntry::find_expired_ids(now, SWEEP_BATCH_SIZE, &deps.db_pool).await?;

    let mut report = SweepReport {
        examined: ids.len(),
        ..Default::default()
    };

    for id in ids {
        match expire_entry(id, now, deps).await {
            Ok(Some(expired)) => {
                report.expired += 1;
                report.reoffered += expired.next_offers.len();
            }
            Ok(None) => {
                debug!(entry_id = %id, "Expired entry already claimed, skipping");
                report.skipped += 1;
            }
            Err(e) => {
                error!(entry_id = %id, error = %e, "Failed to expire reservation");
                report.failed += 1;
            }
        }
    }

    if report.examined > 0 {
        info!(
            examined = report.examined,
            expired = report.expired,
            reoffered = report.reoffered,
            skipped = report.skipped,
            failed = report.failed,
            "Reservation sweep completed"
        );
    }

    Ok(report)
}

async fn expire_entry(
    id: WaitlistEntryId,
    now: DateTime<Utc>,
    deps: &ServerDeps,
) -> TicketingResult<Option<ExpiredOffer>> {
    let mut tx = deps.db_pool.begin().await?;

    let Some(entry) = WaitlistEntry::claim_expired(id, now, &mut tx).await? else {
        return Ok(None);
    };

    let offer = LockedOffer::lock_for_entry(entry, &mut tx).await?;
    let expired = tear_down(offer, deps, &mut tx).await?;

    tx.commit().await?;
    Ok(Some(expired))
}

/// Expire one pending offer now, whatever its deadline.
pub async fn expire_offer(
    transaction_id: TransactionId,
    deps: &ServerDeps,
) -> TicketingResult<ExpiredOffer> {
    let mut tx = deps.db_pool.begin().await?;

    let offer = LockedOffer::lock_by_transaction(transaction_id, &mut tx).await?;
    let expired = tear_down(offer, deps, &mut tx).await?;

    tx.commit().await?;

    info!(
        transaction_id = %transaction_id,
        reoffered = expired.next_offers.len(),
        "Offer expired manually"
    );

    Ok(expired)
}

async fn tear_down(
    offer: LockedOffer,
    deps: &ServerDeps,
    conn: &mut sqlx::PgConnection,
) -> TicketingResult<ExpiredOffer> {
    let event_id = offer.event_id();
    let ticket_type_id = offer.ticket_type_id();

    let transaction = offer.withdraw(TransactionStatus::Expired, &mut *conn).await?;
    let next_offers = cascade_offers(event_id, Some(ticket_type_id), &deps.policy, conn).await?;

    Ok(ExpiredOffer {
        transaction,
        next_offers,
    })
}
