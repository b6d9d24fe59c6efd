//! Leaving a waitlist.

use serde::Serialize;
use tracing::info;

use super::assign_next::cascade_offers;
use super::offers::{LockedOffer, Offer};
use crate::common::{EventId, TicketingError, TicketingResult, UserId};
use crate::domains::transactions::models::{Transaction, TransactionStatus};
use crate::domains::waitlist::models::{EntryState, WaitlistEntry};
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Serialize)]
pub struct LeftWaitlist {
    pub entry: WaitlistEntry,
    /// The offer given up by leaving, if one was outstanding.
    pub cancelled_transaction: Option<Transaction>,
    pub next_offers: Vec<Offer>,
}

/// Remove a user's entry. An outstanding offer is declined on the way out.
pub async fn leave_waitlist(
    event_id: EventId,
    user_id: UserId,
    deps: &ServerDeps,
) -> TicketingResult<LeftWaitlist> {
    let mut tx = deps.db_pool.begin().await?;

    let entry = WaitlistEntry::lock_by_user_and_event(user_id, event_id, &mut tx)
        .await?
        .ok_or_else(|| {
            TicketingError::not_found("Waitlist entry", format!("{}/{}", event_id, user_id))
        })?;

    let left = match entry.state() {
        EntryState::Waiting => {
            WaitlistEntry::delete(entry.id, &mut tx).await?;
            LeftWaitlist {
                entry,
                cancelled_transaction: None,
                next_offers: Vec::new(),
            }
        }
        EntryState::Offered { .. } => {
            let offer = LockedOffer::lock_for_entry(entry.clone(), &mut tx).await?;
            let ticket_type_id = offer.ticket_type_id();
            let transaction = offer.withdraw(TransactionStatus::Cancelled, &mut tx).await?;
            let next_offers =
                cascade_offers(event_id, Some(ticket_type_id), &deps.policy, &mut tx).await?;
            LeftWaitlist {
                entry,
                cancelled_transaction: Some(transaction),
                next_offers,
            }
        }
    };

    tx.commit().await?;

    info!(
        event_id = %event_id,
        user_id = %user_id,
        had_offer = left.cancelled_transaction.is_some(),
        "Left waitlist"
    );

    Ok(left)
}
