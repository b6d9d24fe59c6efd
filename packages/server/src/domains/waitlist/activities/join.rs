//! Joining an event's waitlist.

use serde::Serialize;
use tracing::info;

use super::offers::{extend_offer, Offer, Recipient};
use crate::common::{EventId, TicketingError, TicketingResult, UserId};
use crate::domains::catalog::models::{Event, TicketType};
use crate::domains::tickets::models::Ticket;
use crate::domains::users::User;
use crate::domains::waitlist::models::WaitlistEntry;
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JoinOutcome {
    /// Queued behind earlier entries.
    Enqueued {
        entry: WaitlistEntry,
        position: i64,
    },
    /// A returned seat was free, so the offer was made on the spot.
    ImmediateOffer { entry: WaitlistEntry, offer: Offer },
}

impl JoinOutcome {
    pub fn entry(&self) -> &WaitlistEntry {
        match self {
            JoinOutcome::Enqueued { entry, .. } | JoinOutcome::ImmediateOffer { entry, .. } => {
                entry
            }
        }
    }

    pub fn ticket_offered(&self) -> bool {
        matches!(self, JoinOutcome::ImmediateOffer { .. })
    }
}

/// Join the waitlist of a sold-out event.
///
/// When a returned seat is sitting unassigned the queue is skipped and the
/// caller receives a reserved ticket right away.
pub async fn join_waitlist(
    event_id: EventId,
    user_id: UserId,
    deps: &ServerDeps,
) -> TicketingResult<JoinOutcome> {
    let mut tx = deps.db_pool.begin().await?;

    Event::find_by_id(event_id, &mut *tx)
        .await?
        .ok_or_else(|| TicketingError::not_found("Event", event_id))?;

    if !User::exists(user_id, &mut *tx).await? {
        return Err(TicketingError::not_found("User", user_id));
    }

    let inventory = TicketType::event_inventory(event_id, &mut *tx).await?;
    if !inventory.is_sold_out() {
        return Err(TicketingError::NotSoldOut(event_id));
    }

    if WaitlistEntry::lock_by_user_and_event(user_id, event_id, &mut tx)
        .await?
        .is_some()
    {
        return Err(TicketingError::Conflict(
            "User is already on the waitlist for this event".into(),
        ));
    }

    let outcome =
        match Ticket::claim_unassigned_return(event_id, None, Some(user_id), &mut tx).await? {
            Some(seat) => {
                let (entry, offer) =
                    extend_offer(&seat, Recipient::Joining(user_id), &deps.policy, &mut tx)
                        .await?;
                JoinOutcome::ImmediateOffer { entry, offer }
            }
            None => {
                let entry = WaitlistEntry::insert_waiting(user_id, event_id, &mut tx)
                    .await
                    .map_err(|e| {
                        TicketingError::conflict_on_unique(
                            e,
                            "User is already on the waitlist for this event",
                        )
                    })?;
                let position = entry.position(&mut *tx).await?;
                JoinOutcome::Enqueued { entry, position }
            }
        };

    tx.commit().await?;

    match &outcome {
        JoinOutcome::Enqueued { position, .. } => {
            info!(event_id = %event_id, user_id = %user_id, position, "Joined waitlist");
        }
        JoinOutcome::ImmediateOffer { offer, .. } => {
            info!(
                event_id = %event_id,
                user_id = %user_id,
                transaction_id = %offer.transaction_id,
                "Joined waitlist with immediate offer"
            );
        }
    }

    Ok(outcome)
}
