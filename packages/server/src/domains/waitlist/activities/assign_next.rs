//! Hand returned seats to the front of the queue.

use sqlx::PgConnection;
use tracing::debug;

use super::offers::{extend_offer, Offer, Recipient};
use crate::common::{EventId, TicketTypeId, TicketingResult};
use crate::domains::tickets::models::Ticket;
use crate::domains::waitlist::models::WaitlistEntry;
use crate::kernel::WaitlistPolicy;

/// Offer one unassigned returned seat to the earliest waiting entry.
///
/// The entry is claimed before the seat, matching the lock order of every
/// other offer path. Both claims use `FOR UPDATE SKIP LOCKED`, so concurrent
/// callers never wait on each other and never pick the same rows.
///
/// Nobody is offered a seat they returned themselves. When every free seat
/// belongs to the first waiting user, the next user in line gets one of them
/// and the first keeps their place for the next return.
/// Returns `None` when there is no free seat or nobody eligible is waiting.
pub async fn assign_next(
    event_id: EventId,
    ticket_type_id: Option<TicketTypeId>,
    policy: &WaitlistPolicy,
    conn: &mut PgConnection,
) -> TicketingResult<Option<Offer>> {
    let mut passed_over = None;

    // At most two rounds: a failed round means every free seat is held by
    // that entry's user, so any other user can take one.
    for _ in 0..2 {
        let Some(entry) =
            WaitlistEntry::claim_next_waiting(event_id, passed_over, &mut *conn).await?
        else {
            debug!(event_id = %event_id, "Waitlist is empty");
            return Ok(None);
        };

        let seat = Ticket::claim_unassigned_return(
            event_id,
            ticket_type_id,
            Some(entry.user_id),
            &mut *conn,
        )
        .await?;

        match seat {
            Some(seat) => {
                let (_, offer) =
                    extend_offer(&seat, Recipient::Queued(entry), policy, conn).await?;
                return Ok(Some(offer));
            }
            None if passed_over.is_none() => {
                debug!(
                    event_id = %event_id,
                    user_id = %entry.user_id,
                    "No returned seat for the first waiting user"
                );
                passed_over = Some(entry.user_id);
            }
            None => break,
        }
    }

    debug!(event_id = %event_id, "No unassigned returned seat");
    Ok(None)
}

/// Keep offering freed seats until the queue or the seats run out.
///
/// Iterates instead of recursing; each pass consumes one seat, so the loop is
/// bounded by the number of unassigned seats seen on entry.
pub async fn cascade_offers(
    event_id: EventId,
    ticket_type_id: Option<TicketTypeId>,
    policy: &WaitlistPolicy,
    conn: &mut PgConnection,
) -> TicketingResult<Vec<Offer>> {
    let free_seats = Ticket::count_unassigned_returns(event_id, &mut *conn).await?;

    let mut offers = Vec::new();
    for _ in 0..free_seats {
        match assign_next(event_id, ticket_type_id, policy, &mut *conn).await? {
            Some(offer) => offers.push(offer),
            None => break,
        }
    }

    Ok(offers)
}
