//! Returning a ticket for resale to the waitlist.

use serde::Serialize;
use tracing::info;

use crate::common::{TicketId, TicketingError, TicketingResult};
use crate::domains::catalog::models::TicketType;
use crate::domains::tickets::models::{Ticket, TicketStatus};
use crate::domains::waitlist::activities::{assign_next, Offer};
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Serialize)]
pub struct RefundOutcome {
    pub ticket: Ticket,
    pub assigned_to_waitlist: bool,
    pub offer: Option<Offer>,
}

/// Put an active ticket of a sold-out event up for resale.
///
/// The holder keeps the ticket (`pending_return`) until someone on the
/// waitlist accepts it; the first waiting user is offered it in the same
/// transaction.
pub async fn return_ticket(
    ticket_id: TicketId,
    deps: &ServerDeps,
) -> TicketingResult<RefundOutcome> {
    let mut tx = deps.db_pool.begin().await?;

    let ticket = Ticket::lock(ticket_id, &mut tx)
        .await?
        .ok_or_else(|| TicketingError::not_found("Ticket", ticket_id))?;

    if ticket.status != TicketStatus::Active {
        return Err(TicketingError::NotEligible {
            ticket_id,
            reason: format!("ticket is {}", ticket.status),
        });
    }

    let inventory = TicketType::event_inventory(ticket.event_id, &mut *tx).await?;
    if !inventory.is_sold_out() {
        return Err(TicketingError::NotEligible {
            ticket_id,
            reason: "event is not sold out".into(),
        });
    }

    let returned = Ticket::transition(
        ticket_id,
        TicketStatus::Active,
        TicketStatus::PendingReturn,
        &mut tx,
    )
    .await?;

    let offer = assign_next(
        returned.event_id,
        Some(returned.ticket_type_id),
        &deps.policy,
        &mut tx,
    )
    .await?;

    let ticket = Ticket::find_by_id(ticket_id, &mut *tx)
        .await?
        .unwrap_or(returned);

    tx.commit().await?;

    info!(
        ticket_id = %ticket_id,
        event_id = %ticket.event_id,
        assigned_to_waitlist = offer.is_some(),
        "Ticket returned"
    );

    Ok(RefundOutcome {
        ticket,
        assigned_to_waitlist: offer.is_some(),
        offer,
    })
}
