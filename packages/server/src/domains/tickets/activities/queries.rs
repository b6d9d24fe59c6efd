use crate::common::{EventId, TicketId, TicketingError, TicketingResult, UserId};
use crate::domains::catalog::models::Event;
use crate::domains::tickets::models::Ticket;
use crate::kernel::ServerDeps;

pub async fn get_ticket(ticket_id: TicketId, deps: &ServerDeps) -> TicketingResult<Ticket> {
    Ticket::find_by_id(ticket_id, &deps.db_pool)
        .await?
        .ok_or_else(|| TicketingError::not_found("Ticket", ticket_id))
}

/// A user's tickets, newest first.
pub async fn list_user_tickets(user_id: UserId, deps: &ServerDeps) -> TicketingResult<Vec<Ticket>> {
    Ok(Ticket::find_by_user(user_id, &deps.db_pool).await?)
}

/// Every ticket issued for an event, newest first.
pub async fn list_event_tickets(
    event_id: EventId,
    deps: &ServerDeps,
) -> TicketingResult<Vec<Ticket>> {
    Event::find_by_id(event_id, &deps.db_pool)
        .await?
        .ok_or_else(|| TicketingError::not_found("Event", event_id))?;

    Ok(Ticket::find_by_event(event_id, &deps.db_pool).await?)
}
