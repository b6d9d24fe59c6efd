//! Availability reads and the operator recount.

use serde::Serialize;
use tracing::info;

use crate::common::{EventId, TicketingError, TicketingResult};
use crate::domains::catalog::models::{Event, TicketType};
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Serialize)]
pub struct TicketTypeAvailability {
    #[serde(flatten)]
    pub ticket_type: TicketType,
    pub available: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Availability {
    pub event: Event,
    pub sold_out: bool,
    pub ticket_types: Vec<TicketTypeAvailability>,
}

impl Availability {
    fn new(event: Event, ticket_types: Vec<TicketType>) -> Self {
        Self {
            sold_out: event.is_sold_out(),
            event,
            ticket_types: ticket_types
                .into_iter()
                .map(|ticket_type| TicketTypeAvailability {
                    available: ticket_type.available(),
                    ticket_type,
                })
                .collect(),
        }
    }
}

pub async fn get_availability(
    event_id: EventId,
    deps: &ServerDeps,
) -> TicketingResult<Availability> {
    let event = Event::find_by_id(event_id, &deps.db_pool)
        .await?
        .ok_or_else(|| TicketingError::not_found("Event", event_id))?;
    let ticket_types = TicketType::find_by_event(event_id, &deps.db_pool).await?;

    Ok(Availability::new(event, ticket_types))
}

/// Rebuild `sold` counters from ticket rows and re-derive the event rollup.
pub async fn recount_inventory(
    event_id: EventId,
    deps: &ServerDeps,
) -> TicketingResult<Availability> {
    let mut tx = deps.db_pool.begin().await?;

    // Serializes with purchases, which lock the event before selling.
    Event::lock(event_id, &mut tx)
        .await?
        .ok_or_else(|| TicketingError::not_found("Event", event_id))?;

    TicketType::recount_sold(event_id, &mut tx).await?;
    let event = Event::recompute_totals(event_id, &mut tx).await?;
    let ticket_types = TicketType::find_by_event(event_id, &mut *tx).await?;

    tx.commit().await?;

    info!(
        event_id = %event_id,
        total_tickets = event.total_tickets,
        tickets_sold = event.tickets_sold,
        "Inventory recounted"
    );

    Ok(Availability::new(event, ticket_types))
}
