use crate::common::{EventId, TicketingError, TicketingResult, UserId};
use crate::domains::catalog::models::Event;
use crate::domains::waitlist::models::{RankedEntry, WaitlistEntry};
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Copy)]
pub enum WaitlistFilter {
    Event(EventId),
    User(UserId),
}

/// Entries in join order with their queue positions.
pub async fn list_waitlist(
    filter: WaitlistFilter,
    deps: &ServerDeps,
) -> TicketingResult<Vec<RankedEntry>> {
    let entries = match filter {
        WaitlistFilter::Event(event_id) => {
            Event::find_by_id(event_id, &deps.db_pool)
                .await?
                .ok_or_else(|| TicketingError::not_found("Event", event_id))?;
            WaitlistEntry::list_by_event(event_id, &deps.db_pool).await?
        }
        WaitlistFilter::User(user_id) => WaitlistEntry::list_by_user(user_id, &deps.db_pool).await?,
    };
    Ok(entries)
}
