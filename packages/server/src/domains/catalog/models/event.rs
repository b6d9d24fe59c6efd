use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor};

use crate::common::EventId;

/// Event - owns the derived inventory rollup of its ticket types
///
/// `total_tickets` and `tickets_sold` are only ever written by
/// [`Event::recompute_totals`], under the row lock taken by [`Event::lock`].
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub starts_at: Option<DateTime<Utc>>,
    pub total_tickets: i32,
    pub tickets_sold: i32,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn is_sold_out(&self) -> bool {
        self.total_tickets > 0 && self.tickets_sold >= self.total_tickets
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        id: EventId,
        executor: E,
    ) -> sqlx::Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Lock the event row for the rest of the transaction.
    ///
    /// Taken before any of its ticket type rows. Writers that end in
    /// [`Event::recompute_totals`] serialize here, so the rollup is computed
    /// after every competing sale has committed.
    pub async fn lock(id: EventId, conn: &mut PgConnection) -> sqlx::Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM events WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Re-derive the event rollup from its ticket types.
    ///
    /// Callers must hold [`Event::lock`]; the subqueries read the statement
    /// snapshot, which would miss a concurrent sale otherwise.
    pub async fn recompute_totals(id: EventId, conn: &mut PgConnection) -> sqlx::Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE events
            SET total_tickets = (
                    SELECT COALESCE(SUM(total), 0)::INTEGER FROM ticket_types WHERE event_id = $1
                ),
                tickets_sold = (
                    SELECT COALESCE(SUM(sold), 0)::INTEGER FROM ticket_types WHERE event_id = $1
                )
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(conn)
        .await
    }
}
