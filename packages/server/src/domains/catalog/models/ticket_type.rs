use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor};

use crate::common::{EventId, TicketTypeId};

/// TicketType - a priced inventory tier within an event
///
/// `sold` counts every unit handed out by a purchase. A returned ticket stays
/// counted until its replacement is confirmed, so waitlist handoffs never touch
/// these counters.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TicketType {
    pub id: TicketTypeId,
    pub event_id: EventId,
    pub name: String,
    pub price: Decimal,
    pub total: i32,
    pub sold: i32,
    pub created_at: DateTime<Utc>,
}

/// Summed counters for every ticket type of one event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct InventoryTotals {
    pub total: i64,
    pub sold: i64,
}

impl InventoryTotals {
    /// An event with no inventory at all is never considered sold out.
    pub fn is_sold_out(&self) -> bool {
        self.total > 0 && self.sold >= self.total
    }
}

impl TicketType {
    pub fn available(&self) -> i32 {
        (self.total - self.sold).max(0)
    }

    pub fn is_sold_out(&self) -> bool {
        self.sold >= self.total
    }

    // =========================================================================
    // SQL Queries
    // =========================================================================

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        id: TicketTypeId,
        executor: E,
    ) -> sqlx::Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM ticket_types WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_event<'e, E: PgExecutor<'e>>(
        event_id: EventId,
        executor: E,
    ) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM ticket_types WHERE event_id = $1 ORDER BY price DESC, created_at",
        )
        .bind(event_id)
        .fetch_all(executor)
        .await
    }

    /// Lock the counter row for the rest of the transaction.
    ///
    /// Purchases re-read `total - sold` through this lock, so two buyers racing
    /// for the last unit serialize here instead of both passing a stale check.
    pub async fn lock(id: TicketTypeId, conn: &mut PgConnection) -> sqlx::Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM ticket_types WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Add `quantity` to `sold`. Returns `None` when that would exceed `total`.
    pub async fn record_sale(
        id: TicketTypeId,
        quantity: i32,
        conn: &mut PgConnection,
    ) -> sqlx::Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE ticket_types
            SET sold = sold + $2
            WHERE id = $1
              AND sold + $2 <= total
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(quantity)
        .fetch_optional(conn)
        .await
    }

    /// Summed `total`/`sold` across the event's ticket types.
    pub async fn event_inventory<'e, E: PgExecutor<'e>>(
        event_id: EventId,
        executor: E,
    ) -> sqlx::Result<InventoryTotals> {
        sqlx::query_as::<_, InventoryTotals>(
            r#"
            SELECT COALESCE(SUM(total), 0)::BIGINT AS total,
                   COALESCE(SUM(sold), 0)::BIGINT AS sold
            FROM ticket_types
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_one(executor)
        .await
    }

    /// Recompute `sold` for every ticket type of an event from ticket rows.
    ///
    /// Active and pending-return tickets occupy a unit; reserved tickets ride on
    /// a pending-return unit and refunded ones have been replaced.
    pub async fn recount_sold(
        event_id: EventId,
        conn: &mut PgConnection,
    ) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE ticket_types tt
            SET sold = (
                SELECT COUNT(*)::INTEGER
                FROM tickets t
                WHERE t.ticket_type_id = tt.id
                  AND t.status IN ('active', 'pending_return')
            )
            WHERE tt.event_id = $1
            RETURNING tt.*
            "#,
        )
        .bind(event_id)
        .fetch_all(conn)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket_type(total: i32, sold: i32) -> TicketType {
        TicketType {
            id: TicketTypeId::new(),
            event_id: EventId::new(),
            name: "VIP".to_string(),
            price: Decimal::new(5000, 2),
            total,
            sold,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn available_is_total_minus_sold() {
        assert_eq!(ticket_type(10, 4).available(), 6);
        assert!(!ticket_type(10, 4).is_sold_out());
        assert!(ticket_type(3, 3).is_sold_out());
    }

    #[test]
    fn empty_events_are_not_sold_out() {
        assert!(!InventoryTotals { total: 0, sold: 0 }.is_sold_out());
        assert!(!InventoryTotals { total: 5, sold: 4 }.is_sold_out());
        assert!(InventoryTotals { total: 5, sold: 5 }.is_sold_out());
    }
}
