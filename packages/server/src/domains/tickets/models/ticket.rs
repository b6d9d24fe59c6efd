use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor};

use crate::common::{
    EventId, TicketId, TicketTypeId, TicketingError, TicketingResult, TransactionId, UserId,
};

/// Ticket lifecycle
///
/// ```text
/// active ──return──▶ pending_return ──replaced──▶ refunded
/// reserved ──accept──▶ active
/// reserved ──decline/expire──▶ (deleted)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ticket_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Active,
    Reserved,
    PendingReturn,
    Refunded,
}

impl TicketStatus {
    pub fn can_transition_to(self, next: TicketStatus) -> bool {
        use TicketStatus::*;
        matches!(
            (self, next),
            (Active, PendingReturn) | (PendingReturn, Refunded) | (Reserved, Active)
        )
    }

    /// Only a reserved ticket may be withdrawn (deleted) when its offer lapses.
    pub fn can_be_withdrawn(self) -> bool {
        self == TicketStatus::Reserved
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Active => "active",
            TicketStatus::Reserved => "reserved",
            TicketStatus::PendingReturn => "pending_return",
            TicketStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ticket - one admission unit owned by a user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Ticket {
    pub id: TicketId,
    pub event_id: EventId,
    pub ticket_type_id: TicketTypeId,
    pub transaction_id: TransactionId,
    pub user_id: UserId,
    pub status: TicketStatus,
    pub issued_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    /// Set on a returned ticket while a reserved ticket is offered in its place.
    pub offer_ticket_id: Option<TicketId>,
}

/// Shared fields for a batch of freshly issued tickets
#[derive(Debug, Clone, Copy)]
pub struct NewTickets {
    pub event_id: EventId,
    pub ticket_type_id: TicketTypeId,
    pub transaction_id: TransactionId,
    pub user_id: UserId,
    pub status: TicketStatus,
}

impl NewTickets {
    /// Insert `quantity` tickets in one statement, ordered by id.
    pub async fn insert(self, quantity: i32, conn: &mut PgConnection) -> sqlx::Result<Vec<Ticket>> {
        let ids: Vec<TicketId> = (0..quantity).map(|_| TicketId::new()).collect();

        let mut tickets = sqlx::query_as::<_, Ticket>(
            r#"
            INSERT INTO tickets (id, event_id, ticket_type_id, transaction_id, user_id, status)
            SELECT id, $2, $3, $4, $5, $6
            FROM UNNEST($1::uuid[]) AS id
            RETURNING *
            "#,
        )
        .bind(&ids)
        .bind(self.event_id)
        .bind(self.ticket_type_id)
        .bind(self.transaction_id)
        .bind(self.user_id)
        .bind(self.status)
        .fetch_all(conn)
        .await?;

        tickets.sort_by_key(|t| t.id);
        Ok(tickets)
    }
}

impl Ticket {
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        id: TicketId,
        executor: E,
    ) -> sqlx::Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM tickets WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_user<'e, E: PgExecutor<'e>>(
        user_id: UserId,
        executor: E,
    ) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM tickets WHERE user_id = $1 ORDER BY issued_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(executor)
        .await
    }

    pub async fn find_by_event<'e, E: PgExecutor<'e>>(
        event_id: EventId,
        executor: E,
    ) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM tickets WHERE event_id = $1 ORDER BY issued_at DESC, id DESC",
        )
        .bind(event_id)
        .fetch_all(executor)
        .await
    }

    pub async fn find_by_transaction<'e, E: PgExecutor<'e>>(
        transaction_id: TransactionId,
        executor: E,
    ) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM tickets WHERE transaction_id = $1 ORDER BY id")
            .bind(transaction_id)
            .fetch_all(executor)
            .await
    }

    // =========================================================================
    // Locking reads
    // =========================================================================

    pub async fn lock(id: TicketId, conn: &mut PgConnection) -> sqlx::Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM tickets WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Lock the reserved ticket issued under an offer transaction.
    pub async fn lock_reserved_for_transaction(
        transaction_id: TransactionId,
        conn: &mut PgConnection,
    ) -> sqlx::Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM tickets
            WHERE transaction_id = $1 AND status = 'reserved'
            FOR UPDATE
            "#,
        )
        .bind(transaction_id)
        .fetch_optional(conn)
        .await
    }

    /// Lock the returned seat a reserved ticket is being offered against.
    pub async fn lock_offered_seat(
        reserved_ticket_id: TicketId,
        conn: &mut PgConnection,
    ) -> sqlx::Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM tickets WHERE offer_ticket_id = $1 FOR UPDATE",
        )
        .bind(reserved_ticket_id)
        .fetch_optional(conn)
        .await
    }

    /// Claim the oldest returned seat of an event that has no live offer.
    ///
    /// `SKIP LOCKED` lets concurrent reassignments each take a different seat;
    /// the `offer_ticket_id IS NULL` filter is re-checked once the row lock is
    /// held, so a seat linked by a committed competitor is never claimed twice.
    /// Seats held by `exclude_holder` are passed over.
    pub async fn claim_unassigned_return(
        event_id: EventId,
        ticket_type_id: Option<TicketTypeId>,
        exclude_holder: Option<UserId>,
        conn: &mut PgConnection,
    ) -> sqlx::Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM tickets
            WHERE event_id = $1
              AND ($2::uuid IS NULL OR ticket_type_id = $2)
              AND ($3::uuid IS NULL OR user_id <> $3)
              AND status = 'pending_return'
              AND offer_ticket_id IS NULL
            ORDER BY returned_at, id
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(event_id)
        .bind(ticket_type_id)
        .bind(exclude_holder)
        .fetch_optional(conn)
        .await
    }

    pub async fn count_unassigned_returns<'e, E: PgExecutor<'e>>(
        event_id: EventId,
        executor: E,
    ) -> sqlx::Result<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM tickets
            WHERE event_id = $1
              AND status = 'pending_return'
              AND offer_ticket_id IS NULL
            "#,
        )
        .bind(event_id)
        .fetch_one(executor)
        .await
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Move a ticket between statuses, enforcing the lifecycle graph.
    ///
    /// The update is conditional on the current status, so a competing writer
    /// that already moved the ticket turns this into an `InvalidTransition`.
    pub async fn transition(
        id: TicketId,
        from: TicketStatus,
        to: TicketStatus,
        conn: &mut PgConnection,
    ) -> TicketingResult<Self> {
        if !from.can_transition_to(to) {
            return Err(TicketingError::invalid_transition("ticket", from, to));
        }

        let updated = sqlx::query_as::<_, Self>(
            r#"
            UPDATE tickets
            SET status = $3,
                returned_at = CASE WHEN $3 = 'pending_return'::ticket_status
                                   THEN NOW() ELSE returned_at END
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(&mut *conn)
        .await?;

        match updated {
            Some(ticket) => Ok(ticket),
            None => match Self::find_by_id(id, &mut *conn).await? {
                Some(current) => Err(TicketingError::invalid_transition(
                    "ticket",
                    current.status,
                    to,
                )),
                None => Err(TicketingError::not_found("Ticket", id)),
            },
        }
    }

    /// Pin a reserved ticket to the returned seat it is offered against.
    pub async fn link_offer(
        seat_id: TicketId,
        reserved_ticket_id: TicketId,
        conn: &mut PgConnection,
    ) -> sqlx::Result<Self> {
        sqlx::query_as::<_, Self>(
            "UPDATE tickets SET offer_ticket_id = $2 WHERE id = $1 RETURNING *",
        )
        .bind(seat_id)
        .bind(reserved_ticket_id)
        .fetch_one(conn)
        .await
    }

    /// Release a returned seat so it can be offered again.
    pub async fn clear_offer(seat_id: TicketId, conn: &mut PgConnection) -> sqlx::Result<()> {
        sqlx::query("UPDATE tickets SET offer_ticket_id = NULL WHERE id = $1")
            .bind(seat_id)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Delete a reserved ticket whose offer was declined or expired.
    pub async fn withdraw(id: TicketId, conn: &mut PgConnection) -> TicketingResult<()> {
        let result = sqlx::query("DELETE FROM tickets WHERE id = $1 AND status = 'reserved'")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return match Self::find_by_id(id, &mut *conn).await? {
                Some(current) => Err(TicketingError::invalid_transition(
                    "ticket",
                    current.status,
                    "withdrawn",
                )),
                None => Err(TicketingError::not_found("Ticket", id)),
            };
        }
        Ok(())
    }
}
