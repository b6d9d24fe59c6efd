use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor};

use crate::common::{EventId, TransactionId, UserId, WaitlistEntryId};

/// WaitlistEntry - one user's place in an event's queue
///
/// The three offer columns are set together (enforced by a table constraint):
/// an entry is either waiting or holding exactly one live offer.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WaitlistEntry {
    pub id: WaitlistEntryId,
    pub user_id: UserId,
    pub event_id: EventId,
    pub joined_at: DateTime<Utc>,
    pub offered_at: Option<DateTime<Utc>>,
    pub reservation_expires_at: Option<DateTime<Utc>>,
    pub offer_transaction_id: Option<TransactionId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Waiting,
    Offered {
        offered_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        transaction_id: TransactionId,
    },
}

/// An entry with its 1-based rank in the event's queue
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RankedEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub entry: WaitlistEntry,
    pub position: i64,
}

impl WaitlistEntry {
    pub fn state(&self) -> EntryState {
        match (
            self.offered_at,
            self.reservation_expires_at,
            self.offer_transaction_id,
        ) {
            (Some(offered_at), Some(expires_at), Some(transaction_id)) => EntryState::Offered {
                offered_at,
                expires_at,
                transaction_id,
            },
            _ => EntryState::Waiting,
        }
    }

    /// True once the offer deadline has passed. Waiting entries never expire.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.state() {
            EntryState::Offered { expires_at, .. } => expires_at < now,
            EntryState::Waiting => false,
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn find_by_offer_transaction<'e, E: PgExecutor<'e>>(
        transaction_id: TransactionId,
        executor: E,
    ) -> sqlx::Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM waitlist_entries WHERE offer_transaction_id = $1",
        )
        .bind(transaction_id)
        .fetch_optional(executor)
        .await
    }

    /// Entries of an event ranked by `joined_at`.
    pub async fn list_by_event<'e, E: PgExecutor<'e>>(
        event_id: EventId,
        executor: E,
    ) -> sqlx::Result<Vec<RankedEntry>> {
        sqlx::query_as::<_, RankedEntry>(
            r#"
            SELECT w.*,
                   ROW_NUMBER() OVER (ORDER BY w.joined_at, w.id) AS position
            FROM waitlist_entries w
            WHERE w.event_id = $1
            ORDER BY w.joined_at, w.id
            "#,
        )
        .bind(event_id)
        .fetch_all(executor)
        .await
    }

    /// A user's entries across events, each ranked within its own event.
    pub async fn list_by_user<'e, E: PgExecutor<'e>>(
        user_id: UserId,
        executor: E,
    ) -> sqlx::Result<Vec<RankedEntry>> {
        sqlx::query_as::<_, RankedEntry>(
            r#"
            SELECT ranked.*
            FROM (
                SELECT w.*,
                       ROW_NUMBER() OVER (
                           PARTITION BY w.event_id ORDER BY w.joined_at, w.id
                       ) AS position
                FROM waitlist_entries w
                WHERE w.event_id IN (
                    SELECT event_id FROM waitlist_entries WHERE user_id = $1
                )
            ) ranked
            WHERE ranked.user_id = $1
            ORDER BY ranked.joined_at, ranked.id
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await
    }

    /// 1-based rank of an entry among every entry of its event.
    pub async fn position<'e, E: PgExecutor<'e>>(&self, executor: E) -> sqlx::Result<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM waitlist_entries
            WHERE event_id = $1
              AND (joined_at, id) <= ($2, $3)
            "#,
        )
        .bind(self.event_id)
        .bind(self.joined_at)
        .bind(self.id)
        .fetch_one(executor)
        .await
    }

    /// Ids of offered entries whose deadline is before `now`.
    pub async fn find_expired_ids<'e, E: PgExecutor<'e>>(
        now: DateTime<Utc>,
        limit: i64,
        executor: E,
    ) -> sqlx::Result<Vec<WaitlistEntryId>> {
        sqlx::query_scalar::<_, WaitlistEntryId>(
            r#"
            SELECT id FROM waitlist_entries
            WHERE offered_at IS NOT NULL
              AND reservation_expires_at < $1
            ORDER BY reservation_expires_at, id
            LIMIT $2
            "#,
        )
        .bind(now)
        .bind(limit)
        .fetch_all(executor)
        .await
    }

    // =========================================================================
    // Locking reads
    // =========================================================================

    pub async fn lock_by_user_and_event(
        user_id: UserId,
        event_id: EventId,
        conn: &mut PgConnection,
    ) -> sqlx::Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM waitlist_entries
            WHERE user_id = $1 AND event_id = $2
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(conn)
        .await
    }

    pub async fn lock_by_offer_transaction(
        transaction_id: TransactionId,
        conn: &mut PgConnection,
    ) -> sqlx::Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM waitlist_entries WHERE offer_transaction_id = $1 FOR UPDATE",
        )
        .bind(transaction_id)
        .fetch_optional(conn)
        .await
    }

    /// Claim the earliest waiting entry of an event.
    ///
    /// `exclude_user` passes over one user whose turn could not be served,
    /// letting the next in line take a seat that user holds.
    pub async fn claim_next_waiting(
        event_id: EventId,
        exclude_user: Option<UserId>,
        conn: &mut PgConnection,
    ) -> sqlx::Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM waitlist_entries
            WHERE event_id = $1
              AND offered_at IS NULL
              AND ($2::uuid IS NULL OR user_id <> $2)
            ORDER BY joined_at, id
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(event_id)
        .bind(exclude_user)
        .fetch_optional(conn)
        .await
    }

    /// Claim one expired offer, re-checking the deadline under the row lock.
    pub async fn claim_expired(
        id: WaitlistEntryId,
        now: DateTime<Utc>,
        conn: &mut PgConnection,
    ) -> sqlx::Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM waitlist_entries
            WHERE id = $1
              AND offered_at IS NOT NULL
              AND reservation_expires_at < $2
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(id)
        .bind(now)
        .fetch_optional(conn)
        .await
    }

    // =========================================================================
    // Writes
    // =========================================================================

    pub async fn insert_waiting(
        user_id: UserId,
        event_id: EventId,
        conn: &mut PgConnection,
    ) -> sqlx::Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO waitlist_entries (id, user_id, event_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(WaitlistEntryId::new())
        .bind(user_id)
        .bind(event_id)
        .fetch_one(conn)
        .await
    }

    /// Insert an entry that already holds an offer (immediate reassignment on join).
    pub async fn insert_offered(
        user_id: UserId,
        event_id: EventId,
        transaction_id: TransactionId,
        offered_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        conn: &mut PgConnection,
    ) -> sqlx::Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO waitlist_entries
                (id, user_id, event_id, offered_at, reservation_expires_at, offer_transaction_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(WaitlistEntryId::new())
        .bind(user_id)
        .bind(event_id)
        .bind(offered_at)
        .bind(expires_at)
        .bind(transaction_id)
        .fetch_one(conn)
        .await
    }

    pub async fn mark_offered(
        id: WaitlistEntryId,
        transaction_id: TransactionId,
        offered_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        conn: &mut PgConnection,
    ) -> sqlx::Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE waitlist_entries
            SET offered_at = $2,
                reservation_expires_at = $3,
                offer_transaction_id = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(offered_at)
        .bind(expires_at)
        .bind(transaction_id)
        .fetch_one(conn)
        .await
    }

    pub async fn delete(id: WaitlistEntryId, conn: &mut PgConnection) -> sqlx::Result<()> {
        sqlx::query("DELETE FROM waitlist_entries WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn waiting() -> WaitlistEntry {
        WaitlistEntry {
            id: WaitlistEntryId::new(),
            user_id: UserId::new(),
            event_id: EventId::new(),
            joined_at: Utc::now(),
            offered_at: None,
            reservation_expires_at: None,
            offer_transaction_id: None,
        }
    }

    #[test]
    fn waiting_entries_never_expire() {
        let entry = waiting();
        assert_eq!(entry.state(), EntryState::Waiting);
        assert!(!entry.is_expired_at(Utc::now() + Duration::days(365)));
    }

    #[test]
    fn offered_entries_expire_after_the_deadline() {
        let now = Utc::now();
        let entry = WaitlistEntry {
            offered_at: Some(now),
            reservation_expires_at: Some(now + Duration::minutes(30)),
            offer_transaction_id: Some(TransactionId::new()),
            ..waiting()
        };

        assert!(matches!(entry.state(), EntryState::Offered { .. }));
        assert!(!entry.is_expired_at(now + Duration::minutes(29)));
        assert!(!entry.is_expired_at(now + Duration::minutes(30)));
        assert!(entry.is_expired_at(now + Duration::minutes(31)));
    }
}
