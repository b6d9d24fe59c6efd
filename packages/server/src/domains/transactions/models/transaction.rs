use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor};
use typed_builder::TypedBuilder;

use crate::common::{TicketingError, TicketingResult, TransactionId, UserId};

/// Payment method recorded on a direct purchase when the caller names none.
pub const DEFAULT_PAYMENT_METHOD: &str = "card";
/// Payment method of the pending transaction behind a waitlist offer.
pub const WAITLIST_PAYMENT_METHOD: &str = "waitlist";
/// Payment method of the negative settlement paid to a reseller.
pub const SETTLEMENT_PAYMENT_METHOD: &str = "refund";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Cancelled,
    Expired,
    Refunded,
}

impl TransactionStatus {
    /// Only pending offers move; every other status is final.
    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, next),
            (Pending, Completed) | (Pending, Cancelled) | (Pending, Expired)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Cancelled => "cancelled",
            TransactionStatus::Expired => "expired",
            TransactionStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transaction - a purchase, a pending waitlist offer, or a resale settlement
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub total_price: Decimal,
    pub status: TransactionStatus,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Builder for new transactions
#[derive(Debug, Clone, TypedBuilder)]
pub struct NewTransaction {
    pub user_id: UserId,
    pub total_price: Decimal,
    pub status: TransactionStatus,
    #[builder(setter(into))]
    pub payment_method: String,
}

impl NewTransaction {
    pub async fn insert(self, conn: &mut PgConnection) -> sqlx::Result<Transaction> {
        sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (id, user_id, total_price, status, payment_method)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(TransactionId::new())
        .bind(self.user_id)
        .bind(self.total_price)
        .bind(self.status)
        .bind(self.payment_method)
        .fetch_one(conn)
        .await
    }
}

/// Amount owed to the holder of a returned ticket once it is resold.
///
/// Negative, net of the platform fee, rounded to cents with midpoints away
/// from zero.
pub fn settlement_amount(original_price: Decimal, fee_rate: Decimal) -> Decimal {
    let payout = original_price * (Decimal::ONE - fee_rate);
    -payout.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

impl Transaction {
    pub fn is_waitlist_offer(&self) -> bool {
        self.payment_method == WAITLIST_PAYMENT_METHOD
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        id: TransactionId,
        executor: E,
    ) -> sqlx::Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_user<'e, E: PgExecutor<'e>>(
        user_id: UserId,
        executor: E,
    ) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM transactions WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(executor)
        .await
    }

    pub async fn lock(id: TransactionId, conn: &mut PgConnection) -> sqlx::Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM transactions WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Conditional status change; a concurrent writer surfaces as `InvalidTransition`.
    pub async fn transition(
        id: TransactionId,
        from: TransactionStatus,
        to: TransactionStatus,
        conn: &mut PgConnection,
    ) -> TicketingResult<Self> {
        if !from.can_transition_to(to) {
            return Err(TicketingError::invalid_transition("transaction", from, to));
        }

        let updated = sqlx::query_as::<_, Self>(
            r#"
            UPDATE transactions
            SET status = $3, updated_at = NOW()
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
            Some(transaction) => Ok(transaction),
            None => match Self::find_by_id(id, &mut *conn).await? {
                Some(current) => Err(TicketingError::invalid_transition(
                    "transaction",
                    current.status,
                    to,
                )),
                None => Err(TicketingError::not_found("Transaction", id)),
            },
        }
    }
}
